//! Producer type
//!
//! Selects which sequencer guards the ring buffer: the single-producer variant,
//! which claims without CAS, or the multi-producer variant, which tracks
//! per-slot availability so out-of-order publication is handled.

use crate::disruptor::{
    MultiProducerSequencer, Result, Sequencer, SingleProducerSequencer, WaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Specifies the type of producer for a sequencer
///
/// # Examples
/// ```
/// use seqgate::disruptor::ProducerType;
///
/// assert!(ProducerType::Single.is_single());
/// assert!(ProducerType::Multi.is_multi());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProducerType {
    /// Only one thread will ever claim and publish
    Single,

    /// Several threads may claim and publish concurrently
    Multi,
}

impl ProducerType {
    pub fn is_single(&self) -> bool {
        matches!(self, ProducerType::Single)
    }

    pub fn is_multi(&self) -> bool {
        matches!(self, ProducerType::Multi)
    }

    /// Create the sequencer matching this producer type
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_sequencer(
        self,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Arc<dyn Sequencer>> {
        let sequencer: Arc<dyn Sequencer> = match self {
            ProducerType::Single => {
                Arc::new(SingleProducerSequencer::new(buffer_size, wait_strategy)?)
            }
            ProducerType::Multi => {
                Arc::new(MultiProducerSequencer::new(buffer_size, wait_strategy)?)
            }
        };
        Ok(sequencer)
    }
}

impl Default for ProducerType {
    /// Multi-producer works regardless of how many threads publish, so it is
    /// the default; single-producer must be chosen explicitly.
    fn default() -> Self {
        ProducerType::Multi
    }
}

impl std::fmt::Display for ProducerType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProducerType::Single => write!(f, "Single"),
            ProducerType::Multi => write!(f, "Multi"),
        }
    }
}

impl std::str::FromStr for ProducerType {
    type Err = String;

    /// Accepts "single" or "multi" in any case
    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "single" => Ok(ProducerType::Single),
            "multi" => Ok(ProducerType::Multi),
            _ => Err(format!(
                "Invalid producer type: '{s}'. Valid values are 'single' or 'multi'"
            )),
        }
    }
}
