//! Sequencer configuration
//!
//! Serializable description of a ring buffer: capacity, producer type and
//! wait strategy. Lets the same pipeline be tuned from a config file without
//! touching code.

use crate::disruptor::{
    is_power_of_two, BlockingWaitStrategy, BusySpinWaitStrategy, DisruptorError, EventFactory,
    ProducerType, Result, RingBuffer, Sequencer, TimeoutBlockingWaitStrategy, WaitStrategy,
    YieldingWaitStrategy,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

const DEFAULT_BUFFER_SIZE: usize = 1024;
const DEFAULT_SPIN_TRIES: u32 = 100;

/// Configuration for a sequencer and the ring buffer it guards
///
/// # Examples
/// ```
/// use seqgate::disruptor::{ProducerType, SequencerConfig, WaitStrategyConfig};
///
/// let config = SequencerConfig::new()
///     .with_buffer_size(256)
///     .with_producer_type(ProducerType::Single)
///     .with_wait_strategy(WaitStrategyConfig::Yielding { spin_tries: 50 });
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SequencerConfig {
    /// Number of slots, must be a power of 2
    pub buffer_size: usize,

    pub producer_type: ProducerType,

    pub wait_strategy: WaitStrategyConfig,
}

/// Serializable choice of wait strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum WaitStrategyConfig {
    Blocking,
    TimeoutBlocking {
        timeout_ms: u64,
    },
    BusySpin,
    Yielding {
        #[serde(default = "default_spin_tries")]
        spin_tries: u32,
    },
}

fn default_spin_tries() -> u32 {
    DEFAULT_SPIN_TRIES
}

impl Default for WaitStrategyConfig {
    fn default() -> Self {
        WaitStrategyConfig::Blocking
    }
}

impl WaitStrategyConfig {
    /// Build the configured strategy
    pub fn build(&self) -> Arc<dyn WaitStrategy> {
        match *self {
            WaitStrategyConfig::Blocking => Arc::new(BlockingWaitStrategy::new()),
            WaitStrategyConfig::TimeoutBlocking { timeout_ms } => Arc::new(
                TimeoutBlockingWaitStrategy::new(Duration::from_millis(timeout_ms)),
            ),
            WaitStrategyConfig::BusySpin => Arc::new(BusySpinWaitStrategy::new()),
            WaitStrategyConfig::Yielding { spin_tries } => {
                Arc::new(YieldingWaitStrategy::with_spin_tries(spin_tries))
            }
        }
    }
}

impl Default for SequencerConfig {
    fn default() -> Self {
        Self {
            buffer_size: DEFAULT_BUFFER_SIZE,
            producer_type: ProducerType::default(),
            wait_strategy: WaitStrategyConfig::default(),
        }
    }
}

impl SequencerConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_buffer_size(mut self, buffer_size: usize) -> Self {
        self.buffer_size = buffer_size;
        self
    }

    pub fn with_producer_type(mut self, producer_type: ProducerType) -> Self {
        self.producer_type = producer_type;
        self
    }

    pub fn with_wait_strategy(mut self, wait_strategy: WaitStrategyConfig) -> Self {
        self.wait_strategy = wait_strategy;
        self
    }

    /// Check the configuration before anything is allocated
    ///
    /// # Errors
    /// `InvalidBufferSize` for a capacity that is not a power of 2,
    /// `InvalidArgument` for a zero timeout
    pub fn validate(&self) -> Result<()> {
        if !is_power_of_two(self.buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(self.buffer_size));
        }

        if let WaitStrategyConfig::TimeoutBlocking { timeout_ms: 0 } = self.wait_strategy {
            return Err(DisruptorError::InvalidArgument(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }

    pub fn build_wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        self.wait_strategy.build()
    }

    /// Validate and build the configured sequencer
    pub fn build_sequencer(&self) -> Result<Arc<dyn Sequencer>> {
        self.validate()?;
        debug!(
            buffer_size = self.buffer_size,
            producer_type = %self.producer_type,
            wait_strategy = ?self.wait_strategy,
            "Building sequencer"
        );
        self.producer_type
            .create_sequencer(self.buffer_size, self.build_wait_strategy())
    }

    /// Validate and build a ring buffer filled by `event_factory`
    pub fn build_ring_buffer<T, F>(&self, event_factory: F) -> Result<RingBuffer<T>>
    where
        F: EventFactory<T>,
    {
        let sequencer = self.build_sequencer()?;
        Ok(RingBuffer::new(event_factory, sequencer))
    }
}
