//! Sequence-coordination core
//!
//! This module contains the pieces that move events between threads without
//! locks on the hot path: padded sequences, sequencers that claim and publish
//! slots, barriers and wait strategies that let consumers block, and the
//! processing loops that turn available ranges into callback invocations.

pub mod config;
pub mod core_interfaces;
pub mod event_factory;
pub mod event_handler;
pub mod event_poller;
pub mod event_processor;
pub mod exception_handler;
pub mod producer_type;
pub mod ring_buffer;
pub mod sequence;
pub mod sequence_barrier;
pub mod sequence_group;
pub mod sequencer;
pub mod wait_strategy;
pub mod work_processor;


pub use config::{SequencerConfig, WaitStrategyConfig};
pub use core_interfaces::{Cursored, DataProvider, Sequenced};
pub use event_factory::{ClosureEventFactory, DefaultEventFactory, EventFactory};
pub use event_handler::{ClosureEventHandler, EventHandler, EventReleaser, WorkHandler};
pub use event_poller::{EventPoller, PollState};
pub use event_processor::{BatchEventProcessor, EventProcessor};
pub use exception_handler::{ExceptionHandler, FatalExceptionHandler, IgnoreExceptionHandler};
pub use producer_type::ProducerType;
pub use ring_buffer::RingBuffer;
pub use sequence::Sequence;
pub use sequence_barrier::{ProcessingSequenceBarrier, SequenceBarrier};
pub use sequence_group::{FixedSequenceGroup, SequenceGroups};
pub use sequencer::{MultiProducerSequencer, Sequencer, SingleProducerSequencer};
pub use wait_strategy::{
    BlockingWaitStrategy, BusySpinWaitStrategy, TimeoutBlockingWaitStrategy, WaitStrategy,
    YieldingWaitStrategy,
};
pub use work_processor::WorkProcessor;

/// The initial cursor value for sequences
pub const INITIAL_CURSOR_VALUE: i64 = -1;

/// Boxed error produced by user callbacks
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors that can occur in the sequencing core
#[derive(Debug, thiserror::Error)]
pub enum DisruptorError {
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Insufficient capacity in ring buffer")]
    InsufficientCapacity,

    #[error("Buffer size must be a power of 2, got: {0}")]
    InvalidBufferSize(usize),

    #[error("Timeout waiting for sequence")]
    Timeout,

    #[error("Sequence barrier has been alerted")]
    Alert,

    #[error("Illegal state: {0}")]
    IllegalState(String),

    #[error("Event handler failed: {0}")]
    Handler(#[source] BoxError),
}

impl DisruptorError {
    /// Wrap a user callback failure
    pub fn handler<E>(error: E) -> Self
    where
        E: Into<BoxError>,
    {
        Self::Handler(error.into())
    }
}

pub type Result<T> = std::result::Result<T, DisruptorError>;

/// Utility function to check if a number is a power of 2
pub fn is_power_of_two(n: usize) -> bool {
    n != 0 && (n & (n - 1)) == 0
}
