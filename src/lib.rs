//! `seqgate` - Sequence Coordination Core
//!
//! Lock-free hand-off of pre-allocated events between producer and consumer
//! threads, in the style of the LMAX Disruptor. Progress is tracked purely by
//! padded 64-bit sequence counters: producers claim and publish slots of a
//! ring buffer, consumers wait on barriers until the slots they need are
//! published, and producers in turn never lap the slowest consumer.
//!
//! ## Features
//!
//! - **Single and multi producer** sequencers, the latter tolerating
//!   out-of-order publication
//! - **Pluggable waiting**: blocking, timeout-blocking, yielding and busy-spin
//! - **Batch consumers**, competing **work consumers** and a pull-style **poller**
//! - **Pluggable failure policy** for user callbacks
//! - **Serde configuration** of capacity, producer type and wait strategy
//!
//! ## Quick Start
//!
//! ```rust
//! use seqgate::disruptor::{
//!     BatchEventProcessor, BlockingWaitStrategy, DataProvider, DefaultEventFactory,
//!     EventHandler, EventProcessor, Result, RingBuffer,
//! };
//! use std::sync::Arc;
//! use std::thread;
//!
//! #[derive(Debug, Default)]
//! struct Trade {
//!     price: i64,
//! }
//!
//! struct Summer {
//!     total: i64,
//! }
//!
//! impl EventHandler<Trade> for Summer {
//!     fn on_event(&mut self, event: &Trade, _sequence: i64, _end_of_batch: bool) -> Result<()> {
//!         self.total += event.price;
//!         Ok(())
//!     }
//! }
//!
//! let ring_buffer = Arc::new(
//!     RingBuffer::create_single_producer(
//!         DefaultEventFactory::<Trade>::new(),
//!         1024,
//!         Arc::new(BlockingWaitStrategy::new()),
//!     )
//!     .unwrap(),
//! );
//!
//! let processor = Arc::new(BatchEventProcessor::new(
//!     Arc::clone(&ring_buffer) as Arc<dyn DataProvider<Trade>>,
//!     ring_buffer.new_barrier(&[]),
//!     Summer { total: 0 },
//! ));
//! ring_buffer.add_gating_sequences(&[processor.get_sequence()]);
//!
//! let worker = {
//!     let processor = Arc::clone(&processor);
//!     thread::spawn(move || processor.run())
//! };
//!
//! for price in 1..=10 {
//!     ring_buffer.publish_event(|trade, _| trade.price = price).unwrap();
//! }
//!
//! while processor.get_sequence().get() < 9 {
//!     thread::yield_now();
//! }
//! processor.halt();
//! worker.join().unwrap().unwrap();
//! ```
//!
//! ## Architecture
//!
//! - **`Sequence`**: cache-padded atomic progress counter
//! - **`Sequencer`**: claims and publishes slots, gated by consumer sequences
//! - **`RingBuffer`**: pre-allocated slots addressed by sequence
//! - **`SequenceBarrier`** and **`WaitStrategy`**: how a consumer waits
//! - **`BatchEventProcessor`**, **`WorkProcessor`**, **`EventPoller`**: consumers

pub mod disruptor;

pub use disruptor::{
    is_power_of_two, BatchEventProcessor, BlockingWaitStrategy, BusySpinWaitStrategy,
    DataProvider, DefaultEventFactory, DisruptorError, EventFactory, EventHandler, EventPoller,
    EventProcessor, ExceptionHandler, MultiProducerSequencer, PollState, ProducerType, Result,
    RingBuffer, Sequence, SequenceBarrier, Sequenced, Sequencer, SequencerConfig,
    SingleProducerSequencer, TimeoutBlockingWaitStrategy, WaitStrategy, WorkHandler,
    WorkProcessor, YieldingWaitStrategy, INITIAL_CURSOR_VALUE,
};

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Get the version of the `seqgate` library
#[must_use]
pub fn version() -> &'static str {
    VERSION
}
