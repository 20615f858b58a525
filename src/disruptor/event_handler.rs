//! Event Handler Implementation
//!
//! The user callbacks driven by the processors. Optional capabilities
//! (lifecycle, batch start, timeout, early progress reporting) are default
//! methods, so a handler only overrides the hooks it cares about.

use crate::disruptor::{Result, Sequence};
use std::sync::Arc;

/// Callback for a [`BatchEventProcessor`](crate::disruptor::BatchEventProcessor)
///
/// Every handler sees every published event, in sequence order.
///
/// # Examples
/// ```
/// use seqgate::disruptor::{EventHandler, Result};
///
/// struct Totals {
///     sum: i64,
/// }
///
/// impl EventHandler<i64> for Totals {
///     fn on_event(&mut self, event: &i64, _sequence: i64, end_of_batch: bool) -> Result<()> {
///         self.sum += *event;
///         if end_of_batch {
///             // flush downstream
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait EventHandler<T>: Send {
    /// Process one event
    ///
    /// # Arguments
    /// * `event` - The slot contents
    /// * `sequence` - Sequence of the slot
    /// * `end_of_batch` - True for the last event of the run drained in one wake-up
    ///
    /// # Errors
    /// Any error is routed to the processor's exception handler
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()>;

    /// Called on the processor thread before the first event
    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called on the processor thread after the last event
    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    /// Called before each batch with the number of events about to be delivered
    fn on_batch_start(&mut self, _batch_size: i64) {}

    /// Called when a bounded wait strategy timed out
    ///
    /// # Arguments
    /// * `sequence` - The processor's last processed sequence
    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive the processor's sequence, once, at construction
    ///
    /// A handler may set it mid-batch to let downstream stages proceed before
    /// the batch completes.
    fn set_sequence_callback(&mut self, _sequence_callback: Arc<Sequence>) {}
}

/// Callback for a [`WorkProcessor`](crate::disruptor::WorkProcessor)
///
/// Each event is delivered to exactly one handler of a worker pool.
pub trait WorkHandler<T>: Send {
    fn on_event(&mut self, event: &T) -> Result<()>;

    fn on_start(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_shutdown(&mut self) -> Result<()> {
        Ok(())
    }

    fn on_timeout(&mut self, _sequence: i64) -> Result<()> {
        Ok(())
    }

    /// Receive the worker's event releaser, once, at construction
    fn set_event_releaser(&mut self, _event_releaser: EventReleaser) {}
}

/// Lets a work handler take its worker out of backpressure
///
/// Releasing moves the worker's sequence to `i64::MAX`, so producers and
/// downstream stages stop waiting on it until it claims its next event.
#[derive(Debug, Clone)]
pub struct EventReleaser {
    sequence: Arc<Sequence>,
}

impl EventReleaser {
    pub(crate) fn new(sequence: Arc<Sequence>) -> Self {
        Self { sequence }
    }

    pub fn release(&self) {
        self.sequence.set(i64::MAX);
    }
}

/// Event handler built from a closure
pub struct ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    handler: F,
    _marker: std::marker::PhantomData<fn(&T)>,
}

impl<T, F> ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    pub fn new(handler: F) -> Self {
        Self {
            handler,
            _marker: std::marker::PhantomData,
        }
    }
}

impl<T, F> EventHandler<T> for ClosureEventHandler<T, F>
where
    F: FnMut(&T, i64, bool) -> Result<()> + Send,
{
    fn on_event(&mut self, event: &T, sequence: i64, end_of_batch: bool) -> Result<()> {
        (self.handler)(event, sequence, end_of_batch)
    }
}
