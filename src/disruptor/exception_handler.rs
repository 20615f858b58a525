//! Exception Handler Implementation
//!
//! Processors never retry a failed user callback. They hand the failure to an
//! [`ExceptionHandler`], whose return value decides whether the processor
//! keeps going (`Ok`) or stops (`Err`).

use crate::disruptor::{DisruptorError, Result};
use std::marker::PhantomData;
use tracing::{error, warn};

/// Policy for failures raised by event and work handlers
///
/// # Type Parameters
/// * `T` - The event type being processed
pub trait ExceptionHandler<T>: Send + Sync {
    /// Handle a failure from `on_event` or `on_timeout`
    ///
    /// `event` is `None` when the failure did not come from a specific slot.
    /// A batch processor has already recorded the failing sequence as
    /// processed when this is called.
    ///
    /// # Errors
    /// Returning an error stops the processor, which then returns it from `run`
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        event: Option<&T>,
    ) -> Result<()>;

    /// Handle a failure from `on_start`; start-up continues regardless
    fn handle_on_start_exception(&self, error: DisruptorError);

    /// Handle a failure from `on_shutdown`; shutdown continues regardless
    fn handle_on_shutdown_exception(&self, error: DisruptorError);
}

/// Logs every failure at error level and stops the processor on event failures
///
/// This is the default for every processor.
#[derive(Debug)]
pub struct FatalExceptionHandler<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> FatalExceptionHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for FatalExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for FatalExceptionHandler<T> {
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        event: Option<&T>,
    ) -> Result<()> {
        error!(
            sequence,
            has_event = event.is_some(),
            error = %error,
            "Exception processing event"
        );
        Err(error)
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        error!(error = %error, "Exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        error!(error = %error, "Exception during on_shutdown");
    }
}

/// Logs every failure at warn level and keeps the processor running
#[derive(Debug)]
pub struct IgnoreExceptionHandler<T> {
    _marker: PhantomData<fn(&T)>,
}

impl<T> IgnoreExceptionHandler<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T> Default for IgnoreExceptionHandler<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> ExceptionHandler<T> for IgnoreExceptionHandler<T> {
    fn handle_event_exception(
        &self,
        error: DisruptorError,
        sequence: i64,
        _event: Option<&T>,
    ) -> Result<()> {
        warn!(sequence, error = %error, "Ignoring exception processing event");
        Ok(())
    }

    fn handle_on_start_exception(&self, error: DisruptorError) {
        warn!(error = %error, "Ignoring exception during on_start");
    }

    fn handle_on_shutdown_exception(&self, error: DisruptorError) {
        warn!(error = %error, "Ignoring exception during on_shutdown");
    }
}
