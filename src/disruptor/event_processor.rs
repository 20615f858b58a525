//! Event Processor implementation
//!
//! A [`BatchEventProcessor`] owns one consumer stage: it waits on its
//! barrier, drains every available event into its handler, then advances its
//! own sequence so that gated producers and downstream stages can move on.

use crate::disruptor::{
    DataProvider, DisruptorError, EventHandler, ExceptionHandler, FatalExceptionHandler, Result,
    Sequence, SequenceBarrier,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// A consumer loop that can be run on its own thread and halted from another
pub trait EventProcessor: Send + Sync {
    /// The sequence this processor advances as it consumes
    fn get_sequence(&self) -> Arc<Sequence>;

    /// Ask the processor to stop once it notices
    fn halt(&self);

    fn is_running(&self) -> bool;

    /// Run the processing loop on the calling thread until halted
    ///
    /// # Errors
    /// `IllegalState` if the processor is already running, or the error an
    /// exception handler rethrew
    fn run(&self) -> Result<()>;
}

/// Delivers every available event to an [`EventHandler`] in sequence order
pub struct BatchEventProcessor<T, H> {
    running: AtomicBool,
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    event_handler: Mutex<H>,
    exception_handler: Box<dyn ExceptionHandler<T>>,
    sequence: Arc<Sequence>,
}

impl<T, H> BatchEventProcessor<T, H>
where
    T: 'static,
    H: EventHandler<T>,
{
    /// Create a processor reading `data_provider` behind `sequence_barrier`
    ///
    /// The handler is given the processor's sequence through
    /// `set_sequence_callback` before this returns.
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut event_handler: H,
    ) -> Self {
        let sequence = Arc::new(Sequence::default());
        event_handler.set_sequence_callback(Arc::clone(&sequence));

        Self {
            running: AtomicBool::new(false),
            data_provider,
            sequence_barrier,
            event_handler: Mutex::new(event_handler),
            exception_handler: Box::new(FatalExceptionHandler::<T>::new()),
            sequence,
        }
    }

    pub fn with_exception_handler<E>(mut self, exception_handler: E) -> Self
    where
        E: ExceptionHandler<T> + 'static,
    {
        self.exception_handler = Box::new(exception_handler);
        self
    }

    /// Replace the exception handler; only possible while not shared
    pub fn set_exception_handler(&mut self, exception_handler: Box<dyn ExceptionHandler<T>>) {
        self.exception_handler = exception_handler;
    }

    fn process_events(&self, handler: &mut H) -> Result<()> {
        let mut next_sequence = self.sequence.get() + 1;

        loop {
            let available_sequence = match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => available_sequence,
                Err(DisruptorError::Timeout) => {
                    self.notify_timeout(handler, self.sequence.get())?;
                    continue;
                }
                Err(DisruptorError::Alert) => {
                    if !self.running.load(Ordering::Acquire) {
                        return Ok(());
                    }
                    debug!(sequence = next_sequence, "Spurious alert, waiting again");
                    continue;
                }
                Err(e) => return Err(e),
            };

            if available_sequence >= next_sequence {
                handler.on_batch_start(available_sequence - next_sequence + 1);
            }

            while next_sequence <= available_sequence {
                let event = self.data_provider.get(next_sequence);
                if let Err(e) = handler.on_event(event, next_sequence, next_sequence == available_sequence) {
                    self.sequence.set(next_sequence);
                    self.exception_handler
                        .handle_event_exception(e, next_sequence, Some(event))?;
                }
                next_sequence += 1;
            }

            self.sequence.set(available_sequence);
        }
    }

    fn notify_timeout(&self, handler: &mut H, sequence: i64) -> Result<()> {
        match handler.on_timeout(sequence) {
            Ok(()) => Ok(()),
            Err(e) => self.exception_handler.handle_event_exception(e, sequence, None),
        }
    }

    fn notify_start(&self, handler: &mut H) {
        debug!(sequence = self.sequence.get(), "Event processor starting");
        if let Err(e) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(e);
        }
    }

    fn notify_shutdown(&self, handler: &mut H) {
        if let Err(e) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(e);
        }
        debug!(sequence = self.sequence.get(), "Event processor stopped");
    }
}

impl<T, H> EventProcessor for BatchEventProcessor<T, H>
where
    T: 'static,
    H: EventHandler<T>,
{
    fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }

    fn halt(&self) {
        self.running.store(false, Ordering::Release);
        self.sequence_barrier.alert();
    }

    fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    fn run(&self) -> Result<()> {
        if self
            .running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(DisruptorError::IllegalState(
                "Thread is already running".to_string(),
            ));
        }
        self.sequence_barrier.clear_alert();

        let mut handler = self.event_handler.lock();
        self.notify_start(&mut handler);

        // A halt() that raced with clear_alert above is only visible here.
        let result = if self.running.load(Ordering::Acquire) {
            self.process_events(&mut handler)
        } else {
            Ok(())
        };

        self.notify_shutdown(&mut handler);
        drop(handler);
        self.running.store(false, Ordering::Release);
        result
    }
}

impl<T, H> std::fmt::Debug for BatchEventProcessor<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchEventProcessor")
            .field("sequence", &self.sequence.get())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
