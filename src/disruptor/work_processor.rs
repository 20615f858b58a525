//! Work Processor implementation
//!
//! Workers sharing one work sequence compete for events: each event goes to
//! exactly one worker. The shared work sequence is the last claimed sequence
//! and is advanced by CAS; each worker's own sequence trails its current claim
//! by one so producers are gated on unfinished work.

use crate::disruptor::{
    DataProvider, DisruptorError, EventProcessor, EventReleaser, ExceptionHandler, Result,
    Sequence, SequenceBarrier, WorkHandler,
};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::debug;

/// One member of a competing-consumer pool
pub struct WorkProcessor<T, H> {
    running: AtomicBool,
    sequence: Arc<Sequence>,
    data_provider: Arc<dyn DataProvider<T>>,
    sequence_barrier: Arc<dyn SequenceBarrier>,
    work_handler: Mutex<H>,
    exception_handler: Arc<dyn ExceptionHandler<T>>,
    work_sequence: Arc<Sequence>,
}

impl<T, H> WorkProcessor<T, H>
where
    T: 'static,
    H: WorkHandler<T>,
{
    /// Create a worker claiming from `work_sequence`
    ///
    /// Every worker of a pool must be given the same `work_sequence`, and the
    /// exception handler may be shared between them.
    pub fn new(
        data_provider: Arc<dyn DataProvider<T>>,
        sequence_barrier: Arc<dyn SequenceBarrier>,
        mut work_handler: H,
        exception_handler: Arc<dyn ExceptionHandler<T>>,
        work_sequence: Arc<Sequence>,
    ) -> Self {
        let sequence = Arc::new(Sequence::default());
        work_handler.set_event_releaser(EventReleaser::new(Arc::clone(&sequence)));

        Self {
            running: AtomicBool::new(false),
            sequence,
            data_provider,
            sequence_barrier,
            work_handler: Mutex::new(work_handler),
            exception_handler,
            work_sequence,
        }
    }

    /// Claim the next unclaimed sequence from the shared work sequence
    fn claim_next(&self) -> i64 {
        loop {
            let next_sequence = self.work_sequence.get() + 1;
            self.sequence.set(next_sequence - 1);
            if self
                .work_sequence
                .compare_and_set(next_sequence - 1, next_sequence)
            {
                return next_sequence;
            }
        }
    }

    fn process_events(&self, handler: &mut H) -> Result<()> {
        let mut cached_available_sequence = i64::MIN;
        let mut next_sequence = self.claim_next();

        loop {
            if cached_available_sequence >= next_sequence {
                let event = self.data_provider.get(next_sequence);
                if let Err(e) = handler.on_event(event) {
                    // The item counts as processed unless the handler rethrows.
                    let handled =
                        self.exception_handler
                            .handle_event_exception(e, next_sequence, Some(event));
                    if handled.is_err() {
                        self.sequence.set(next_sequence);
                        return handled;
                    }
                }
                next_sequence = self.claim_next();
                continue;
            }

            match self.sequence_barrier.wait_for(next_sequence) {
                Ok(available_sequence) => cached_available_sequence = available_sequence,
                Err(DisruptorError::Timeout) => {
                    let sequence = self.sequence.get();
                    if let Err(e) = handler.on_timeout(sequence) {
                        self.exception_handler
                            .handle_event_exception(e, sequence, None)?;
                    }
                }
                Err(DisruptorError::Alert) => {
                    if !self.running.load(Ordering::Acquire) {
                        return Ok(());
                    }
                    debug!(sequence = next_sequence, "Spurious alert, waiting again");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

impl<T, H> EventProcessor for WorkProcessor<T, H>
where
    T: 'static,
    H: WorkHandler<T>,
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

        let mut handler = self.work_handler.lock();
        debug!(work_sequence = self.work_sequence.get(), "Work processor starting");
        if let Err(e) = handler.on_start() {
            self.exception_handler.handle_on_start_exception(e);
        }

        let result = if self.running.load(Ordering::Acquire) {
            self.process_events(&mut handler)
        } else {
            Ok(())
        };

        if let Err(e) = handler.on_shutdown() {
            self.exception_handler.handle_on_shutdown_exception(e);
        }
        debug!(sequence = self.sequence.get(), "Work processor stopped");
        drop(handler);

        self.running.store(false, Ordering::Release);
        result
    }
}

impl<T, H> std::fmt::Debug for WorkProcessor<T, H> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkProcessor")
            .field("sequence", &self.sequence.get())
            .field("work_sequence", &self.work_sequence.get())
            .field("running", &self.running.load(Ordering::Relaxed))
            .finish()
    }
}
