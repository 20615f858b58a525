//! Sequence Barrier Implementation
//!
//! A sequence barrier is the gate a consumer stage waits on. It combines the
//! producer cursor, the sequences of any upstream stages, and a wait strategy,
//! and answers "what is the highest sequence I may safely consume now?".

use crate::disruptor::{DisruptorError, FixedSequenceGroup, Result, Sequence, Sequencer, WaitStrategy};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Coordination barrier for managing dependencies between event processors
pub trait SequenceBarrier: Send + Sync {
    /// Wait for the given sequence to become available
    ///
    /// # Returns
    /// The highest sequence that may be consumed. This may be greater than
    /// `sequence` when more is already available, or lower when the wait
    /// strategy returned early.
    ///
    /// # Errors
    /// `Alert` if the barrier has been alerted, `Timeout` from bounded strategies
    fn wait_for(&self, sequence: i64) -> Result<i64>;

    /// Current value of the sequence this barrier depends on
    fn get_cursor(&self) -> i64;

    /// Check if this barrier has been alerted
    fn is_alerted(&self) -> bool;

    /// Alert this barrier and wake any waiting threads
    fn alert(&self);

    /// Clear the alert status
    fn clear_alert(&self);

    /// Fail with `DisruptorError::Alert` if the barrier has been alerted
    fn check_alert(&self) -> Result<()> {
        if self.is_alerted() {
            Err(DisruptorError::Alert)
        } else {
            Ok(())
        }
    }
}

/// Barrier over a sequencer cursor and an optional set of upstream sequences
pub struct ProcessingSequenceBarrier {
    wait_strategy: Arc<dyn WaitStrategy>,
    dependent_sequence: FixedSequenceGroup,
    alerted: AtomicBool,
    cursor_sequence: Arc<Sequence>,
    sequencer: Arc<dyn Sequencer>,
}

impl ProcessingSequenceBarrier {
    /// Create a barrier gated on `sequencer` and `dependent_sequences`
    ///
    /// With no dependent sequences the barrier follows the producer cursor
    /// directly; otherwise it follows the slowest of the given sequences.
    pub fn new(sequencer: Arc<dyn Sequencer>, dependent_sequences: &[Arc<Sequence>]) -> Self {
        let cursor_sequence = sequencer.cursor_sequence();
        Self {
            wait_strategy: sequencer.wait_strategy(),
            dependent_sequence: FixedSequenceGroup::or_cursor(dependent_sequences, &cursor_sequence),
            alerted: AtomicBool::new(false),
            cursor_sequence,
            sequencer,
        }
    }
}

impl SequenceBarrier for ProcessingSequenceBarrier {
    fn wait_for(&self, sequence: i64) -> Result<i64> {
        self.check_alert()?;

        let available_sequence = self.wait_strategy.wait_for(
            sequence,
            &self.cursor_sequence,
            &self.dependent_sequence,
            self,
        )?;

        if available_sequence < sequence {
            return Ok(available_sequence);
        }

        Ok(self
            .sequencer
            .get_highest_published_sequence(sequence, available_sequence))
    }

    fn get_cursor(&self) -> i64 {
        self.dependent_sequence.get()
    }

    fn is_alerted(&self) -> bool {
        self.alerted.load(Ordering::Acquire)
    }

    fn alert(&self) {
        self.alerted.store(true, Ordering::Release);
        self.wait_strategy.signal_all_when_blocking();
    }

    fn clear_alert(&self) {
        self.alerted.store(false, Ordering::Release);
    }
}

impl std::fmt::Debug for ProcessingSequenceBarrier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProcessingSequenceBarrier")
            .field("cursor", &self.cursor_sequence.get())
            .field("dependent", &self.dependent_sequence.get())
            .field("alerted", &self.is_alerted())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disruptor::{
        BlockingWaitStrategy, BusySpinWaitStrategy, MultiProducerSequencer, Sequenced,
        SingleProducerSequencer,
    };
    use std::thread;
    use std::time::Duration;

    fn single_producer(buffer_size: usize) -> Arc<dyn Sequencer> {
        Arc::new(SingleProducerSequencer::new(buffer_size, Arc::new(BlockingWaitStrategy::new())).unwrap())
    }

    fn publish_up_to(sequencer: &dyn Sequencer, last: i64) {
        for _ in 0..=last {
            let sequence = sequencer.next().unwrap();
            sequencer.publish(sequence);
        }
    }

    #[test]
    fn test_wait_for_returns_highest_available() {
        let sequencer = single_producer(16);
        publish_up_to(sequencer.as_ref(), 6);

        let barrier = ProcessingSequenceBarrier::new(Arc::clone(&sequencer), &[]);
        assert_eq!(barrier.wait_for(2).unwrap(), 6);
        assert_eq!(barrier.get_cursor(), 6);
    }

    #[test]
    fn test_wait_for_respects_dependents() {
        let sequencer = single_producer(16);
        publish_up_to(sequencer.as_ref(), 9);

        let upstream_a = Arc::new(Sequence::new(4));
        let upstream_b = Arc::new(Sequence::new(7));
        let barrier = ProcessingSequenceBarrier::new(
            Arc::clone(&sequencer),
            &[Arc::clone(&upstream_a), Arc::clone(&upstream_b)],
        );

        assert_eq!(barrier.get_cursor(), 4);
        assert_eq!(barrier.wait_for(3).unwrap(), 4);

        let waiter = {
            let upstream_a = Arc::clone(&upstream_a);
            thread::spawn(move || {
                thread::sleep(Duration::from_millis(10));
                upstream_a.set(8);
            })
        };
        assert_eq!(barrier.wait_for(6).unwrap(), 7);
        waiter.join().unwrap();
    }

    #[test]
    fn test_alert_lifecycle() {
        let sequencer = single_producer(8);
        let barrier = ProcessingSequenceBarrier::new(sequencer, &[]);

        assert!(!barrier.is_alerted());
        assert!(barrier.check_alert().is_ok());

        barrier.alert();
        assert!(barrier.is_alerted());
        assert!(matches!(barrier.check_alert(), Err(DisruptorError::Alert)));
        assert!(matches!(barrier.wait_for(0), Err(DisruptorError::Alert)));

        barrier.clear_alert();
        assert!(!barrier.is_alerted());
    }

    #[test]
    fn test_alert_interrupts_blocked_wait() {
        let sequencer = single_producer(8);
        let barrier = Arc::new(ProcessingSequenceBarrier::new(sequencer, &[]));

        let waiter = {
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || barrier.wait_for(0))
        };

        thread::sleep(Duration::from_millis(20));
        barrier.alert();

        assert!(matches!(waiter.join().unwrap(), Err(DisruptorError::Alert)));
    }

    #[test]
    fn test_multi_producer_gap_is_clamped() {
        let sequencer: Arc<dyn Sequencer> = Arc::new(
            MultiProducerSequencer::new(16, Arc::new(BusySpinWaitStrategy::new())).unwrap(),
        );
        let first = sequencer.next().unwrap();
        let second = sequencer.next().unwrap();
        let third = sequencer.next().unwrap();
        sequencer.publish(first);
        sequencer.publish(third);

        let barrier = ProcessingSequenceBarrier::new(Arc::clone(&sequencer), &[]);
        assert_eq!(barrier.wait_for(0).unwrap(), first);

        sequencer.publish(second);
        assert_eq!(barrier.wait_for(1).unwrap(), third);
    }
}
