//! Event Poller
//!
//! A pull-style consumer. Instead of parking a thread in a wait strategy, the
//! owner calls [`EventPoller::poll`] whenever it likes and decides for itself
//! how to back off when nothing is ready.

use crate::disruptor::{DataProvider, FixedSequenceGroup, Result, Sequence, Sequencer};
use std::sync::Arc;

/// Outcome of a single [`EventPoller::poll`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollState {
    /// At least one event was handed to the handler
    Processing,
    /// Events are claimed past this poller but not yet safe to read
    Gating,
    /// Nothing published beyond this poller
    Idle,
}

/// Non-blocking reader over a ring buffer
pub struct EventPoller<T> {
    data_provider: Arc<dyn DataProvider<T>>,
    sequencer: Arc<dyn Sequencer>,
    sequence: Arc<Sequence>,
    gating_sequence: FixedSequenceGroup,
}

impl<T> EventPoller<T> {
    /// Create a poller
    ///
    /// # Arguments
    /// * `sequence` - The poller's own progress sequence
    /// * `gating_sequences` - Upstream sequences to stay behind; when empty the
    ///   poller follows the sequencer cursor
    pub fn new_instance(
        data_provider: Arc<dyn DataProvider<T>>,
        sequencer: Arc<dyn Sequencer>,
        sequence: Arc<Sequence>,
        gating_sequences: &[Arc<Sequence>],
    ) -> Self {
        let gating_sequence =
            FixedSequenceGroup::or_cursor(gating_sequences, &sequencer.cursor_sequence());

        Self {
            data_provider,
            sequencer,
            sequence,
            gating_sequence,
        }
    }

    /// Hand every ready event to `handler` until it returns `Ok(false)`
    ///
    /// The poller's sequence is moved to the last event the handler accepted,
    /// even when the handler fails part way.
    ///
    /// # Errors
    /// Returns the first error from `handler`
    pub fn poll<F>(&self, mut handler: F) -> Result<PollState>
    where
        F: FnMut(&T, i64, bool) -> Result<bool>,
    {
        let current_sequence = self.sequence.get();
        let mut next_sequence = current_sequence + 1;
        let available_sequence = self
            .sequencer
            .get_highest_published_sequence(next_sequence, self.gating_sequence.get());

        if next_sequence <= available_sequence {
            let mut processed_sequence = current_sequence;
            let mut outcome = Ok(PollState::Processing);

            while next_sequence <= available_sequence {
                let event = self.data_provider.get(next_sequence);
                match handler(event, next_sequence, next_sequence == available_sequence) {
                    Ok(process_next_event) => {
                        processed_sequence = next_sequence;
                        next_sequence += 1;
                        if !process_next_event {
                            break;
                        }
                    }
                    Err(e) => {
                        outcome = Err(e);
                        break;
                    }
                }
            }

            self.sequence.set(processed_sequence);
            return outcome;
        }

        if self.sequencer.get_cursor() >= next_sequence {
            Ok(PollState::Gating)
        } else {
            Ok(PollState::Idle)
        }
    }

    pub fn get_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.sequence)
    }
}

impl<T> std::fmt::Debug for EventPoller<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventPoller")
            .field("sequence", &self.sequence.get())
            .field("gating_sequence", &self.gating_sequence.get())
            .finish()
    }
}
