//! Sequence groups
//!
//! [`SequenceGroups`] is the dynamic set of gating sequences a sequencer must
//! not lap. Readers load an immutable snapshot; writers build a new vector and
//! install it with compare-and-swap, retrying when another thread got there first.
//!
//! [`FixedSequenceGroup`] is a read-only view reporting the minimum of a fixed
//! set of sequences, used as the dependent sequence of a barrier or poller.

use crate::disruptor::{Cursored, Sequence};
use arc_swap::ArcSwap;
use std::sync::Arc;

/// Dynamic, lock-free set of gating sequences
pub struct SequenceGroups {
    sequences: ArcSwap<Vec<Arc<Sequence>>>,
}

impl SequenceGroups {
    /// Create an empty group
    pub fn new() -> Self {
        Self {
            sequences: ArcSwap::from_pointee(Vec::new()),
        }
    }

    /// Add sequences to the group, initialising each to the current cursor
    ///
    /// The new sequences are set to the cursor while the snapshot is being built
    /// and again once it has been installed. A producer that scanned the old
    /// snapshot may have advanced in between; the second store moves the new
    /// sequences up to a position that producer has already accounted for.
    pub fn add_sequences(&self, cursor: &dyn Cursored, sequences_to_add: &[Arc<Sequence>]) {
        loop {
            let current = self.sequences.load_full();
            let cursor_sequence = cursor.get_cursor();

            let mut updated = Vec::with_capacity(current.len() + sequences_to_add.len());
            updated.extend(current.iter().cloned());
            for sequence in sequences_to_add {
                sequence.set(cursor_sequence);
                updated.push(Arc::clone(sequence));
            }

            let previous = self.sequences.compare_and_swap(&current, Arc::new(updated));
            if Arc::ptr_eq(&previous, &current) {
                break;
            }
        }

        let cursor_sequence = cursor.get_cursor();
        for sequence in sequences_to_add {
            sequence.set(cursor_sequence);
        }
    }

    /// Remove every occurrence of `sequence` (matched by identity)
    ///
    /// # Returns
    /// True if at least one entry was removed
    pub fn remove_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        loop {
            let current = self.sequences.load_full();
            let remaining: Vec<Arc<Sequence>> = current
                .iter()
                .filter(|candidate| !Arc::ptr_eq(candidate, sequence))
                .cloned()
                .collect();

            if remaining.len() == current.len() {
                return false;
            }

            let previous = self.sequences.compare_and_swap(&current, Arc::new(remaining));
            if Arc::ptr_eq(&previous, &current) {
                return true;
            }
        }
    }

    /// Minimum of all sequences in the group, bounded above by `minimum`
    pub fn minimum_sequence(&self, minimum: i64) -> i64 {
        Sequence::minimum_of(&self.sequences.load(), minimum)
    }

    /// Current snapshot of the group
    pub fn snapshot(&self) -> Arc<Vec<Arc<Sequence>>> {
        self.sequences.load_full()
    }

    pub fn len(&self) -> usize {
        self.sequences.load().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.load().is_empty()
    }
}

impl Default for SequenceGroups {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for SequenceGroups {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.sequences.load().iter()).finish()
    }
}

/// Read-only minimum over a fixed set of sequences
#[derive(Debug, Clone)]
pub struct FixedSequenceGroup {
    sequences: Box<[Arc<Sequence>]>,
}

impl FixedSequenceGroup {
    /// Create a group over `sequences`
    ///
    /// An empty group reports `i64::MAX`; use [`FixedSequenceGroup::or_cursor`]
    /// to fall back to the producer cursor instead.
    pub fn new(sequences: &[Arc<Sequence>]) -> Self {
        Self {
            sequences: sequences.iter().cloned().collect(),
        }
    }

    /// Group over `sequences`, or over `cursor` alone when `sequences` is empty
    pub fn or_cursor(sequences: &[Arc<Sequence>], cursor: &Arc<Sequence>) -> Self {
        if sequences.is_empty() {
            Self::new(std::slice::from_ref(cursor))
        } else {
            Self::new(sequences)
        }
    }

    /// Minimum value of the group
    #[inline]
    pub fn get(&self) -> i64 {
        match &*self.sequences {
            [single] => single.get(),
            sequences => Sequence::minimum_of(sequences, i64::MAX),
        }
    }

    pub fn len(&self) -> usize {
        self.sequences.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sequences.is_empty()
    }
}
