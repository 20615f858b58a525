//! Sequencer Implementation
//!
//! Sequencers hand out slots to producers and make published slots visible to
//! consumers. They track the gating sequences of the last consumer stages and
//! refuse to let a producer lap any of them.

use crate::disruptor::{
    is_power_of_two, Cursored, DisruptorError, Result, Sequence, SequenceGroups, Sequenced,
    WaitStrategy, INITIAL_CURSOR_VALUE,
};
use crossbeam_utils::CachePadded;
use std::sync::atomic::{AtomicI32, AtomicI64, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

/// Pause used while a producer waits for consumers to free capacity
const CAPACITY_WAIT_PARK: Duration = Duration::from_nanos(1);

/// Coordinates claiming and publishing of ring buffer slots
pub trait Sequencer: Cursored + Sequenced + Send + Sync + std::fmt::Debug {
    /// Move the claim position to `sequence`
    ///
    /// Only for initialising a pipeline at a specific position.
    fn claim(&self, sequence: i64);

    /// Check whether `sequence` has been published
    fn is_available(&self, sequence: i64) -> bool;

    /// Add sequences the producer must not overtake
    ///
    /// Each added sequence is moved to the current cursor.
    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]);

    /// Remove a gating sequence
    ///
    /// # Returns
    /// True if the sequence was registered
    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool;

    /// Minimum of the gating sequences, or the cursor when there are none
    fn get_minimum_sequence(&self) -> i64;

    /// Highest sequence in `lower_bound..=available_sequence` up to which every
    /// slot has been published
    ///
    /// Returns `lower_bound - 1` when `lower_bound` itself is not yet published.
    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64;

    /// The cursor sequence consumers wait on
    fn cursor_sequence(&self) -> Arc<Sequence>;

    /// The wait strategy shared with the barriers built on this sequencer
    fn wait_strategy(&self) -> Arc<dyn WaitStrategy>;
}

/// State shared by both sequencer variants
#[derive(Debug)]
struct SequencerCore {
    buffer_size: i64,
    wait_strategy: Arc<dyn WaitStrategy>,
    cursor: Arc<Sequence>,
    gating_sequences: SequenceGroups,
}

impl SequencerCore {
    fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        if !is_power_of_two(buffer_size) {
            return Err(DisruptorError::InvalidBufferSize(buffer_size));
        }

        Ok(Self {
            buffer_size: buffer_size as i64,
            wait_strategy,
            cursor: Arc::new(Sequence::new(INITIAL_CURSOR_VALUE)),
            gating_sequences: SequenceGroups::new(),
        })
    }

    fn check_claim_size(&self, n: i64) -> Result<()> {
        if n < 1 || n > self.buffer_size {
            return Err(DisruptorError::InvalidArgument(format!(
                "n must be > 0 and <= buffer size {}, got {n}",
                self.buffer_size
            )));
        }
        Ok(())
    }

    /// Let a producer waiting for capacity step aside briefly
    #[inline]
    fn pause_for_capacity(&self) {
        self.wait_strategy.signal_all_when_blocking();
        thread::park_timeout(CAPACITY_WAIT_PARK);
    }
}

/// Sequencer for a single publishing thread
///
/// Claims need no CAS: `next_value` and `cached_value` are only ever written
/// by the producer thread and are padded away from the cursor.
#[derive(Debug)]
pub struct SingleProducerSequencer {
    core: SequencerCore,
    next_value: CachePadded<AtomicI64>,
    cached_value: CachePadded<AtomicI64>,
}

impl SingleProducerSequencer {
    /// Create a new single producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        Ok(Self {
            core: SequencerCore::new(buffer_size, wait_strategy)?,
            next_value: CachePadded::new(AtomicI64::new(INITIAL_CURSOR_VALUE)),
            cached_value: CachePadded::new(AtomicI64::new(INITIAL_CURSOR_VALUE)),
        })
    }

    /// `store_cursor` is set only on the claiming path. A read-only check must
    /// not move the cursor over a claimed but unpublished slot.
    fn has_capacity_for(&self, required_capacity: i64, store_cursor: bool) -> bool {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let wrap_point = next_value + required_capacity - self.core.buffer_size;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            if store_cursor {
                self.core.cursor.set_volatile(next_value);
            }
            let min_sequence = self.core.gating_sequences.minimum_sequence(next_value);
            self.cached_value.store(min_sequence, Ordering::Relaxed);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }
}

impl Cursored for SingleProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for SingleProducerSequencer {
    fn buffer_size(&self) -> usize {
        self.core.buffer_size as usize
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity_for(required_capacity, false)
    }

    fn remaining_capacity(&self) -> i64 {
        let next_value = self.next_value.load(Ordering::Relaxed);
        let consumed = self.core.gating_sequences.minimum_sequence(next_value);
        self.core.buffer_size - (next_value - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.core.check_claim_size(n)?;

        let next_value = self.next_value.load(Ordering::Relaxed);
        let next_sequence = next_value + n;
        let wrap_point = next_sequence - self.core.buffer_size;
        let cached_gating_sequence = self.cached_value.load(Ordering::Relaxed);

        if wrap_point > cached_gating_sequence || cached_gating_sequence > next_value {
            self.core.cursor.set_volatile(next_value);

            let mut min_sequence = self.core.gating_sequences.minimum_sequence(next_value);
            while wrap_point > min_sequence {
                self.core.pause_for_capacity();
                min_sequence = self.core.gating_sequences.minimum_sequence(next_value);
            }

            self.cached_value.store(min_sequence, Ordering::Relaxed);
        }

        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.core.check_claim_size(n)?;

        if !self.has_capacity_for(n, true) {
            return Err(DisruptorError::InsufficientCapacity);
        }

        let next_sequence = self.next_value.load(Ordering::Relaxed) + n;
        self.next_value.store(next_sequence, Ordering::Relaxed);
        Ok(next_sequence)
    }

    fn publish(&self, sequence: i64) {
        self.core.cursor.set(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, _lo: i64, hi: i64) {
        self.publish(hi);
    }
}

impl Sequencer for SingleProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.next_value.store(sequence, Ordering::Relaxed);
    }

    fn is_available(&self, sequence: i64) -> bool {
        sequence <= self.core.cursor.get()
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.gating_sequences.add_sequences(self, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.gating_sequences.remove_sequence(sequence)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.gating_sequences.minimum_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, _lower_bound: i64, available_sequence: i64) -> i64 {
        available_sequence
    }

    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.core.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.core.wait_strategy)
    }
}

/// Sequencer for concurrent publishing threads
///
/// The cursor is the claim counter, advanced by CAS. Because producers can
/// publish out of order, each slot carries an availability flag holding the
/// "lap" (`sequence >> log2(buffer_size)`) it was last published for; readers
/// use the flags to find the highest contiguous published sequence.
#[derive(Debug)]
pub struct MultiProducerSequencer {
    core: SequencerCore,
    gating_sequence_cache: Sequence,
    available_buffer: Box<[AtomicI32]>,
    index_mask: i64,
    index_shift: u32,
}

impl MultiProducerSequencer {
    /// Create a new multi producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn new(buffer_size: usize, wait_strategy: Arc<dyn WaitStrategy>) -> Result<Self> {
        let core = SequencerCore::new(buffer_size, wait_strategy)?;
        let available_buffer = (0..buffer_size).map(|_| AtomicI32::new(-1)).collect();

        Ok(Self {
            core,
            gating_sequence_cache: Sequence::new(INITIAL_CURSOR_VALUE),
            available_buffer,
            index_mask: buffer_size as i64 - 1,
            index_shift: buffer_size.trailing_zeros(),
        })
    }

    fn has_capacity_for(&self, required_capacity: i64, cursor_value: i64) -> bool {
        let wrap_point = cursor_value + required_capacity - self.core.buffer_size;
        let cached_gating_sequence = self.gating_sequence_cache.get();

        if wrap_point > cached_gating_sequence || cached_gating_sequence > cursor_value {
            let min_sequence = self.core.gating_sequences.minimum_sequence(cursor_value);
            self.gating_sequence_cache.set(min_sequence);

            if wrap_point > min_sequence {
                return false;
            }
        }

        true
    }

    #[inline]
    fn calculate_index(&self, sequence: i64) -> usize {
        (sequence & self.index_mask) as usize
    }

    #[inline]
    fn calculate_availability_flag(&self, sequence: i64) -> i32 {
        (sequence >> self.index_shift) as i32
    }

    #[inline]
    fn set_available(&self, sequence: i64) {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].store(flag, Ordering::Release);
    }
}

impl Cursored for MultiProducerSequencer {
    fn get_cursor(&self) -> i64 {
        self.core.cursor.get()
    }
}

impl Sequenced for MultiProducerSequencer {
    fn buffer_size(&self) -> usize {
        self.core.buffer_size as usize
    }

    fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.has_capacity_for(required_capacity, self.core.cursor.get())
    }

    fn remaining_capacity(&self) -> i64 {
        let produced = self.core.cursor.get();
        let consumed = self.core.gating_sequences.minimum_sequence(produced);
        self.core.buffer_size - (produced - consumed)
    }

    fn next_n(&self, n: i64) -> Result<i64> {
        self.core.check_claim_size(n)?;

        loop {
            let current = self.core.cursor.get();
            let next = current + n;
            let wrap_point = next - self.core.buffer_size;
            let cached_gating_sequence = self.gating_sequence_cache.get();

            if wrap_point > cached_gating_sequence || cached_gating_sequence > current {
                let gating_sequence = self.core.gating_sequences.minimum_sequence(current);
                if wrap_point > gating_sequence {
                    self.core.pause_for_capacity();
                    continue;
                }
                self.gating_sequence_cache.set(gating_sequence);
            } else if self.core.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn try_next_n(&self, n: i64) -> Result<i64> {
        self.core.check_claim_size(n)?;

        loop {
            let current = self.core.cursor.get();
            let next = current + n;

            if !self.has_capacity_for(n, current) {
                return Err(DisruptorError::InsufficientCapacity);
            }

            if self.core.cursor.compare_and_set(current, next) {
                return Ok(next);
            }
        }
    }

    fn publish(&self, sequence: i64) {
        self.set_available(sequence);
        self.core.wait_strategy.signal_all_when_blocking();
    }

    fn publish_range(&self, lo: i64, hi: i64) {
        for sequence in lo..=hi {
            self.set_available(sequence);
        }
        self.core.wait_strategy.signal_all_when_blocking();
    }
}

impl Sequencer for MultiProducerSequencer {
    fn claim(&self, sequence: i64) {
        self.core.cursor.set(sequence);
    }

    fn is_available(&self, sequence: i64) -> bool {
        let index = self.calculate_index(sequence);
        let flag = self.calculate_availability_flag(sequence);
        self.available_buffer[index].load(Ordering::Acquire) == flag
    }

    fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.core.gating_sequences.add_sequences(self, gating_sequences);
    }

    fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.core.gating_sequences.remove_sequence(sequence)
    }

    fn get_minimum_sequence(&self) -> i64 {
        self.core.gating_sequences.minimum_sequence(self.core.cursor.get())
    }

    fn get_highest_published_sequence(&self, lower_bound: i64, available_sequence: i64) -> i64 {
        for sequence in lower_bound..=available_sequence {
            if !self.is_available(sequence) {
                return sequence - 1;
            }
        }

        available_sequence
    }

    fn cursor_sequence(&self) -> Arc<Sequence> {
        Arc::clone(&self.core.cursor)
    }

    fn wait_strategy(&self) -> Arc<dyn WaitStrategy> {
        Arc::clone(&self.core.wait_strategy)
    }
}
