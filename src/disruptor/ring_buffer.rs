//! Ring Buffer Implementation
//!
//! A pre-allocated circular array of slots paired with a sequencer. The
//! sequencer decides who may touch which slot and when; the ring buffer only
//! maps sequences to slots and offers claim/fill/publish helpers on top.

use crate::disruptor::{
    Cursored, DataProvider, EventFactory, EventPoller, MultiProducerSequencer,
    ProcessingSequenceBarrier, Result, Sequence, Sequenced, Sequencer, SingleProducerSequencer,
    WaitStrategy,
};
use std::cell::UnsafeCell;
use std::sync::Arc;

/// Pre-allocated slot storage coordinated by a [`Sequencer`]
///
/// # Type Parameters
/// * `T` - The slot type stored in the buffer
pub struct RingBuffer<T> {
    /// Using `Box<[UnsafeCell<T>]>` so slots can be filled through `&self`
    slots: Box<[UnsafeCell<T>]>,
    /// buffer_size - 1, as i64 to match sequences
    index_mask: i64,
    sequencer: Arc<dyn Sequencer>,
}

impl<T> RingBuffer<T> {
    /// Create a ring buffer over an existing sequencer
    ///
    /// The buffer size is taken from the sequencer, which has already
    /// checked it is a power of two.
    pub fn new<F>(event_factory: F, sequencer: Arc<dyn Sequencer>) -> Self
    where
        F: EventFactory<T>,
    {
        let buffer_size = sequencer.buffer_size();
        let slots: Box<[UnsafeCell<T>]> = (0..buffer_size)
            .map(|_| UnsafeCell::new(event_factory.new_instance()))
            .collect();

        Self {
            slots,
            index_mask: (buffer_size - 1) as i64,
            sequencer,
        }
    }

    /// Create a ring buffer guarded by a single producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_single_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = SingleProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::new(event_factory, Arc::new(sequencer)))
    }

    /// Create a ring buffer guarded by a multi producer sequencer
    ///
    /// # Errors
    /// Returns `DisruptorError::InvalidBufferSize` if `buffer_size` is not a power of 2
    pub fn create_multi_producer<F>(
        event_factory: F,
        buffer_size: usize,
        wait_strategy: Arc<dyn WaitStrategy>,
    ) -> Result<Self>
    where
        F: EventFactory<T>,
    {
        let sequencer = MultiProducerSequencer::new(buffer_size, wait_strategy)?;
        Ok(Self::new(event_factory, Arc::new(sequencer)))
    }

    #[inline]
    fn slot(&self, sequence: i64) -> &UnsafeCell<T> {
        let index = (sequence & self.index_mask) as usize;
        // SAFETY: the mask keeps the index below slots.len().
        unsafe { self.slots.get_unchecked(index) }
    }

    /// Get the slot for `sequence`
    ///
    /// Only meaningful for sequences a barrier has reported as available.
    pub fn get(&self, sequence: i64) -> &T {
        // SAFETY: readers only look at published slots, which no producer
        // writes until every gating sequence has moved past them.
        unsafe { &*self.slot(sequence).get() }
    }

    /// Get a mutable pointer to the slot for `sequence`
    ///
    /// # Safety
    /// The caller must have claimed `sequence` and not yet published it, so
    /// that no other thread reads or writes the slot meanwhile.
    pub unsafe fn get_mut_unchecked(&self, sequence: i64) -> *mut T {
        self.slot(sequence).get()
    }

    /// Claim the next slot, fill it with `translator` and publish it
    ///
    /// Waits for capacity if the buffer is full.
    pub fn publish_event<F>(&self, translator: F) -> Result<i64>
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.next()?;
        self.translate_and_publish(translator, sequence);
        Ok(sequence)
    }

    /// Like [`RingBuffer::publish_event`] but fails with
    /// `DisruptorError::InsufficientCapacity` instead of waiting
    pub fn try_publish_event<F>(&self, translator: F) -> Result<i64>
    where
        F: FnOnce(&mut T, i64),
    {
        let sequence = self.sequencer.try_next()?;
        self.translate_and_publish(translator, sequence);
        Ok(sequence)
    }

    /// Claim `count` slots, fill each with `translator` and publish them together
    ///
    /// # Returns
    /// The highest published sequence
    pub fn publish_events<F>(&self, count: i64, mut translator: F) -> Result<i64>
    where
        F: FnMut(&mut T, i64),
    {
        let hi = self.sequencer.next_n(count)?;
        let lo = hi - (count - 1);
        for sequence in lo..=hi {
            // SAFETY: lo..=hi was claimed above and is unpublished.
            let slot = unsafe { &mut *self.get_mut_unchecked(sequence) };
            translator(slot, sequence);
        }
        self.sequencer.publish_range(lo, hi);
        Ok(hi)
    }

    fn translate_and_publish<F>(&self, translator: F, sequence: i64)
    where
        F: FnOnce(&mut T, i64),
    {
        // SAFETY: `sequence` was just claimed by this thread.
        let slot = unsafe { &mut *self.get_mut_unchecked(sequence) };
        translator(slot, sequence);
        self.sequencer.publish(sequence);
    }

    pub fn buffer_size(&self) -> usize {
        self.slots.len()
    }

    pub fn next(&self) -> Result<i64> {
        self.sequencer.next()
    }

    pub fn next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.next_n(n)
    }

    pub fn try_next(&self) -> Result<i64> {
        self.sequencer.try_next()
    }

    pub fn try_next_n(&self, n: i64) -> Result<i64> {
        self.sequencer.try_next_n(n)
    }

    pub fn publish(&self, sequence: i64) {
        self.sequencer.publish(sequence);
    }

    pub fn publish_range(&self, lo: i64, hi: i64) {
        self.sequencer.publish_range(lo, hi);
    }

    pub fn has_available_capacity(&self, required_capacity: i64) -> bool {
        self.sequencer.has_available_capacity(required_capacity)
    }

    pub fn remaining_capacity(&self) -> i64 {
        self.sequencer.remaining_capacity()
    }

    pub fn is_published(&self, sequence: i64) -> bool {
        self.sequencer.is_available(sequence)
    }

    pub fn get_cursor(&self) -> i64 {
        self.sequencer.get_cursor()
    }

    pub fn get_minimum_gating_sequence(&self) -> i64 {
        self.sequencer.get_minimum_sequence()
    }

    pub fn add_gating_sequences(&self, gating_sequences: &[Arc<Sequence>]) {
        self.sequencer.add_gating_sequences(gating_sequences);
    }

    pub fn remove_gating_sequence(&self, sequence: &Arc<Sequence>) -> bool {
        self.sequencer.remove_gating_sequence(sequence)
    }

    /// Build a barrier that waits on the cursor and `sequences_to_track`
    pub fn new_barrier(&self, sequences_to_track: &[Arc<Sequence>]) -> Arc<ProcessingSequenceBarrier> {
        Arc::new(ProcessingSequenceBarrier::new(
            Arc::clone(&self.sequencer),
            sequences_to_track,
        ))
    }

    /// Build a poller reading this buffer
    ///
    /// The poller's sequence is registered as a gating sequence, so the
    /// producer will not lap it.
    pub fn new_poller(ring_buffer: &Arc<Self>, gating_sequences: &[Arc<Sequence>]) -> EventPoller<T>
    where
        T: Send + Sync + 'static,
    {
        let poller = EventPoller::new_instance(
            Arc::clone(ring_buffer) as Arc<dyn DataProvider<T>>,
            Arc::clone(&ring_buffer.sequencer),
            Arc::new(Sequence::default()),
            gating_sequences,
        );
        ring_buffer.add_gating_sequences(&[poller.get_sequence()]);
        poller
    }

    pub fn sequencer(&self) -> &Arc<dyn Sequencer> {
        &self.sequencer
    }
}

// SAFETY: slots are only written by the thread that claimed their sequence
// and only read after publication; the sequencer's release/acquire cursor and
// availability flags order those accesses.
unsafe impl<T: Send> Send for RingBuffer<T> {}
unsafe impl<T: Send + Sync> Sync for RingBuffer<T> {}

impl<T: Send + Sync> DataProvider<T> for RingBuffer<T> {
    fn get(&self, sequence: i64) -> &T {
        RingBuffer::get(self, sequence)
    }
}

impl<T> std::fmt::Debug for RingBuffer<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RingBuffer")
            .field("buffer_size", &self.slots.len())
            .field("sequencer", &self.sequencer)
            .finish()
    }
}
