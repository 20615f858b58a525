//! Core interfaces
//!
//! The small traits the rest of the core is written against: cursor access,
//! the claim/publish protocol, and read access to slot storage.

use crate::disruptor::Result;

/// Provides access to a cursor value
///
/// Used when registering gating sequences, which start at the current cursor.
pub trait Cursored {
    /// Get the current cursor value
    fn get_cursor(&self) -> i64;
}

/// Operations related to sequencing items in a ring buffer
///
/// Slots are acquired in two phases: claim with [`Sequenced::next`] (or one of
/// its variants), fill the slot, then make it visible with [`Sequenced::publish`].
///
/// ```ignore
/// let n = 10;
/// let hi = sequencer.next_n(n)?;
/// let lo = hi - (n - 1);
/// for sequence in lo..=hi {
///     // fill the slot at `sequence`
/// }
/// sequencer.publish_range(lo, hi);
/// ```
pub trait Sequenced {
    /// Capacity of the ring buffer
    fn buffer_size(&self) -> usize;

    /// Check whether `required_capacity` more slots could be claimed right now
    ///
    /// This is a concurrent method, so the response should only be taken
    /// as an indication of available capacity.
    fn has_available_capacity(&self, required_capacity: i64) -> bool;

    /// Number of slots that could be claimed right now
    fn remaining_capacity(&self) -> i64;

    /// Claim the next slot, waiting for capacity if necessary
    fn next(&self) -> Result<i64> {
        self.next_n(1)
    }

    /// Claim the next `n` slots, waiting for capacity if necessary
    ///
    /// # Returns
    /// The highest claimed sequence
    ///
    /// # Errors
    /// `InvalidArgument` if `n < 1` or `n` exceeds the buffer size
    fn next_n(&self, n: i64) -> Result<i64>;

    /// Claim the next slot without waiting
    fn try_next(&self) -> Result<i64> {
        self.try_next_n(1)
    }

    /// Claim the next `n` slots without waiting
    ///
    /// # Errors
    /// `InvalidArgument` for a bad `n`, `InsufficientCapacity` if the claim
    /// would overwrite a slot a gating consumer has not finished with
    fn try_next_n(&self, n: i64) -> Result<i64>;

    /// Publish a filled slot
    fn publish(&self, sequence: i64);

    /// Publish a range of filled slots, `lo..=hi`
    fn publish_range(&self, lo: i64, hi: i64);
}

/// Read access to slot storage
///
/// Typically implemented by the ring buffer; abstracted so processors and
/// pollers can be tested against plain vectors.
pub trait DataProvider<T>: Send + Sync {
    /// Get the item stored for `sequence`
    fn get(&self, sequence: i64) -> &T;
}
