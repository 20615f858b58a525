//! Slot factories
//!
//! Every ring buffer slot is created exactly once, up front, by an
//! [`EventFactory`]. Producers then overwrite slots in place, so the factory
//! only decides the initial state of each slot.

use std::marker::PhantomData;

/// Creates the initial value of every ring buffer slot
///
/// # Examples
/// ```
/// use seqgate::disruptor::{EventFactory, RingBuffer, BlockingWaitStrategy};
/// use std::sync::Arc;
///
/// struct Reading {
///     sensor: u32,
///     value: f64,
/// }
///
/// struct ReadingFactory;
///
/// impl EventFactory<Reading> for ReadingFactory {
///     fn new_instance(&self) -> Reading {
///         Reading { sensor: 0, value: f64::NAN }
///     }
/// }
///
/// let ring_buffer: RingBuffer<Reading> = RingBuffer::create_single_producer(
///     ReadingFactory,
///     8,
///     Arc::new(BlockingWaitStrategy::new()),
/// )
/// .unwrap();
/// assert!(ring_buffer.get(0).value.is_nan());
/// ```
pub trait EventFactory<T>: Send + Sync {
    /// Create one slot value
    fn new_instance(&self) -> T;
}

/// Fills slots with `T::default()`
pub struct DefaultEventFactory<T: Default> {
    _marker: PhantomData<fn() -> T>,
}

impl<T: Default> DefaultEventFactory<T> {
    pub fn new() -> Self {
        Self {
            _marker: PhantomData,
        }
    }
}

impl<T: Default> Default for DefaultEventFactory<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Default> EventFactory<T> for DefaultEventFactory<T> {
    fn new_instance(&self) -> T {
        T::default()
    }
}

/// Fills slots by calling a closure once per slot
pub struct ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    factory_fn: F,
    _marker: PhantomData<fn() -> T>,
}

impl<T, F> ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    pub fn new(factory_fn: F) -> Self {
        Self {
            factory_fn,
            _marker: PhantomData,
        }
    }
}

impl<T, F> EventFactory<T> for ClosureEventFactory<T, F>
where
    F: Fn() -> T + Send + Sync,
{
    fn new_instance(&self) -> T {
        (self.factory_fn)()
    }
}
