//! Wait Strategy Implementation
//!
//! Wait strategies determine how a consumer thread waits for a sequence to
//! become available. Every strategy honours the same contract: return once the
//! dependent sequence has reached the requested one, re-check the barrier's
//! alert on every wake, and report the dependent value that was observed.

use crate::disruptor::{DisruptorError, FixedSequenceGroup, Result, Sequence, SequenceBarrier};
use parking_lot::{Condvar, Mutex};
use std::hint;
use std::thread;
use std::time::{Duration, Instant};

/// Strategy for waiting for events to become available
pub trait WaitStrategy: Send + Sync + std::fmt::Debug {
    /// Wait for `sequence` to become available
    ///
    /// # Arguments
    /// * `sequence` - The sequence to wait for
    /// * `cursor` - The producer cursor
    /// * `dependent_sequence` - Upstream sequences, or the cursor when there are none
    /// * `barrier` - The barrier the caller is waiting on, checked for alerts
    ///
    /// # Returns
    /// The dependent sequence value observed, which may exceed `sequence`
    ///
    /// # Errors
    /// `Alert` if the barrier is alerted while waiting, `Timeout` for bounded strategies
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64>;

    /// Wake every thread blocked in this strategy
    fn signal_all_when_blocking(&self);
}

/// Spin on the dependent sequence until it reaches `sequence`
///
/// Shared by the blocking strategies once the cursor has moved past the
/// requested sequence and only upstream consumers remain to catch up.
#[inline]
fn spin_on_dependents(
    sequence: i64,
    dependent_sequence: &FixedSequenceGroup,
    barrier: &dyn SequenceBarrier,
) -> Result<i64> {
    loop {
        let available_sequence = dependent_sequence.get();
        if available_sequence >= sequence {
            return Ok(available_sequence);
        }
        barrier.check_alert()?;
        hint::spin_loop();
    }
}

/// Blocking wait strategy using a mutex and condition variable
///
/// Consumers park on the condition variable while the producer cursor is
/// behind; producers wake them on every publish. Lowest CPU use of the
/// strategies, at the cost of wake-up latency.
#[derive(Debug, Default)]
pub struct BlockingWaitStrategy {
    mutex: Mutex<()>,
    processor_notify_condition: Condvar,
}

impl BlockingWaitStrategy {
    pub fn new() -> Self {
        Self::default()
    }
}

impl WaitStrategy for BlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                self.processor_notify_condition.wait(&mut guard);
            }
        }

        spin_on_dependents(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.processor_notify_condition.notify_all();
    }
}

/// Blocking wait strategy that gives up after a fixed time
///
/// Behaves like [`BlockingWaitStrategy`] but fails with
/// `DisruptorError::Timeout` if the producer cursor has not reached the
/// requested sequence before the timeout elapses.
#[derive(Debug)]
pub struct TimeoutBlockingWaitStrategy {
    mutex: Mutex<()>,
    processor_notify_condition: Condvar,
    timeout: Duration,
}

impl TimeoutBlockingWaitStrategy {
    pub fn new(timeout: Duration) -> Self {
        Self {
            mutex: Mutex::new(()),
            processor_notify_condition: Condvar::new(),
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }
}

impl WaitStrategy for TimeoutBlockingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        cursor: &Sequence,
        dependent_sequence: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        if cursor.get() < sequence {
            let deadline = Instant::now() + self.timeout;
            let mut guard = self.mutex.lock();
            while cursor.get() < sequence {
                barrier.check_alert()?;
                let wait = self
                    .processor_notify_condition
                    .wait_until(&mut guard, deadline);
                if wait.timed_out() && cursor.get() < sequence {
                    return Err(DisruptorError::Timeout);
                }
            }
        }

        spin_on_dependents(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {
        let _guard = self.mutex.lock();
        self.processor_notify_condition.notify_all();
    }
}

/// Busy-spin wait strategy
///
/// Polls continuously with a spin-loop hint. Lowest latency, but burns a
/// full core while waiting; use only when cores can be dedicated.
#[derive(Debug, Default, Clone, Copy)]
pub struct BusySpinWaitStrategy;

impl BusySpinWaitStrategy {
    pub fn new() -> Self {
        Self
    }
}

impl WaitStrategy for BusySpinWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequence: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        spin_on_dependents(sequence, dependent_sequence, barrier)
    }

    fn signal_all_when_blocking(&self) {}
}

/// Yielding wait strategy
///
/// Spins a fixed number of times, then yields the thread on every further
/// iteration. A compromise between busy-spin latency and CPU usage.
#[derive(Debug, Clone, Copy)]
pub struct YieldingWaitStrategy {
    spin_tries: u32,
}

impl YieldingWaitStrategy {
    const DEFAULT_SPIN_TRIES: u32 = 100;

    pub fn new() -> Self {
        Self::with_spin_tries(Self::DEFAULT_SPIN_TRIES)
    }

    /// Create a strategy that spins `spin_tries` times before yielding
    pub fn with_spin_tries(spin_tries: u32) -> Self {
        Self { spin_tries }
    }
}

impl Default for YieldingWaitStrategy {
    fn default() -> Self {
        Self::new()
    }
}

impl WaitStrategy for YieldingWaitStrategy {
    fn wait_for(
        &self,
        sequence: i64,
        _cursor: &Sequence,
        dependent_sequence: &FixedSequenceGroup,
        barrier: &dyn SequenceBarrier,
    ) -> Result<i64> {
        let mut counter = self.spin_tries;
        loop {
            let available_sequence = dependent_sequence.get();
            if available_sequence >= sequence {
                return Ok(available_sequence);
            }
            barrier.check_alert()?;
            if counter == 0 {
                thread::yield_now();
            } else {
                counter -= 1;
                hint::spin_loop();
            }
        }
    }

    fn signal_all_when_blocking(&self) {}
}
