//! Time provider abstraction for wall-clock and test time.
//!
//! The pipelining cores stamp every request with a monotonic creation time
//! and compare those stamps during the idle sweep. Abstracting the clock
//! behind [`TimeProvider`] lets tests drive timeouts deterministically with
//! [`ManualClock`] while production code uses [`MonotonicClock`].

use std::cell::Cell;
use std::rc::Rc;
use std::time::{Duration, Instant};

/// Provider trait for monotonic time.
///
/// `now()` returns elapsed time since an arbitrary fixed origin (typically
/// provider creation). Only differences between two `now()` readings are
/// meaningful; the values never go backwards.
pub trait TimeProvider: Clone {
    /// Get the current monotonic time.
    fn now(&self) -> Duration;
}

/// Real time provider backed by [`Instant`].
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    /// Start time for calculating elapsed duration
    start: Instant,
}

impl MonotonicClock {
    /// Create a new monotonic clock anchored at the current instant.
    pub fn new() -> Self {
        Self {
            start: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl TimeProvider for MonotonicClock {
    fn now(&self) -> Duration {
        self.start.elapsed()
    }
}

/// Manually driven clock for deterministic tests.
///
/// Clones share the same underlying time cell, so a test can hold one handle
/// to advance time while the component under test holds another.
#[derive(Debug, Clone, Default)]
pub struct ManualClock {
    now: Rc<Cell<Duration>>,
}

impl ManualClock {
    /// Create a new manual clock starting at zero.
    pub fn new() -> Self {
        Self::default()
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, delta: Duration) {
        self.now.set(self.now.get() + delta);
    }

    /// Set the clock to an absolute reading.
    pub fn set(&self, now: Duration) {
        self.now.set(now);
    }
}

impl TimeProvider for ManualClock {
    fn now(&self) -> Duration {
        self.now.get()
    }
}
