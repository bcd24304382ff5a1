//! Sources of time for wait-time accounting and turn delays.

use std::cell::Cell;
use std::rc::Rc;
use std::time::Instant;

/// A monotonic clock, read at specific state transitions.
pub trait Clock {
    /// The current time in seconds, relative to an arbitrary fixed origin.
    fn now(&self) -> f64;
}

/// A [Clock] backed by the system's monotonic clock.
#[derive(Clone, Copy, Debug)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
    /// Creates a clock whose origin is the current instant.
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for SystemClock {
    fn now(&self) -> f64 {
        self.origin.elapsed().as_secs_f64()
    }
}

/// A [Clock] which only moves when told to.
///
/// Clones share the same underlying time, so a test can keep one handle while
/// the simulation owns another.
#[derive(Clone, Debug, Default)]
pub struct ManualClock {
    time: Rc<Cell<f64>>,
}

impl ManualClock {
    /// Creates a clock reading zero.
    pub fn new() -> Self {
        Default::default()
    }

    /// Moves the clock forward by `secs` seconds.
    pub fn advance(&self, secs: f64) {
        self.time.set(self.time.get() + secs);
    }

    /// Sets the clock to an absolute time in seconds.
    pub fn set(&self, secs: f64) {
        self.time.set(secs);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.time.get()
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn manual_clock_handles_share_time() {
        let clock = ManualClock::new();
        let handle = clock.clone();
        handle.advance(1.5);
        handle.advance(0.5);
        assert_eq!(clock.now(), 2.0);
        clock.set(10.0);
        assert_eq!(handle.now(), 10.0);
    }

    #[test]
    fn system_clock_is_monotonic() {
        let clock = SystemClock::new();
        let a = clock.now();
        let b = clock.now();
        assert!(b >= a);
    }
}
