//! Time source of the control loop.
//!
//! The controller never calls `Instant::now()` itself; it asks its `Clock`.
//! Production code uses [`MonotonicClock`]; tests and `--virtual-time` runs
//! use [`ManualClock`], where sleeping is how time passes.

use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

pub trait Clock {
    fn now(&self) -> Instant;
    /// Block for `d`, or just move virtual time forward by `d`.
    fn sleep(&self, d: Duration);

    /// Whole milliseconds from `epoch` to `now()`, 0 if `epoch` is later.
    fn ms_since(&self, epoch: Instant) -> u64 {
        let ms = self.now().saturating_duration_since(epoch).as_millis();
        u64::try_from(ms).unwrap_or(u64::MAX)
    }
}

/// Wall-clock time from `Instant::now()`; sleeps on the current thread.
#[derive(Debug, Default, Clone, Copy)]
pub struct MonotonicClock;

impl MonotonicClock {
    pub fn new() -> Self {
        Self
    }
}

impl Clock for MonotonicClock {
    fn now(&self) -> Instant {
        Instant::now()
    }

    fn sleep(&self, d: Duration) {
        if !d.is_zero() {
            thread::sleep(d);
        }
    }
}

/// Virtual clock: `now()` is a fixed origin plus an offset that only moves on
/// `sleep`, `advance` or `set_offset`. Clones share the offset, so a plant
/// simulation and the controller driving it see the same time.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    pub fn advance(&self, d: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset = offset.saturating_add(d);
        }
    }

    /// Jump to `d` after the origin. Moving backwards is allowed, which is how
    /// tests provoke clock anomalies.
    pub fn set_offset(&self, d: Duration) {
        if let Ok(mut offset) = self.offset.lock() {
            *offset = d;
        }
    }

    /// Virtual time since the clock was created.
    pub fn elapsed(&self) -> Duration {
        self.offset.lock().map_or(Duration::ZERO, |g| *g)
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        self.origin + self.elapsed()
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}
