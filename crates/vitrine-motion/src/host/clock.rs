//! Time sources for the host runtime.

use std::time::Instant;

/// Source of monotonic milliseconds.
pub trait Clock {
    fn now(&self) -> f64;

    /// Move time forward to at least `t`, if this clock can be driven.
    fn catch_up(&mut self, _t: f64) {}
}

/// Wall clock measured from construction.
#[derive(Debug, Clone, Copy)]
pub struct SystemClock {
    origin: Instant,
}

impl SystemClock {
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
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct ManualClock {
    now: f64,
}

impl ManualClock {
    pub fn starting_at(now: f64) -> Self {
        Self { now }
    }

    pub fn advance(&mut self, delta_ms: f64) {
        self.catch_up(self.now + delta_ms.max(0.0));
    }
}

impl Clock for ManualClock {
    fn now(&self) -> f64 {
        self.now
    }

    fn catch_up(&mut self, t: f64) {
        if t > self.now {
            self.now = t;
        }
    }
}
