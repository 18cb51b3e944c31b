//! Millisecond clock port with a monotonic and a manual implementation.

use parking_lot::Mutex as ParkingMutex;
use std::time::Instant;

/// Monotonic millisecond clock.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> f64;
}

/// Wall-time clock measured from construction.
#[derive(Debug, Clone)]
pub struct MonotonicClock {
    origin: Instant,
}

impl MonotonicClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
        }
    }
}

impl Default for MonotonicClock {
    fn default() -> Self {
        Self::new()
    }
}

impl Clock for MonotonicClock {
    fn now_ms(&self) -> f64 {
        self.origin.elapsed().as_secs_f64() * 1000.0
    }
}

/// Clock that only moves when told to. Used for simulations and tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    now: ParkingMutex<f64>,
}

impl ManualClock {
    pub fn new(start_ms: f64) -> Self {
        Self {
            now: ParkingMutex::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: f64) {
        *self.now.lock() = now_ms;
    }

    pub fn advance(&self, delta_ms: f64) {
        *self.now.lock() += delta_ms;
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> f64 {
        *self.now.lock()
    }
}
