//! Clock abstraction so window and TTL timing can be faked in tests.

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use std::fmt;

/// Source of the current instant used by the evaluator and cache.
pub trait Clock: Send + Sync + fmt::Debug {
    /// Current instant in UTC.
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock backed by `Utc::now()`.
#[derive(Debug, Clone, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// Clock that only moves when told to. Intended for tests.
#[derive(Debug)]
pub struct ManualClock {
    now: RwLock<DateTime<Utc>>,
}

impl ManualClock {
    /// Create a clock frozen at `start`.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            now: RwLock::new(start),
        }
    }

    /// Jump to an absolute instant.
    pub fn set(&self, instant: DateTime<Utc>) {
        *self.now.write() = instant;
    }

    /// Move the clock forward (or backward, with a negative duration).
    pub fn advance(&self, by: Duration) {
        let mut now = self.now.write();
        *now += by;
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        *self.now.read()
    }
}
