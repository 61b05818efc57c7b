//! Wall-clock abstraction.
//!
//! Recording durations and highlight timestamps are derived from wall
//! time, not probed from finalized files. Injecting the clock lets
//! tests drive virtual time instead of sleeping.

use chrono::{DateTime, TimeZone, Utc};
use parking_lot::Mutex;

/// Source of wall-clock time with millisecond resolution.
pub trait Clock: Send + Sync {
    /// Current time in milliseconds since the Unix epoch.
    fn now_millis(&self) -> i64;

    /// Current time as a UTC timestamp.
    fn now(&self) -> DateTime<Utc> {
        Utc.timestamp_millis_opt(self.now_millis())
            .single()
            .unwrap_or_else(Utc::now)
    }
}

/// System clock backed by `chrono::Utc`.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Manually advanced clock for tests.
#[derive(Debug, Default)]
pub struct ManualClock {
    millis: Mutex<i64>,
}

impl ManualClock {
    /// Create a clock pinned at the given epoch offset.
    pub fn new(start_millis: i64) -> Self {
        Self {
            millis: Mutex::new(start_millis),
        }
    }

    /// Advance the clock by the given number of milliseconds.
    pub fn advance(&self, millis: i64) {
        *self.millis.lock() += millis;
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        *self.millis.lock()
    }
}
