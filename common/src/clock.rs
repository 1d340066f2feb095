// common/src/clock.rs
use std::sync::atomic::{AtomicI64, Ordering};
use std::time::Duration;
use chrono::Utc;

/// Source of wall-clock time for expiry decisions.
///
/// Verification windows are measured in minutes, so anything that checks them
/// takes a clock instead of reading the system time directly.
pub trait Clock: Send + Sync {
    /// Milliseconds since the Unix epoch
    fn now_millis(&self) -> i64;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> i64 {
        Utc::now().timestamp_millis()
    }
}

/// Clock that only moves when told to. Used by tests.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    pub fn new(millis: i64) -> Self {
        Self { millis: AtomicI64::new(millis) }
    }

    /// Start at the current system time so issued tokens stay verifiable.
    pub fn starting_now() -> Self {
        Self::new(Utc::now().timestamp_millis())
    }

    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.as_millis() as i64, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_millis(&self) -> i64 {
        self.millis.load(Ordering::SeqCst)
    }
}
