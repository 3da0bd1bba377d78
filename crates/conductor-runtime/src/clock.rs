//! Time source abstraction.
//!
//! Every component of the core takes timestamps as plain millisecond
//! values supplied by the caller. The engine reads them from a
//! [`Clock`] so that tests can drive breakers, heartbeat sweeps and
//! decision timestamps with a [`ManualClock`] instead of wall time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Milliseconds since the Unix epoch.
pub trait Clock: Send + Sync {
    fn now_ms(&self) -> u64;
}

/// Wall-clock time.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_ms(&self) -> u64 {
        u64::try_from(chrono::Utc::now().timestamp_millis()).unwrap_or(0)
    }
}

/// Virtual clock that only moves when told to.
///
/// # Example
///
/// ```
/// use conductor_runtime::clock::{Clock, ManualClock};
/// use std::time::Duration;
///
/// let clock = ManualClock::new(1_000);
/// clock.advance(Duration::from_secs(15));
/// assert_eq!(clock.now_ms(), 16_000);
/// ```
#[derive(Debug, Default)]
pub struct ManualClock {
    now: AtomicU64,
}

impl ManualClock {
    #[must_use]
    pub fn new(start_ms: u64) -> Self {
        Self {
            now: AtomicU64::new(start_ms),
        }
    }

    pub fn set(&self, now_ms: u64) {
        self.now.store(now_ms, Ordering::SeqCst);
    }

    pub fn advance(&self, by: Duration) {
        let ms = u64::try_from(by.as_millis()).unwrap_or(u64::MAX);
        self.now.fetch_add(ms, Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now_ms(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Hour of day (UTC) for a millisecond timestamp.
#[must_use]
pub fn hour_of_day(now_ms: u64) -> u8 {
    ((now_ms / 3_600_000) % 24) as u8
}
