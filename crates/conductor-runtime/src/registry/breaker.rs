//! Per-system circuit breaker.
//!
//! # State Machine
//!
//! ```text
//!            failure_count == max_failures
//!  Closed ─────────────────────────────────▶ Open
//!    ▲                                        │  ▲
//!    │ success                   timeout      │  │ any failure
//!    │                     elapsed since      ▼  │
//!    └──────────────────────────────────── HalfOpen
//! ```
//!
//! Transitions out of `Open` happen only in [`CircuitBreaker::check`],
//! which the engine calls on a fixed tick regardless of dispatch
//! activity, so a breaker recovers even when nothing is sent to it.

use serde::{Deserialize, Serialize};

/// Breaker state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BreakerState {
    /// Normal operation.
    Closed,
    /// Dispatches are skipped.
    Open,
    /// Waiting for one success to close, or one failure to reopen.
    HalfOpen,
}

impl std::fmt::Display for BreakerState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Closed => f.write_str("closed"),
            Self::Open => f.write_str("open"),
            Self::HalfOpen => f.write_str("half-open"),
        }
    }
}

/// A state change caused by a breaker call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BreakerTransition {
    Opened,
    HalfOpened,
    Closed,
}

#[derive(Debug, Clone)]
pub struct CircuitBreaker {
    state: BreakerState,
    failure_count: u32,
    max_failures: u32,
    opened_at_ms: Option<u64>,
    half_open_timeout_ms: u64,
}

impl CircuitBreaker {
    /// Creates a closed breaker. `max_failures` of zero is treated as one.
    #[must_use]
    pub fn new(max_failures: u32, half_open_timeout_ms: u64) -> Self {
        Self {
            state: BreakerState::Closed,
            failure_count: 0,
            max_failures: max_failures.max(1),
            opened_at_ms: None,
            half_open_timeout_ms,
        }
    }

    #[must_use]
    pub fn state(&self) -> BreakerState {
        self.state
    }

    #[must_use]
    pub fn failure_count(&self) -> u32 {
        self.failure_count
    }

    #[must_use]
    pub fn max_failures(&self) -> u32 {
        self.max_failures
    }

    #[must_use]
    pub fn opened_at_ms(&self) -> Option<u64> {
        self.opened_at_ms
    }

    #[must_use]
    pub fn is_open(&self) -> bool {
        self.state == BreakerState::Open
    }

    /// Records one failure.
    ///
    /// Closed breakers open once the consecutive failure count reaches
    /// `max_failures`. A half-open breaker reopens on any failure.
    /// Failures while already open only bump the counter; they do not
    /// extend the open window.
    pub fn record_failure(&mut self, now_ms: u64) -> Option<BreakerTransition> {
        self.failure_count = self.failure_count.saturating_add(1);
        match self.state {
            BreakerState::Closed if self.failure_count >= self.max_failures => {
                self.open(now_ms);
                Some(BreakerTransition::Opened)
            }
            BreakerState::HalfOpen => {
                self.open(now_ms);
                Some(BreakerTransition::Opened)
            }
            BreakerState::Closed | BreakerState::Open => None,
        }
    }

    /// Records one success (heartbeat or dispatch).
    ///
    /// Resets the consecutive failure count while closed and closes a
    /// half-open breaker. An open breaker ignores successes until the
    /// tick moves it to half-open.
    pub fn record_success(&mut self) -> Option<BreakerTransition> {
        match self.state {
            BreakerState::Closed => {
                self.failure_count = 0;
                None
            }
            BreakerState::HalfOpen => {
                self.state = BreakerState::Closed;
                self.failure_count = 0;
                self.opened_at_ms = None;
                Some(BreakerTransition::Closed)
            }
            BreakerState::Open => None,
        }
    }

    /// Moves an open breaker to half-open once the timeout has elapsed.
    pub fn check(&mut self, now_ms: u64) -> Option<BreakerTransition> {
        if self.state != BreakerState::Open {
            return None;
        }
        let opened_at = self.opened_at_ms.unwrap_or(now_ms);
        if now_ms.saturating_sub(opened_at) >= self.half_open_timeout_ms {
            self.state = BreakerState::HalfOpen;
            return Some(BreakerTransition::HalfOpened);
        }
        None
    }

    fn open(&mut self, now_ms: u64) {
        self.state = BreakerState::Open;
        self.opened_at_ms = Some(now_ms);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn breaker() -> CircuitBreaker {
        CircuitBreaker::new(3, 30_000)
    }

    #[test]
    fn opens_exactly_at_max_failures() {
        let mut b = breaker();
        assert_eq!(b.record_failure(1), None);
        assert_eq!(b.state(), BreakerState::Closed);
        assert_eq!(b.record_failure(2), None);
        assert_eq!(b.state(), BreakerState::Closed);
        assert_eq!(b.record_failure(3), Some(BreakerTransition::Opened));
        assert_eq!(b.state(), BreakerState::Open);
        assert_eq!(b.failure_count(), 3);
        assert_eq!(b.opened_at_ms(), Some(3));
    }

    #[test]
    fn success_resets_consecutive_count() {
        let mut b = breaker();
        b.record_failure(1);
        b.record_failure(2);
        assert_eq!(b.record_success(), None);
        assert_eq!(b.failure_count(), 0);
        b.record_failure(3);
        b.record_failure(4);
        assert_eq!(b.state(), BreakerState::Closed);
    }

    #[test]
    fn half_open_only_after_timeout() {
        let mut b = breaker();
        for t in 0..3 {
            b.record_failure(t);
        }
        let opened = b.opened_at_ms().unwrap();
        assert_eq!(b.check(opened + 29_999), None);
        assert_eq!(b.state(), BreakerState::Open);
        assert_eq!(b.check(opened + 30_000), Some(BreakerTransition::HalfOpened));
        assert_eq!(b.state(), BreakerState::HalfOpen);
    }

    #[test]
    fn half_open_success_closes() {
        let mut b = breaker();
        for t in 0..3 {
            b.record_failure(t);
        }
        b.check(100_000);
        assert_eq!(b.record_success(), Some(BreakerTransition::Closed));
        assert_eq!(b.state(), BreakerState::Closed);
        assert_eq!(b.failure_count(), 0);
        assert_eq!(b.opened_at_ms(), None);
    }

    #[test]
    fn half_open_failure_reopens_with_new_timestamp() {
        let mut b = breaker();
        for t in 0..3 {
            b.record_failure(t);
        }
        b.check(50_000);
        assert_eq!(b.record_failure(60_000), Some(BreakerTransition::Opened));
        assert_eq!(b.opened_at_ms(), Some(60_000));
        assert_eq!(b.check(80_000), None);
    }

    #[test]
    fn open_ignores_success_and_extra_failures() {
        let mut b = breaker();
        for t in 0..3 {
            b.record_failure(t);
        }
        assert_eq!(b.record_success(), None);
        assert_eq!(b.record_failure(10), None);
        assert_eq!(b.state(), BreakerState::Open);
        assert_eq!(b.opened_at_ms(), Some(2));
    }

    #[test]
    fn zero_max_failures_behaves_as_one() {
        let mut b = CircuitBreaker::new(0, 10);
        assert_eq!(b.max_failures(), 1);
        assert_eq!(b.record_failure(0), Some(BreakerTransition::Opened));
    }

    #[test]
    fn display() {
        assert_eq!(BreakerState::HalfOpen.to_string(), "half-open");
    }
}
