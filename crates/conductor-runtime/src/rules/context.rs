//! Context snapshot handed to rule conditions.

use super::PredicateError;
use chrono::{DateTime, Datelike, Timelike, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

/// Everything a rule condition may look at.
///
/// `weekday` counts from Monday = 0.
///
/// # Example
///
/// ```
/// use conductor_runtime::rules::Context;
///
/// let ctx = Context::from_millis(0)
///     .with_sensor("indoor_temp", 16.5)
///     .with_presence(true);
/// assert_eq!(ctx.hour, 0);
/// assert_eq!(ctx.weekday, 3); // 1970-01-01 was a Thursday
/// assert_eq!(ctx.sensor("indoor_temp").unwrap(), 16.5);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Context {
    pub timestamp_ms: u64,
    pub hour: u8,
    pub minute: u8,
    pub weekday: u8,
    pub sensors: BTreeMap<String, f64>,
    pub presence: bool,
    pub occupants: u32,
    pub prices: BTreeMap<String, f64>,
    pub flags: BTreeSet<String>,
}

impl Context {
    /// Context with only the time fields filled in.
    #[must_use]
    pub fn at(time: DateTime<Utc>) -> Self {
        Self {
            timestamp_ms: u64::try_from(time.timestamp_millis()).unwrap_or(0),
            hour: time.hour() as u8,
            minute: time.minute() as u8,
            weekday: time.weekday().num_days_from_monday() as u8,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn from_millis(now_ms: u64) -> Self {
        let time = i64::try_from(now_ms)
            .ok()
            .and_then(DateTime::from_timestamp_millis)
            .unwrap_or_default();
        Self::at(time)
    }

    #[must_use]
    pub fn with_sensor(mut self, name: impl Into<String>, value: f64) -> Self {
        self.sensors.insert(name.into(), value);
        self
    }

    #[must_use]
    pub fn with_presence(mut self, present: bool) -> Self {
        self.presence = present;
        self
    }

    #[must_use]
    pub fn with_occupants(mut self, occupants: u32) -> Self {
        self.occupants = occupants;
        self.presence = occupants > 0;
        self
    }

    #[must_use]
    pub fn with_price(mut self, market: impl Into<String>, value: f64) -> Self {
        self.prices.insert(market.into(), value);
        self
    }

    #[must_use]
    pub fn with_flag(mut self, flag: impl Into<String>) -> Self {
        self.flags.insert(flag.into());
        self
    }

    /// # Errors
    ///
    /// [`PredicateError::MissingSensor`] when the reading is absent.
    pub fn sensor(&self, name: &str) -> Result<f64, PredicateError> {
        self.sensors
            .get(name)
            .copied()
            .ok_or_else(|| PredicateError::MissingSensor(name.to_string()))
    }

    /// # Errors
    ///
    /// [`PredicateError::MissingPrice`] when the price is absent.
    pub fn price(&self, market: &str) -> Result<f64, PredicateError> {
        self.prices
            .get(market)
            .copied()
            .ok_or_else(|| PredicateError::MissingPrice(market.to_string()))
    }

    #[must_use]
    pub fn has_flag(&self, flag: &str) -> bool {
        self.flags.contains(flag)
    }
}

/// Supplies a fresh snapshot to each rule-evaluation tick.
pub trait ContextProvider: Send + Sync {
    fn snapshot(&self, now_ms: u64) -> Context;
}

/// Provider that only knows the time.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockContextProvider;

impl ContextProvider for ClockContextProvider {
    fn snapshot(&self, now_ms: u64) -> Context {
        Context::from_millis(now_ms)
    }
}

impl<F> ContextProvider for F
where
    F: Fn(u64) -> Context + Send + Sync,
{
    fn snapshot(&self, now_ms: u64) -> Context {
        self(now_ms)
    }
}
