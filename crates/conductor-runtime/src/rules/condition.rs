//! Rule conditions.
//!
//! A condition is a small expression tree evaluated against a
//! [`Context`]. Leaves read one field; `all`/`any`/`not` combine them.
//! Programmatic rules can also supply a closure with
//! [`Condition::custom`]. Conditions never have side effects, so the
//! order in which rules are evaluated cannot change the result.
//!
//! In TOML:
//!
//! ```toml
//! condition = { kind = "all", conditions = [
//!     { kind = "presence", present = true },
//!     { kind = "sensor_below", sensor = "indoor_temp", value = 18.0 },
//! ] }
//! ```

use super::{Context, PredicateError};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

type PredicateFn = dyn Fn(&Context) -> Result<bool, PredicateError> + Send + Sync;

/// Named closure predicate.
#[derive(Clone)]
pub struct CustomPredicate {
    name: String,
    predicate: Arc<PredicateFn>,
}

impl CustomPredicate {
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl std::fmt::Debug for CustomPredicate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CustomPredicate")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Condition {
    All { conditions: Vec<Condition> },
    Any { conditions: Vec<Condition> },
    Not { condition: Box<Condition> },
    SensorAbove { sensor: String, value: f64 },
    SensorBelow { sensor: String, value: f64 },
    Presence { present: bool },
    /// `start <= hour < end`; wraps past midnight when `start > end`.
    HourBetween { start: u8, end: u8 },
    PriceAbove { market: String, value: f64 },
    PriceBelow { market: String, value: f64 },
    Flag { name: String },
    Always,
    #[serde(skip)]
    Custom(CustomPredicate),
}

impl Condition {
    pub fn custom<F>(name: impl Into<String>, predicate: F) -> Self
    where
        F: Fn(&Context) -> Result<bool, PredicateError> + Send + Sync + 'static,
    {
        Self::Custom(CustomPredicate {
            name: name.into(),
            predicate: Arc::new(predicate),
        })
    }

    /// Evaluates the condition.
    ///
    /// # Errors
    ///
    /// A leaf that reads a missing sensor or price, or a custom
    /// predicate that fails. `all`/`any` short-circuit, so an error in
    /// a branch that is never reached does not surface.
    pub fn evaluate(&self, ctx: &Context) -> Result<bool, PredicateError> {
        match self {
            Self::All { conditions } => {
                for c in conditions {
                    if !c.evaluate(ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Self::Any { conditions } => {
                for c in conditions {
                    if c.evaluate(ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Self::Not { condition } => Ok(!condition.evaluate(ctx)?),
            Self::SensorAbove { sensor, value } => Ok(ctx.sensor(sensor)? > *value),
            Self::SensorBelow { sensor, value } => Ok(ctx.sensor(sensor)? < *value),
            Self::Presence { present } => Ok(ctx.presence == *present),
            Self::HourBetween { start, end } => Ok(hour_in_range(ctx.hour, *start, *end)),
            Self::PriceAbove { market, value } => Ok(ctx.price(market)? > *value),
            Self::PriceBelow { market, value } => Ok(ctx.price(market)? < *value),
            Self::Flag { name } => Ok(ctx.has_flag(name)),
            Self::Always => Ok(true),
            Self::Custom(custom) => (custom.predicate)(ctx),
        }
    }
}

fn hour_in_range(hour: u8, start: u8, end: u8) -> bool {
    if start <= end {
        (start..end).contains(&hour)
    } else {
        hour >= start || hour < end
    }
}
