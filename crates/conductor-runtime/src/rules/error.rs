//! Predicate errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`PredicateError::MissingSensor`] | `PREDICATE_MISSING_SENSOR` | Yes |
//! | [`PredicateError::MissingPrice`] | `PREDICATE_MISSING_PRICE` | Yes |
//! | [`PredicateError::Failed`] | `PREDICATE_FAILED` | No |
//!
//! A missing reading may be present in the next snapshot. The rule
//! engine treats every predicate error as a non-match.

use conductor_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PredicateError {
    #[error("sensor reading not in context: {0}")]
    MissingSensor(String),

    #[error("price not in context: {0}")]
    MissingPrice(String),

    /// Raised by custom predicates.
    #[error("predicate failed: {0}")]
    Failed(String),
}

impl ErrorCode for PredicateError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingSensor(_) => "PREDICATE_MISSING_SENSOR",
            Self::MissingPrice(_) => "PREDICATE_MISSING_PRICE",
            Self::Failed(_) => "PREDICATE_FAILED",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::MissingSensor(_) | Self::MissingPrice(_))
    }
}
