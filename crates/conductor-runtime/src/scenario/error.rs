//! Scenario Layer Errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ScenarioError::NotFound`] | `SCENARIO_NOT_FOUND` | No |
//! | [`ScenarioError::Disabled`] | `SCENARIO_DISABLED` | No |

use conductor_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ScenarioError {
    #[error("scenario not found: {0}")]
    NotFound(String),

    #[error("scenario disabled: {0}")]
    Disabled(String),
}

impl ErrorCode for ScenarioError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "SCENARIO_NOT_FOUND",
            Self::Disabled(_) => "SCENARIO_DISABLED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}
