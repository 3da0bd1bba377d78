//! Dispatch Layer Errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`DispatchError::Timeout`] | `DISPATCH_TIMEOUT` | Yes |
//! | [`DispatchError::Rejected`] | `DISPATCH_REJECTED` | Yes |
//! | [`DispatchError::Unavailable`] | `DISPATCH_UNAVAILABLE` | Yes |
//!
//! Every dispatch failure is transient from the core's point of view:
//! the queue retries it and the breaker counts it.

use conductor_types::ErrorCode;
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    /// No answer within the dispatch timeout.
    #[error("dispatch to {target} timed out after {timeout_ms}ms")]
    Timeout { target: String, timeout_ms: u64 },

    /// The target answered with an error.
    #[error("{target} rejected action: {reason}")]
    Rejected { target: String, reason: String },

    /// The target could not be reached.
    #[error("{target} unavailable: {reason}")]
    Unavailable { target: String, reason: String },
}

impl DispatchError {
    #[must_use]
    pub fn rejected(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Rejected {
            target: target.into(),
            reason: reason.into(),
        }
    }

    #[must_use]
    pub fn unavailable(target: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            target: target.into(),
            reason: reason.into(),
        }
    }
}

impl ErrorCode for DispatchError {
    fn code(&self) -> &'static str {
        match self {
            Self::Timeout { .. } => "DISPATCH_TIMEOUT",
            Self::Rejected { .. } => "DISPATCH_REJECTED",
            Self::Unavailable { .. } => "DISPATCH_UNAVAILABLE",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}
