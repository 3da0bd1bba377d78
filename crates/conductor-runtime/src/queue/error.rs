//! Queue Layer Errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`QueueError::UnknownSystem`] | `QUEUE_UNKNOWN_SYSTEM` | No |
//! | [`QueueError::Full`] | `QUEUE_FULL` | Yes |
//! | [`QueueError::DrainInProgress`] | `QUEUE_DRAIN_IN_PROGRESS` | Yes |
//!
//! `Full` clears once the queue drains; `DrainInProgress` once the
//! running drain finishes.

use conductor_types::ErrorCode;
use thiserror::Error;

/// Queue layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum QueueError {
    /// Action targets a system that is not registered.
    #[error("unknown target system: {0}")]
    UnknownSystem(String),

    /// Queue at capacity and nothing could be displaced.
    /// The rejected item is in the dead-letter queue.
    #[error("queue full (max depth {max_depth})")]
    Full { max_depth: usize },

    /// Another drain is still running.
    #[error("queue drain already in progress")]
    DrainInProgress,
}

impl ErrorCode for QueueError {
    fn code(&self) -> &'static str {
        match self {
            Self::UnknownSystem(_) => "QUEUE_UNKNOWN_SYSTEM",
            Self::Full { .. } => "QUEUE_FULL",
            Self::DrainInProgress => "QUEUE_DRAIN_IN_PROGRESS",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full { .. } | Self::DrainInProgress)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use conductor_types::assert_error_codes;

    fn all_variants() -> Vec<QueueError> {
        vec![
            QueueError::UnknownSystem("x".into()),
            QueueError::Full { max_depth: 1 },
            QueueError::DrainInProgress,
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "QUEUE_");
    }

    #[test]
    fn recoverability() {
        assert!(!QueueError::UnknownSystem("x".into()).is_recoverable());
        assert!(QueueError::Full { max_depth: 3 }.is_recoverable());
    }
}
