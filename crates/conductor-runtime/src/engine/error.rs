//! Engine Layer Errors.
//!
//! The engine itself adds no failure modes of its own: it surfaces the
//! typed errors of the layer that refused the operation.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`EngineError::Registry`] | `ENGINE_REGISTRY` | Delegated |
//! | [`EngineError::Queue`] | `ENGINE_QUEUE` | Delegated |
//! | [`EngineError::Scenario`] | `ENGINE_SCENARIO` | Delegated |
//!
//! Use [`EngineError::source_code`] for the wrapped layer's own code.

use crate::queue::QueueError;
use crate::registry::RegistryError;
use crate::scenario::ScenarioError;
use conductor_types::ErrorCode;
use thiserror::Error;

/// Engine layer error.
///
/// # Example
///
/// ```
/// use conductor_runtime::{EngineError, QueueError};
/// use conductor_types::ErrorCode;
///
/// let err = EngineError::from(QueueError::DrainInProgress);
/// assert_eq!(err.code(), "ENGINE_QUEUE");
/// assert_eq!(err.source_code(), "QUEUE_DRAIN_IN_PROGRESS");
/// assert!(err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EngineError {
    #[error(transparent)]
    Registry(#[from] RegistryError),

    #[error(transparent)]
    Queue(#[from] QueueError),

    #[error(transparent)]
    Scenario(#[from] ScenarioError),
}

impl EngineError {
    /// Code of the wrapped layer error.
    #[must_use]
    pub fn source_code(&self) -> &'static str {
        match self {
            Self::Registry(e) => e.code(),
            Self::Queue(e) => e.code(),
            Self::Scenario(e) => e.code(),
        }
    }
}

impl ErrorCode for EngineError {
    fn code(&self) -> &'static str {
        match self {
            Self::Registry(_) => "ENGINE_REGISTRY",
            Self::Queue(_) => "ENGINE_QUEUE",
            Self::Scenario(_) => "ENGINE_SCENARIO",
        }
    }

    fn is_recoverable(&self) -> bool {
        match self {
            Self::Registry(e) => e.is_recoverable(),
            Self::Queue(e) => e.is_recoverable(),
            Self::Scenario(e) => e.is_recoverable(),
        }
    }
}
