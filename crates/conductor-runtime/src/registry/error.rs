//! Registry Layer Errors.
//!
//! # Error Codes
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`RegistryError::MissingName`] | `REGISTRY_MISSING_NAME` | No |
//! | [`RegistryError::InvalidCategory`] | `REGISTRY_INVALID_CATEGORY` | No |
//! | [`RegistryError::UnknownSystem`] | `REGISTRY_UNKNOWN_SYSTEM` | No |
//! | [`RegistryError::CircuitOpen`] | `REGISTRY_CIRCUIT_OPEN` | Yes |
//!
//! `CircuitOpen` clears once the breaker recovers; the rest need the
//! caller to send different input.

use conductor_types::ErrorCode;
use thiserror::Error;

/// Registry layer error.
///
/// # Example
///
/// ```
/// use conductor_runtime::RegistryError;
/// use conductor_types::ErrorCode;
///
/// let err = RegistryError::InvalidCategory("toaster".into());
/// assert_eq!(err.code(), "REGISTRY_INVALID_CATEGORY");
/// assert!(!err.is_recoverable());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registration without a (non-blank) name.
    #[error("system name is required")]
    MissingName,

    /// Category outside the closed set.
    #[error("invalid system category: {0}")]
    InvalidCategory(String),

    /// No system registered under this name.
    #[error("unknown system: {0}")]
    UnknownSystem(String),

    /// Operation refused while the system's breaker is open.
    #[error("circuit open for system: {0}")]
    CircuitOpen(String),
}

impl ErrorCode for RegistryError {
    fn code(&self) -> &'static str {
        match self {
            Self::MissingName => "REGISTRY_MISSING_NAME",
            Self::InvalidCategory(_) => "REGISTRY_INVALID_CATEGORY",
            Self::UnknownSystem(_) => "REGISTRY_UNKNOWN_SYSTEM",
            Self::CircuitOpen(_) => "REGISTRY_CIRCUIT_OPEN",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::CircuitOpen(_))
    }
}
