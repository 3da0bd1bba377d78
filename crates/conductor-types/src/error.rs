//! Unified error interface for conductor.
//!
//! Every layer of the orchestration core defines its own error enum
//! (registry, queue, scenario, dispatch, ...). All of them implement
//! [`ErrorCode`] so that callers, logs and dashboards see one stable
//! vocabulary regardless of where the failure originated.
//!
//! # Example
//!
//! ```
//! use conductor_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum HeaterError {
//!     Unreachable,
//!     BadSetpoint(f64),
//! }
//!
//! impl ErrorCode for HeaterError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Unreachable => "HEATER_UNREACHABLE",
//!             Self::BadSetpoint(_) => "HEATER_BAD_SETPOINT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Unreachable)
//!     }
//! }
//!
//! let err = HeaterError::Unreachable;
//! assert_eq!(err.code(), "HEATER_UNREACHABLE");
//! assert!(err.is_recoverable());
//! ```

/// Machine-readable error classification.
///
/// # Code Format
///
/// - **UPPER_SNAKE_CASE**, e.g. `"QUEUE_FULL"`
/// - **Prefixed by layer**: `REGISTRY_`, `QUEUE_`, `SCENARIO_`, `DISPATCH_`, ...
/// - **Stable**: codes are part of the query surface and must not change
///
/// # Recoverability
///
/// Recoverable errors are transient: a dispatch timeout or a subsystem
/// reporting a temporary fault may succeed on the next attempt, so the
/// orchestration queue retries them. Configuration errors (unknown
/// category, missing name, unknown scenario) never become valid by
/// retrying.
pub trait ErrorCode {
    /// Returns the stable machine-readable code.
    fn code(&self) -> &'static str;

    /// Returns `true` if retrying may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code follows conductor conventions.
///
/// # Panics
///
/// Panics if the code is empty, lacks `expected_prefix`, or is not
/// UPPER_SNAKE_CASE. Intended for tests.
///
/// # Example
///
/// ```
/// use conductor_types::{assert_error_code, ErrorCode};
///
/// struct Full;
///
/// impl ErrorCode for Full {
///     fn code(&self) -> &'static str { "QUEUE_FULL" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Full, "QUEUE_");
/// ```
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Asserts [`assert_error_code`] for every variant in `errors`.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
