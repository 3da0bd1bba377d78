//! Boundary to the collaborator systems.
//!
//! The engine never talks to a system directly. It hands an
//! [`ActionRequest`] to a [`SystemDispatcher`] and bounds the call with
//! the configured dispatch timeout:
//!
//! ```text
//! engine ──timeout(dispatch)──▶ SystemDispatcher ──▶ collaborator
//!    ▲                                                   │
//!    └──────── Ok(value) / Err(DispatchError) ◀──────────┘
//! ```
//!
//! # Implementations
//!
//! | Type | Behavior |
//! |------|----------|
//! | [`NullDispatcher`] | Accepts everything |
//! | [`LoggingDispatcher`] | Logs each request, accepts everything |
//! | [`ScriptedDispatcher`](crate::testing::ScriptedDispatcher) | Scripted failures and delays for tests |

mod error;

pub use error::DispatchError;

use async_trait::async_trait;
use conductor_event::ActionRequest;
use serde_json::Value;
use tracing::info;

/// Delivers actions to collaborator systems.
///
/// # Contract
///
/// - Must be cancel-safe: the engine drops the future on timeout.
/// - Must not call back into the engine.
#[async_trait]
pub trait SystemDispatcher: Send + Sync {
    /// Delivers one action and returns the system's answer.
    async fn dispatch(&self, request: &ActionRequest) -> Result<Value, DispatchError>;
}

/// Accepts every request without doing anything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDispatcher;

#[async_trait]
impl SystemDispatcher for NullDispatcher {
    async fn dispatch(&self, _request: &ActionRequest) -> Result<Value, DispatchError> {
        Ok(Value::Null)
    }
}

/// Logs every request at info level and accepts it.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingDispatcher;

#[async_trait]
impl SystemDispatcher for LoggingDispatcher {
    async fn dispatch(&self, request: &ActionRequest) -> Result<Value, DispatchError> {
        info!(
            target_system = %request.target,
            action = %request.action_type,
            params = %request.params,
            "dispatch"
        );
        Ok(Value::Null)
    }
}
