//! Action requests delivered to collaborator systems.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single `(targetSystem, actionType, params)` dispatch.
///
/// This is the unit the orchestration core hands to a
/// collaborator subsystem, whether it comes from a matched rule, a
/// scenario step, or the orchestration queue.
///
/// # Example
///
/// ```
/// use conductor_event::ActionRequest;
/// use serde_json::json;
///
/// let req = ActionRequest::new("hvac", "activate-heating")
///     .with_params(json!({ "setpoint": 21.5 }));
///
/// assert_eq!(req.target, "hvac");
/// assert_eq!(req.params["setpoint"], 21.5);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActionRequest {
    /// Name of the registered system that receives the action.
    pub target: String,
    /// Action verb understood by the target, e.g. `activate-cooling`.
    pub action_type: String,
    /// Free-form parameters.
    #[serde(default)]
    pub params: Value,
}

impl ActionRequest {
    /// Creates a request with empty (`null`) params.
    #[must_use]
    pub fn new(target: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            action_type: action_type.into(),
            params: Value::Null,
        }
    }

    /// Sets the params.
    #[must_use]
    pub fn with_params(mut self, params: Value) -> Self {
        self.params = params;
        self
    }
}

impl std::fmt::Display for ActionRequest {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.target, self.action_type)
    }
}
