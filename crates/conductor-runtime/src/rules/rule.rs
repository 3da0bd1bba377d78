//! Rule definitions.

use super::Condition;
use conductor_event::ActionRequest;
use conductor_types::{Priority, SystemCategory};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// What a matched rule does.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum RuleAction {
    /// Queue one action for one system.
    Dispatch {
        target: String,
        action_type: String,
        #[serde(default)]
        params: Value,
    },
    /// Run a named scenario.
    TriggerScenario { scenario: String },
}

impl RuleAction {
    #[must_use]
    pub fn dispatch(target: impl Into<String>, action_type: impl Into<String>) -> Self {
        Self::Dispatch {
            target: target.into(),
            action_type: action_type.into(),
            params: Value::Null,
        }
    }

    #[must_use]
    pub fn trigger_scenario(scenario: impl Into<String>) -> Self {
        Self::TriggerScenario {
            scenario: scenario.into(),
        }
    }

    /// Name looked up in the conflict table: the action type for
    /// dispatches, the scenario name for triggers.
    #[must_use]
    pub fn conflict_key(&self) -> &str {
        match self {
            Self::Dispatch { action_type, .. } => action_type,
            Self::TriggerScenario { scenario } => scenario,
        }
    }

    /// The request a dispatch action sends.
    #[must_use]
    pub fn request(&self) -> Option<ActionRequest> {
        match self {
            Self::Dispatch {
                target,
                action_type,
                params,
            } => Some(ActionRequest::new(target.clone(), action_type.clone()).with_params(params.clone())),
            Self::TriggerScenario { .. } => None,
        }
    }
}

/// A rule. Immutable once loaded into the engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Rule {
    pub id: String,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub category: Option<SystemCategory>,
    #[serde(default)]
    pub description: Option<String>,
    pub condition: Condition,
    pub action: RuleAction,
}

impl Rule {
    /// Priority is clamped to 1–10.
    #[must_use]
    pub fn new(id: impl Into<String>, priority: i64, condition: Condition, action: RuleAction) -> Self {
        Self {
            id: id.into(),
            priority: Priority::new(priority),
            category: None,
            description: None,
            condition,
            action,
        }
    }

    #[must_use]
    pub fn with_category(mut self, category: SystemCategory) -> Self {
        self.category = Some(category);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }
}
