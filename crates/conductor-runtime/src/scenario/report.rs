//! Per-run scenario results.

use conductor_event::{ActionRequest, DecisionOutcome};
use serde::{Deserialize, Serialize};

/// Reason recorded when a step's target breaker is open.
pub const SKIP_CIRCUIT_OPEN: &str = "circuit-open";
/// Reason recorded when a step's target is not registered.
pub const SKIP_UNKNOWN_SYSTEM: &str = "unknown-system";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum StepStatus {
    Executed,
    Skipped { reason: String },
    Failed { error: String },
}

impl StepStatus {
    #[must_use]
    pub fn is_executed(&self) -> bool {
        matches!(self, Self::Executed)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StepResult {
    pub request: ActionRequest,
    #[serde(flatten)]
    pub status: StepStatus,
}

/// Result of one scenario run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScenarioReport {
    pub scenario: String,
    /// `true` only when every step executed.
    pub success: bool,
    pub outcome: DecisionOutcome,
    pub steps: Vec<StepResult>,
    pub duration_ms: u64,
}

impl ScenarioReport {
    /// Builds the report; success and outcome follow from the steps.
    #[must_use]
    pub fn new(scenario: impl Into<String>, steps: Vec<StepResult>, duration_ms: u64) -> Self {
        let success = steps.iter().all(|s| s.status.is_executed());
        Self {
            scenario: scenario.into(),
            success,
            outcome: if success {
                DecisionOutcome::Success
            } else {
                DecisionOutcome::Partial
            },
            steps,
            duration_ms,
        }
    }

    #[must_use]
    pub fn executed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Executed))
    }

    #[must_use]
    pub fn skipped(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Skipped { .. }))
    }

    #[must_use]
    pub fn failed(&self) -> usize {
        self.count(|s| matches!(s, StepStatus::Failed { .. }))
    }

    /// Distinct targets, in step order.
    #[must_use]
    pub fn systems(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for step in &self.steps {
            if !out.contains(&step.request.target) {
                out.push(step.request.target.clone());
            }
        }
        out
    }

    fn count(&self, f: impl Fn(&StepStatus) -> bool) -> usize {
        self.steps.iter().filter(|s| f(&s.status)).count()
    }
}
