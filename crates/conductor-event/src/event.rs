//! Lifecycle and telemetry events.
//!
//! Events are published fire-and-forget by the orchestration core. They
//! describe what already happened; observers cannot veto or delay them.

use crate::{ActionRequest, EventCategory};
use conductor_types::{DecisionId, Priority, SystemCategory};
use serde::{Deserialize, Serialize};

/// Outcome recorded for a decision or scenario run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DecisionOutcome {
    /// Every action was carried out (or accepted for dispatch).
    Success,
    /// Some actions ran, others were skipped or failed.
    Partial,
    /// Nothing ran.
    Failure,
}

impl DecisionOutcome {
    /// Score used by the rolling accuracy metric.
    #[must_use]
    pub fn score(self) -> f64 {
        match self {
            Self::Success => 1.0,
            Self::Partial => 0.5,
            Self::Failure => 0.0,
        }
    }
}

impl std::fmt::Display for DecisionOutcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Success => f.write_str("success"),
            Self::Partial => f.write_str("partial"),
            Self::Failure => f.write_str("failure"),
        }
    }
}

/// Everything the orchestration core tells the outside world.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ConductorEvent {
    SystemRegistered {
        system: String,
        category: SystemCategory,
        priority: Priority,
    },
    SystemUnregistered {
        system: String,
    },
    /// No heartbeat within the heartbeat timeout.
    SystemStale {
        system: String,
        last_heartbeat_ms: u64,
    },
    /// Reported offline by its own adapter.
    SystemOffline {
        system: String,
    },
    CircuitOpened {
        system: String,
        failures: u32,
    },
    CircuitHalfOpen {
        system: String,
    },
    CircuitRecovered {
        system: String,
    },
    /// One event per breaker opening, listing every transitive dependent.
    CascadeFailure {
        source: String,
        affected: Vec<String>,
    },
    ActionDispatched {
        request: ActionRequest,
    },
    ActionFailed {
        request: ActionRequest,
        error: String,
        attempts: u32,
    },
    ActionSkipped {
        request: ActionRequest,
        reason: String,
    },
    ActionDeadLettered {
        request: ActionRequest,
        reason: String,
    },
    ScenarioCompleted {
        scenario: String,
        success: bool,
        executed: usize,
        skipped: usize,
        failed: usize,
        duration_ms: u64,
    },
    DecisionLogged {
        decision_id: DecisionId,
        rule_id: Option<String>,
        scenario: Option<String>,
        outcome: DecisionOutcome,
        confidence: f64,
    },
    ConflictResolved {
        conflict_type: String,
        winner: String,
        loser: String,
    },
    /// A rule matched but scored below the confidence threshold.
    ConfirmationRequired {
        rule_id: String,
        confidence: f64,
        threshold: f64,
    },
    ThresholdAdjusted {
        threshold: f64,
    },
    LoadShed {
        system: String,
        score: f64,
    },
    LoadRestored {
        system: String,
        score: f64,
    },
    BottleneckDetected {
        system: String,
        response_time_ms: f64,
    },
    AnomalyDetected {
        system: String,
        metric: String,
        value: f64,
        z_score: f64,
    },
}

impl ConductorEvent {
    /// Returns the category this event belongs to.
    #[must_use]
    pub fn category(&self) -> EventCategory {
        match self {
            Self::SystemRegistered { .. } | Self::SystemUnregistered { .. } => {
                EventCategory::Lifecycle
            }
            Self::SystemStale { .. }
            | Self::SystemOffline { .. }
            | Self::CircuitOpened { .. }
            | Self::CircuitHalfOpen { .. }
            | Self::CircuitRecovered { .. }
            | Self::CascadeFailure { .. } => EventCategory::Health,
            Self::ActionDispatched { .. }
            | Self::ActionFailed { .. }
            | Self::ActionSkipped { .. }
            | Self::ActionDeadLettered { .. }
            | Self::ScenarioCompleted { .. } => EventCategory::Dispatch,
            Self::DecisionLogged { .. }
            | Self::ConflictResolved { .. }
            | Self::ConfirmationRequired { .. }
            | Self::ThresholdAdjusted { .. } => EventCategory::Decision,
            Self::LoadShed { .. } | Self::LoadRestored { .. } => EventCategory::Load,
            Self::BottleneckDetected { .. } | Self::AnomalyDetected { .. } => {
                EventCategory::Insight
            }
        }
    }

    /// Returns the system this event is about, if it concerns exactly one.
    #[must_use]
    pub fn system(&self) -> Option<&str> {
        match self {
            Self::SystemRegistered { system, .. }
            | Self::SystemUnregistered { system }
            | Self::SystemStale { system, .. }
            | Self::SystemOffline { system }
            | Self::CircuitOpened { system, .. }
            | Self::CircuitHalfOpen { system }
            | Self::CircuitRecovered { system }
            | Self::LoadShed { system, .. }
            | Self::LoadRestored { system, .. }
            | Self::BottleneckDetected { system, .. }
            | Self::AnomalyDetected { system, .. } => Some(system),
            Self::CascadeFailure { source, .. } => Some(source),
            Self::ActionDispatched { request }
            | Self::ActionFailed { request, .. }
            | Self::ActionSkipped { request, .. }
            | Self::ActionDeadLettered { request, .. } => Some(&request.target),
            Self::ScenarioCompleted { .. }
            | Self::DecisionLogged { .. }
            | Self::ConflictResolved { .. }
            | Self::ConfirmationRequired { .. }
            | Self::ThresholdAdjusted { .. } => None,
        }
    }
}
