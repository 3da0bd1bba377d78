//! Event categories for observer filtering.
//!
//! Observers that only care about a slice of the telemetry (a dashboard
//! showing breaker state, an alerting hook for anomalies) filter the
//! event stream by category instead of matching every variant.
//!
//! | Category | Events |
//! |----------|--------|
//! | `Lifecycle` | system registered / unregistered |
//! | `Health` | stale, offline, circuit open / half-open / recovered, cascade |
//! | `Dispatch` | action dispatched / failed / skipped / dead-lettered, scenario completed |
//! | `Decision` | decision logged, conflict resolved, confirmation required, threshold adjusted |
//! | `Load` | load shed / restored |
//! | `Insight` | bottleneck, anomaly |

use serde::{Deserialize, Serialize};

/// Coarse grouping of [`ConductorEvent`](crate::ConductorEvent)s.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventCategory {
    Lifecycle,
    Health,
    Dispatch,
    Decision,
    Load,
    Insight,
}

impl EventCategory {
    /// Returns the display name of this category.
    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lifecycle => "lifecycle",
            Self::Health => "health",
            Self::Dispatch => "dispatch",
            Self::Decision => "decision",
            Self::Load => "load",
            Self::Insight => "insight",
        }
    }
}

impl std::fmt::Display for EventCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_display() {
        assert_eq!(EventCategory::Health.to_string(), "health");
        assert_eq!(EventCategory::Insight.to_string(), "insight");
    }

    #[test]
    fn category_hash() {
        use std::collections::HashSet;

        let mut set = HashSet::new();
        set.insert(EventCategory::Load);
        set.insert(EventCategory::Decision);
        set.insert(EventCategory::Load);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn category_serde() {
        let json = serde_json::to_string(&EventCategory::Dispatch).unwrap();
        assert_eq!(json, "\"dispatch\"");
        let cat: EventCategory = serde_json::from_str("\"lifecycle\"").unwrap();
        assert_eq!(cat, EventCategory::Lifecycle);
    }
}
