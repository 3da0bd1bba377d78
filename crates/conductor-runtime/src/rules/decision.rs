//! Decision log.

use conductor_event::DecisionOutcome;
use conductor_types::DecisionId;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;

/// One executed rule or scenario. Never modified after it is logged.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Decision {
    pub id: DecisionId,
    pub timestamp_ms: u64,
    pub rule_id: Option<String>,
    pub scenario: Option<String>,
    /// Systems the decision acted on.
    pub systems: Vec<String>,
    pub confidence: f64,
    pub outcome: DecisionOutcome,
    pub duration_ms: u64,
}

/// Append-only ring buffer of decisions.
#[derive(Debug, Clone)]
pub struct DecisionLog {
    entries: VecDeque<Decision>,
    capacity: usize,
}

impl DecisionLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::with_capacity(capacity.min(1024)),
            capacity,
        }
    }

    pub fn push(&mut self, decision: Decision) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(decision);
    }

    /// Up to `n` decisions, newest first.
    #[must_use]
    pub fn recent(&self, n: usize) -> Vec<Decision> {
        self.entries.iter().rev().take(n).cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn decision(ts: u64) -> Decision {
        Decision {
            id: DecisionId::new(),
            timestamp_ms: ts,
            rule_id: Some("r".into()),
            scenario: None,
            systems: vec!["hvac".into()],
            confidence: 0.8,
            outcome: DecisionOutcome::Success,
            duration_ms: 0,
        }
    }

    #[test]
    fn recent_is_newest_first_and_capped() {
        let mut log = DecisionLog::new(3);
        for ts in 0..5 {
            log.push(decision(ts));
        }
        assert_eq!(log.len(), 3);
        let ts: Vec<_> = log.recent(10).into_iter().map(|d| d.timestamp_ms).collect();
        assert_eq!(ts, vec![4, 3, 2]);
        assert_eq!(log.recent(1)[0].timestamp_ms, 4);
    }
}
