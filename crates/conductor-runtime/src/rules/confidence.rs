//! Confidence scoring and the adaptive threshold.
//!
//! # Score
//!
//! ```text
//! base      = 0.75
//! history   = weighted success rate for the rule id, else its action key
//! blended   = history ? 0.4 * base + 0.6 * history : base
//! score     = clamp(blended + 0.05 * priority / 10, 0, 1)
//! ```
//!
//! # Threshold
//!
//! Starts at the configured value and moves once per feedback event:
//! down by 0.005 on success, up by 0.01 on failure, always within
//! [0.5, 0.95]. Partial feedback updates the history but leaves the
//! threshold alone.

use super::Rule;
use conductor_event::DecisionOutcome;
use std::collections::HashMap;

pub const BASE_CONFIDENCE: f64 = 0.75;
pub const MIN_THRESHOLD: f64 = 0.5;
pub const MAX_THRESHOLD: f64 = 0.95;

const HISTORY_WEIGHT: f64 = 0.6;
const PRIORITY_BONUS: f64 = 0.05;
const POSITIVE_STEP: f64 = 0.005;
const NEGATIVE_STEP: f64 = 0.01;
const ACCURACY_ALPHA: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct FeedbackStats {
    success: f64,
    total: f64,
}

impl FeedbackStats {
    fn rate(&self) -> Option<f64> {
        (self.total > 0.0).then(|| self.success / self.total)
    }
}

/// Feedback history, threshold and rolling accuracy.
#[derive(Debug, Clone)]
pub struct ConfidenceModel {
    threshold: f64,
    stats: HashMap<String, FeedbackStats>,
    accuracy: f64,
}

impl ConfidenceModel {
    #[must_use]
    pub fn new(threshold: f64) -> Self {
        Self {
            threshold: threshold.clamp(MIN_THRESHOLD, MAX_THRESHOLD),
            stats: HashMap::new(),
            accuracy: 1.0,
        }
    }

    #[must_use]
    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// Exponential moving average of decision outcomes.
    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.accuracy
    }

    /// Historical success rate for `key`, if any feedback was recorded.
    #[must_use]
    pub fn success_rate(&self, key: &str) -> Option<f64> {
        self.stats.get(key).and_then(FeedbackStats::rate)
    }

    #[must_use]
    pub fn score(&self, rule: &Rule) -> f64 {
        let history = self
            .success_rate(&rule.id)
            .or_else(|| self.success_rate(rule.action.conflict_key()));
        let blended = match history {
            Some(rate) => (1.0 - HISTORY_WEIGHT) * BASE_CONFIDENCE + HISTORY_WEIGHT * rate,
            None => BASE_CONFIDENCE,
        };
        (blended + rule.priority.fraction() * PRIORITY_BONUS).clamp(0.0, 1.0)
    }

    /// Records feedback for a rule id or action key.
    ///
    /// Returns the new threshold when it moved. Non-positive or
    /// non-finite weights are ignored.
    pub fn record_feedback(&mut self, key: &str, outcome: DecisionOutcome, weight: f64) -> Option<f64> {
        if !weight.is_finite() || weight <= 0.0 {
            return None;
        }
        let stats = self.stats.entry(key.to_string()).or_default();
        stats.success += outcome.score() * weight;
        stats.total += weight;

        let delta = match outcome {
            DecisionOutcome::Success => -POSITIVE_STEP,
            DecisionOutcome::Failure => NEGATIVE_STEP,
            DecisionOutcome::Partial => return None,
        };
        let next = (self.threshold + delta).clamp(MIN_THRESHOLD, MAX_THRESHOLD);
        if (next - self.threshold).abs() < f64::EPSILON {
            return None;
        }
        self.threshold = next;
        Some(next)
    }

    /// Folds one decision outcome into the rolling accuracy.
    pub fn record_outcome(&mut self, outcome: DecisionOutcome) {
        self.accuracy = (1.0 - ACCURACY_ALPHA) * self.accuracy + ACCURACY_ALPHA * outcome.score();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, RuleAction};

    fn rule(id: &str, priority: i64) -> Rule {
        Rule::new(id, priority, Condition::Always, RuleAction::dispatch("hvac", "activate-heating"))
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn base_score_with_priority_bonus() {
        let model = ConfidenceModel::new(0.6);
        assert!(close(model.score(&rule("r", 10)), 0.80));
        assert!(close(model.score(&rule("r", 1)), 0.755));
    }

    #[test]
    fn history_blends_40_60() {
        let mut model = ConfidenceModel::new(0.6);
        model.record_feedback("r", DecisionOutcome::Failure, 1.0);
        // 0.4 * 0.75 + 0.6 * 0.0 + 0.025
        assert!(close(model.score(&rule("r", 5)), 0.325));
    }

    #[test]
    fn falls_back_to_action_key_history() {
        let mut model = ConfidenceModel::new(0.6);
        model.record_feedback("activate-heating", DecisionOutcome::Success, 2.0);
        model.record_feedback("activate-heating", DecisionOutcome::Failure, 2.0);
        // rate 0.5 -> 0.3 + 0.3 + 0.025
        assert!(close(model.score(&rule("other", 5)), 0.625));
    }

    #[test]
    fn threshold_moves_and_stays_in_bounds() {
        let mut model = ConfidenceModel::new(0.6);
        assert!(close(model.record_feedback("r", DecisionOutcome::Success, 1.0).unwrap(), 0.595));
        assert!(close(model.record_feedback("r", DecisionOutcome::Failure, 1.0).unwrap(), 0.605));
        assert_eq!(model.record_feedback("r", DecisionOutcome::Partial, 1.0), None);

        for _ in 0..500 {
            model.record_feedback("r", DecisionOutcome::Failure, 1.0);
        }
        assert!(close(model.threshold(), MAX_THRESHOLD));
        for _ in 0..500 {
            model.record_feedback("r", DecisionOutcome::Success, 1.0);
        }
        assert!(close(model.threshold(), MIN_THRESHOLD));
        assert_eq!(model.record_feedback("r", DecisionOutcome::Success, 1.0), None);
    }

    #[test]
    fn zero_weight_ignored() {
        let mut model = ConfidenceModel::new(0.6);
        assert_eq!(model.record_feedback("r", DecisionOutcome::Failure, 0.0), None);
        assert_eq!(model.success_rate("r"), None);
    }

    #[test]
    fn initial_threshold_is_clamped() {
        assert!(close(ConfidenceModel::new(0.1).threshold(), MIN_THRESHOLD));
    }

    #[test]
    fn accuracy_ema() {
        let mut model = ConfidenceModel::new(0.6);
        assert!(close(model.accuracy(), 1.0));
        model.record_outcome(DecisionOutcome::Failure);
        assert!(close(model.accuracy(), 0.9));
        model.record_outcome(DecisionOutcome::Partial);
        assert!(close(model.accuracy(), 0.86));
    }
}
