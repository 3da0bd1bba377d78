//! Statistical heuristics over telemetry: response-time anomalies and
//! hour-of-day scenario usage. Plain counting and z-scores.

use crate::config::InsightConfig;
use std::collections::{BTreeMap, HashMap, VecDeque};

/// Something unusual about a heartbeat sample.
#[derive(Debug, Clone, PartialEq)]
pub enum Insight {
    Bottleneck { response_time_ms: f64 },
    Anomaly { metric: String, value: f64, z_score: f64 },
}

pub const RESPONSE_TIME_METRIC: &str = "response_time_ms";

/// Rolling z-score detector for heartbeat response times.
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: InsightConfig,
    windows: HashMap<String, VecDeque<f64>>,
}

impl AnomalyDetector {
    #[must_use]
    pub fn new(config: InsightConfig) -> Self {
        Self {
            config,
            windows: HashMap::new(),
        }
    }

    /// Scores `value` against the samples seen before it, then adds it
    /// to the window.
    pub fn observe(&mut self, system: &str, value: f64) -> Vec<Insight> {
        let mut insights = Vec::new();
        if !value.is_finite() {
            return insights;
        }
        if value > self.config.bottleneck_response_ms {
            insights.push(Insight::Bottleneck {
                response_time_ms: value,
            });
        }

        let window = self.windows.entry(system.to_string()).or_default();
        if window.len() >= self.config.min_samples {
            let n = window.len() as f64;
            let mean = window.iter().sum::<f64>() / n;
            let variance = window.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
            let std = variance.sqrt();
            if std > 0.0 {
                let z = (value - mean) / std;
                if z.abs() >= self.config.z_threshold {
                    insights.push(Insight::Anomaly {
                        metric: RESPONSE_TIME_METRIC.to_string(),
                        value,
                        z_score: z,
                    });
                }
            }
        }

        window.push_back(value);
        while window.len() > self.config.window {
            window.pop_front();
        }
        insights
    }

    pub fn remove(&mut self, system: &str) {
        self.windows.remove(system);
    }
}

/// Most likely scenario per hour of day.
#[derive(Debug, Clone, PartialEq)]
pub struct Prediction {
    pub scenario: String,
    /// Share of this hour's executions, in `(0, 1]`.
    pub frequency: f64,
}

/// Counts scenario executions per hour of day.
#[derive(Debug, Clone, Default)]
pub struct UsagePredictor {
    counts: BTreeMap<u8, BTreeMap<String, u64>>,
}

impl UsagePredictor {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, hour: u8, scenario: &str) {
        *self
            .counts
            .entry(hour % 24)
            .or_default()
            .entry(scenario.to_string())
            .or_default() += 1;
    }

    /// Most frequent scenario at `hour`; ties go to the name that sorts
    /// first.
    #[must_use]
    pub fn predict(&self, hour: u8) -> Option<Prediction> {
        let counts = self.counts.get(&(hour % 24))?;
        let total: u64 = counts.values().sum();
        // max_by_key keeps the last maximum; iterate reversed so the
        // alphabetically first name wins.
        let (name, count) = counts.iter().rev().max_by_key(|(_, c)| **c)?;
        Some(Prediction {
            scenario: name.clone(),
            frequency: *count as f64 / total as f64,
        })
    }
}
