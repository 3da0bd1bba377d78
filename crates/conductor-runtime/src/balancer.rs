//! Advisory load shedding.
//!
//! ```text
//! score = cpu_weight * cpu% + memory_weight * (memory_mb / budget_mb) * 100
//!
//! score >  threshold && priority < ceiling  ─▶ shed
//! score <= threshold                        ─▶ restored
//! ```
//!
//! The shed set is exposed for callers to consult. Nothing in the queue
//! or the dispatcher reads it.

use crate::config::BalancerConfig;
use crate::registry::LoadSample;
use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info};

/// A change in shed membership produced by one pass.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadChange {
    Shed { system: String, score: f64 },
    Restored { system: String, score: f64 },
}

/// Snapshot of the last pass.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct LoadStatus {
    pub scores: BTreeMap<String, f64>,
    pub shed: Vec<String>,
    pub overload_threshold: f64,
}

#[derive(Debug, Clone)]
pub struct LoadBalancer {
    config: BalancerConfig,
    scores: BTreeMap<String, f64>,
    shed: BTreeSet<String>,
}

impl LoadBalancer {
    #[must_use]
    pub fn new(config: BalancerConfig) -> Self {
        Self {
            config,
            scores: BTreeMap::new(),
            shed: BTreeSet::new(),
        }
    }

    #[must_use]
    pub fn score(&self, sample: &LoadSample) -> f64 {
        let memory_pct = if sample.memory_budget_mb > 0.0 {
            sample.memory_mb / sample.memory_budget_mb * 100.0
        } else {
            0.0
        };
        self.config.cpu_weight * sample.cpu_percent + self.config.memory_weight * memory_pct
    }

    /// Scores every sample and updates the shed set.
    ///
    /// Systems missing from `samples` are dropped from both the scores
    /// and the shed set.
    pub fn rebalance(&mut self, samples: &[LoadSample]) -> Vec<LoadChange> {
        let threshold = self.config.overload_threshold;
        let ceiling = self.config.shed_priority_ceiling;
        let mut changes = Vec::new();

        let present: BTreeSet<&str> = samples.iter().map(|s| s.name.as_str()).collect();
        self.scores.retain(|name, _| present.contains(name.as_str()));
        self.shed.retain(|name| present.contains(name.as_str()));

        for sample in samples {
            let score = self.score(sample);
            self.scores.insert(sample.name.clone(), score);

            if score > threshold && sample.priority.get() < ceiling {
                if self.shed.insert(sample.name.clone()) {
                    info!(system = %sample.name, score, "load shed");
                    changes.push(LoadChange::Shed {
                        system: sample.name.clone(),
                        score,
                    });
                }
            } else if score <= threshold && self.shed.remove(&sample.name) {
                info!(system = %sample.name, score, "load restored");
                changes.push(LoadChange::Restored {
                    system: sample.name.clone(),
                    score,
                });
            }
        }
        debug!(systems = samples.len(), shed = self.shed.len(), "load balanced");
        changes
    }

    #[must_use]
    pub fn is_shed(&self, name: &str) -> bool {
        self.shed.contains(name)
    }

    pub fn remove(&mut self, name: &str) {
        self.scores.remove(name);
        self.shed.remove(name);
    }

    #[must_use]
    pub fn status(&self) -> LoadStatus {
        LoadStatus {
            scores: self.scores.clone(),
            shed: self.shed.iter().cloned().collect(),
            overload_threshold: self.config.overload_threshold,
        }
    }
}
