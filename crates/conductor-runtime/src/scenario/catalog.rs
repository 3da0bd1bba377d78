//! Scenario definitions and the catalog that owns them.

use super::ScenarioError;
use conductor_event::ActionRequest;
use conductor_types::Priority;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

fn enabled_by_default() -> bool {
    true
}

/// A named, ordered bundle of actions.
///
/// Only the execution bookkeeping (`execution_count`,
/// `average_duration_ms`) changes after load.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Scenario {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub actions: Vec<ActionRequest>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
    #[serde(default, skip_deserializing)]
    pub execution_count: u64,
    #[serde(default, skip_deserializing)]
    pub average_duration_ms: f64,
}

impl Scenario {
    #[must_use]
    pub fn new(name: impl Into<String>, actions: Vec<ActionRequest>) -> Self {
        Self {
            name: name.into(),
            description: None,
            actions,
            priority: Priority::NORMAL,
            enabled: true,
            execution_count: 0,
            average_duration_ms: 0.0,
        }
    }

    #[must_use]
    pub fn with_priority(mut self, priority: i64) -> Self {
        self.priority = Priority::new(priority);
        self
    }

    #[must_use]
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Systems this scenario touches, in step order, without repeats.
    #[must_use]
    pub fn systems(&self) -> Vec<String> {
        let mut out: Vec<String> = Vec::new();
        for action in &self.actions {
            if !out.contains(&action.target) {
                out.push(action.target.clone());
            }
        }
        out
    }
}

/// Scenarios keyed by name.
#[derive(Debug, Clone, Default)]
pub struct ScenarioCatalog {
    scenarios: BTreeMap<String, Scenario>,
}

impl ScenarioCatalog {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts or replaces a scenario. Returns the previous definition.
    pub fn insert(&mut self, scenario: Scenario) -> Option<Scenario> {
        self.scenarios.insert(scenario.name.clone(), scenario)
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<&Scenario> {
        self.scenarios.get(name)
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.scenarios.contains_key(name)
    }

    /// All scenarios, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<Scenario> {
        self.scenarios.values().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.scenarios.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.scenarios.is_empty()
    }

    /// Steps to run for `name`.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::NotFound`] or [`ScenarioError::Disabled`].
    pub fn prepare(&self, name: &str) -> Result<Vec<ActionRequest>, ScenarioError> {
        let scenario = self
            .scenarios
            .get(name)
            .ok_or_else(|| ScenarioError::NotFound(name.to_string()))?;
        if !scenario.enabled {
            return Err(ScenarioError::Disabled(name.to_string()));
        }
        Ok(scenario.actions.clone())
    }

    /// Folds one run into the running average.
    pub fn record_execution(&mut self, name: &str, duration_ms: u64) {
        if let Some(s) = self.scenarios.get_mut(name) {
            s.execution_count += 1;
            let n = s.execution_count as f64;
            s.average_duration_ms += (duration_ms as f64 - s.average_duration_ms) / n;
        }
    }

    /// Returns `false` if the scenario is unknown.
    pub fn set_enabled(&mut self, name: &str, enabled: bool) -> bool {
        match self.scenarios.get_mut(name) {
            Some(s) => {
                s.enabled = enabled;
                true
            }
            None => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ScenarioCatalog {
        let mut c = ScenarioCatalog::new();
        c.insert(Scenario::new(
            "good-night",
            vec![
                ActionRequest::new("lighting", "lights-off"),
                ActionRequest::new("security", "arm-security"),
                ActionRequest::new("lighting", "dim-hall"),
            ],
        ));
        c.insert(Scenario::new("party", vec![ActionRequest::new("audio", "play")]).disabled());
        c
    }

    #[test]
    fn prepare_fails_fast() {
        let c = catalog();
        assert_eq!(c.prepare("good-night").unwrap().len(), 3);
        assert_eq!(c.prepare("nope"), Err(ScenarioError::NotFound("nope".into())));
        assert_eq!(c.prepare("party"), Err(ScenarioError::Disabled("party".into())));
    }

    #[test]
    fn running_average() {
        let mut c = catalog();
        c.record_execution("good-night", 10);
        c.record_execution("good-night", 20);
        c.record_execution("good-night", 30);
        let s = c.get("good-night").unwrap();
        assert_eq!(s.execution_count, 3);
        assert!((s.average_duration_ms - 20.0).abs() < 1e-9);
    }

    #[test]
    fn enable_toggle() {
        let mut c = catalog();
        assert!(c.set_enabled("party", true));
        assert!(c.prepare("party").is_ok());
        assert!(!c.set_enabled("nope", true));
    }

    #[test]
    fn systems_deduplicated_in_order() {
        let c = catalog();
        assert_eq!(c.get("good-night").unwrap().systems(), vec!["lighting", "security"]);
        let names: Vec<_> = c.list().into_iter().map(|s| s.name).collect();
        assert_eq!(names, vec!["good-night", "party"]);
    }

    #[test]
    fn deserializes_with_defaults() {
        let s: Scenario = toml::from_str(
            r#"
            name = "morning"
            priority = 42
            actions = [{ target = "blinds", action_type = "open-blinds" }]
            "#,
        )
        .unwrap();
        assert!(s.enabled);
        assert_eq!(s.priority, Priority::MAX);
        assert_eq!(s.execution_count, 0);
    }
}
