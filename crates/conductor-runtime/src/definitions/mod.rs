//! Declarative definitions: systems, conflict pairs, rules, scenarios.
//!
//! ```toml
//! [[systems]]
//! name = "hvac"
//! category = "climate"
//! priority = 9
//! dependencies = ["power"]
//!
//! [[conflicts]]
//! a = "open-windows"
//! b = "activate-heating"
//!
//! [[rules]]
//! id = "heat-when-cold"
//! priority = 9
//! condition = { kind = "sensor_below", sensor = "indoor_temp", value = 18.0 }
//! action = { kind = "dispatch", target = "hvac", action_type = "activate-heating" }
//!
//! [[scenarios]]
//! name = "good-night"
//! actions = [{ target = "lighting", action_type = "lights-off" }]
//! ```
//!
//! Every section is optional. Parsing validates the whole file; a file
//! that loads is safe to hand to
//! [`EngineBuilder::definitions`](crate::EngineBuilder::definitions).

mod error;

pub use error::DefinitionError;

use crate::registry::SystemRegistration;
use crate::rules::{ConflictPair, Rule, RuleAction};
use crate::scenario::Scenario;
use conductor_types::SystemCategory;
use serde::Deserialize;
use std::collections::HashSet;
use std::path::Path;

/// Parsed and validated definitions.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Definitions {
    pub systems: Vec<SystemRegistration>,
    pub conflicts: Vec<ConflictPair>,
    pub rules: Vec<Rule>,
    pub scenarios: Vec<Scenario>,
}

/// Counts per section.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DefinitionSummary {
    pub systems: usize,
    pub conflicts: usize,
    pub rules: usize,
    pub scenarios: usize,
}

impl std::fmt::Display for DefinitionSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} systems, {} conflict pairs, {} rules, {} scenarios",
            self.systems, self.conflicts, self.rules, self.scenarios
        )
    }
}

impl Definitions {
    /// Parses and validates definitions from a TOML string.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::Parse`] or any validation error.
    pub fn from_toml(toml_str: &str) -> Result<Self, DefinitionError> {
        Self::parse(toml_str, "<inline>")
    }

    /// Reads, parses and validates a definitions file.
    ///
    /// # Errors
    ///
    /// [`DefinitionError::ReadFile`], [`DefinitionError::Parse`] or any
    /// validation error.
    pub fn load(path: &Path) -> Result<Self, DefinitionError> {
        let content = std::fs::read_to_string(path).map_err(|source| DefinitionError::ReadFile {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(&content, &path.display().to_string())
    }

    fn parse(toml_str: &str, origin: &str) -> Result<Self, DefinitionError> {
        let defs: Self = toml::from_str(toml_str).map_err(|source| DefinitionError::Parse {
            origin: origin.to_string(),
            source,
        })?;
        defs.validate()?;
        Ok(defs)
    }

    /// Checks names, duplicates, categories and scenario references.
    ///
    /// # Errors
    ///
    /// The first problem found.
    pub fn validate(&self) -> Result<(), DefinitionError> {
        let mut systems = HashSet::new();
        for system in &self.systems {
            let name = system.name.trim();
            if name.is_empty() {
                return Err(DefinitionError::EmptyId { kind: "system" });
            }
            if !systems.insert(name) {
                return Err(DefinitionError::DuplicateSystem(name.to_string()));
            }
            if system.category.parse::<SystemCategory>().is_err() {
                return Err(DefinitionError::InvalidCategory {
                    system: name.to_string(),
                    category: system.category.clone(),
                });
            }
        }

        let mut scenarios = HashSet::new();
        for scenario in &self.scenarios {
            if scenario.name.trim().is_empty() {
                return Err(DefinitionError::EmptyId { kind: "scenario" });
            }
            if !scenarios.insert(scenario.name.as_str()) {
                return Err(DefinitionError::DuplicateScenario(scenario.name.clone()));
            }
            if scenario.actions.is_empty() {
                return Err(DefinitionError::EmptyScenario(scenario.name.clone()));
            }
        }

        let mut rules = HashSet::new();
        for rule in &self.rules {
            if rule.id.trim().is_empty() {
                return Err(DefinitionError::EmptyId { kind: "rule" });
            }
            if !rules.insert(rule.id.as_str()) {
                return Err(DefinitionError::DuplicateRule(rule.id.clone()));
            }
            if let RuleAction::TriggerScenario { scenario } = &rule.action {
                if !scenarios.contains(scenario.as_str()) {
                    return Err(DefinitionError::UnknownScenario {
                        rule: rule.id.clone(),
                        scenario: scenario.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    #[must_use]
    pub fn summary(&self) -> DefinitionSummary {
        DefinitionSummary {
            systems: self.systems.len(),
            conflicts: self.conflicts.len(),
            rules: self.rules.len(),
            scenarios: self.scenarios.len(),
        }
    }
}
