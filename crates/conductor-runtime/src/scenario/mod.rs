//! Scenarios: named, ordered bundles of per-system actions.
//!
//! The catalog owns definitions and bookkeeping. Running a scenario
//! needs the registry and the dispatcher, so that lives on the engine
//! (`ConductorEngine::execute_scenario`); this module supplies the
//! steps and the report shape.

mod catalog;
mod error;
mod report;

pub use catalog::{Scenario, ScenarioCatalog};
pub use error::ScenarioError;
pub use report::{ScenarioReport, StepResult, StepStatus, SKIP_CIRCUIT_OPEN, SKIP_UNKNOWN_SYSTEM};
