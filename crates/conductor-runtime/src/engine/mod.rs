//! Conductor Engine - orchestrator handle, cycles and EventBus.
//!
//! # Architecture Overview
//!
//! ```text
//!   collaborators                     ConductorEngine                      observers
//! ┌──────────────┐  register/    ┌───────────────────────────────┐
//! │ hvac         │  heartbeat/   │  SystemRegistry ─ breakers    │
//! │ lighting     │──errors──────▶│  OrchestrationQueue           │  events   ┌──────────┐
//! │ security ... │               │  RuleEngine ─ ConfidenceModel │──────────▶│ EventBus │
//! └──────────────┘               │  ScenarioCatalog              │           └──────────┘
//!        ▲                       │  LoadBalancer ─ insight       │
//!        │  SystemDispatcher     └───────────────┬───────────────┘
//!        └───────────(timeout)───────────────────┘
//! ```
//!
//! # Main Types
//!
//! - [`ConductorEngine`]: the handle every caller and cycle goes through
//! - [`EngineBuilder`]: wiring of config, dispatcher, clock and definitions
//! - [`CycleHandles`]: running periodic cycles
//! - [`EventBus`]: fire-and-forget event fan-out
//! - [`EngineError`]: any layer error, implements [`ErrorCode`]
//!
//! [`ErrorCode`]: conductor_types::ErrorCode

mod cycles;
#[allow(clippy::module_inception)]
mod engine;
mod error;
mod eventbus;

pub use cycles::CycleHandles;
pub use engine::{ConductorEngine, DrainReport, EngineBuilder, EvaluationReport};
pub use error::EngineError;
pub use eventbus::{EventBus, DEFAULT_EVENT_CAPACITY};
