//! Conductor Runtime - the cross-system orchestration core.
//!
//! Coordinates many independent subsystems ("systems": climate,
//! lighting, security, ...) through declarative rules, named multi-step
//! scenarios and a fault-tolerant dispatch pipeline.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Vocabulary Layer                          │
//! ├─────────────────────────────────────────────────────────────┤
//! │  conductor-types : ErrorCode, IDs, Priority, SystemCategory │
//! │  conductor-event : ActionRequest, ConductorEvent            │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                │
//! ├─────────────────────────────────────────────────────────────┤
//! │  registry/  : SystemRegistry, CircuitBreaker, DependencyGraph│
//! │  queue/     : OrchestrationQueue, dead letters              │
//! │  rules/     : Condition, RuleEngine, ConfidenceModel        │
//! │  scenario/  : ScenarioCatalog, ScenarioReport               │
//! │  balancer   : LoadBalancer                                  │
//! │  insight    : AnomalyDetector, UsagePredictor               │
//! │  engine/    : ConductorEngine, cycles, EventBus             │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Frontend Layer                            │
//! │  (conductor-cli)                                            │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Data Flow
//!
//! ```text
//! register ─▶ SystemRegistry ◀─ heartbeats / errors
//!                  │ breakers gate dispatch
//! Context ─▶ RuleEngine ─▶ conflicts pruned ─▶ confidence ≥ threshold?
//!                                               │ yes            │ no
//!                          dispatch ─▶ OrchestrationQueue   ConfirmationRequired
//!                          scenario ─▶ executed step by step
//!                                               │
//!                     outcomes ─▶ DecisionLog, ConfidenceModel, LoadBalancer
//! ```
//!
//! # Modules
//!
//! ## [`registry`] - Systems and Health
//!
//! - [`SystemRegistry`]: metadata, health, resource budgets
//! - [`CircuitBreaker`]: closed / open / half-open per system
//! - [`DependencyGraph`]: startup order and cascade propagation
//!
//! ## [`queue`] - Orchestration Queue
//!
//! Bounded priority queue with retry, displacement and dead letters.
//!
//! ## [`rules`] - Rule / Decision Engine
//!
//! Conditions over a [`Context`](rules::Context), conflict resolution,
//! confidence scoring and the decision log.
//!
//! ## [`engine`] - Orchestrator
//!
//! - [`ConductorEngine`]: the handle everything goes through
//! - [`CycleHandles`]: periodic cycles on tokio intervals
//! - [`EventBus`]: fire-and-forget event fan-out
//!
//! ## [`config`] - Configuration Management
//!
//! - [`ConductorConfig`]: unified configuration type
//! - [`ConfigLoader`]: multi-source config loader
//!
//! Configuration priority: Environment > Project > Global > Default
//!
//! ## [`definitions`] - Declarative Rules and Scenarios
//!
//! TOML files declaring systems, conflict pairs, rules and scenarios.

pub mod balancer;
pub mod clock;
pub mod config;
pub mod definitions;
pub mod dispatch;
pub mod engine;
pub mod insight;
pub mod queue;
pub mod registry;
pub mod rules;
pub mod scenario;
pub mod testing;

// Re-exports for convenience
pub use balancer::{LoadBalancer, LoadChange, LoadStatus};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{
    default_config_dir, default_config_path, BalancerConfig, ConductorConfig, ConfigError,
    ConfigLoader, ConfigResolver, InsightConfig, NoOpResolver, QueueConfig, RegistryConfig,
    RulesConfig,
};
pub use definitions::{DefinitionError, DefinitionSummary, Definitions};
pub use dispatch::{DispatchError, LoggingDispatcher, NullDispatcher, SystemDispatcher};
pub use engine::{
    ConductorEngine, CycleHandles, DrainReport, EngineBuilder, EngineError, EvaluationReport,
    EventBus,
};
pub use insight::{AnomalyDetector, Insight, Prediction, UsagePredictor};
pub use queue::{DeadLetter, DeadLetterReason, OrchestrationQueue, QueueError, QueueItem};
pub use registry::{
    BreakerState, CircuitBreaker, DependencyEdge, DependencyGraph, Heartbeat, RegistryError,
    StartupPlan, SystemInfo, SystemRegistration, SystemRegistry,
};
pub use rules::{Condition, Context, ContextProvider, Decision, PredicateError, Rule, RuleAction};
pub use scenario::{Scenario, ScenarioError, ScenarioReport, StepResult, StepStatus};
