//! System registry, circuit breakers and the dependency graph.
//!
//! ```text
//! ┌──────────────────────── SystemRegistry ────────────────────────┐
//! │                                                                │
//! │  name ─▶ SystemRecord { status, metrics, CircuitBreaker }      │
//! │                                                                │
//! │  DependencyGraph: dependent ─▶ dependency                      │
//! │     startup order  = forward DFS                               │
//! │     cascade        = reverse BFS from the failed system        │
//! └────────────────────────────────────────────────────────────────┘
//! ```

mod breaker;
mod error;
mod graph;
#[allow(clippy::module_inception)]
mod registry;

pub use breaker::{BreakerState, BreakerTransition, CircuitBreaker};
pub use error::RegistryError;
pub use graph::{DependencyEdge, DependencyGraph, StartupPlan};
pub use registry::{Heartbeat, LoadSample, SystemInfo, SystemRegistration, SystemRegistry};
