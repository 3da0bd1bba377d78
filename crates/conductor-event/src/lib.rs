//! Conductor Event - what the orchestration core sends outward.
//!
//! # Outbound Flow
//!
//! ```text
//! ┌──────────────────────┐  ActionRequest   ┌──────────────────┐
//! │  conductor-runtime   │ ───────────────▶ │ collaborator     │
//! │  (queue / scenario)  │                  │ system (hvac, …) │
//! └──────────────────────┘                  └──────────────────┘
//!            │
//!            │ ConductorEvent (fire-and-forget)
//!            ▼
//! ┌──────────────────────┐
//! │ observers: dashboards│
//! │ alerting, persistence│
//! └──────────────────────┘
//! ```
//!
//! - [`ActionRequest`]: per-system `(target, actionType, params)` dispatch
//! - [`ConductorEvent`]: lifecycle and telemetry events
//! - [`EventCategory`]: coarse filter over events
//! - [`DecisionOutcome`]: success / partial / failure

mod action;
mod category;
mod event;

pub use action::ActionRequest;
pub use category::EventCategory;
pub use event::{ConductorEvent, DecisionOutcome};
