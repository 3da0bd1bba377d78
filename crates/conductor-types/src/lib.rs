//! Conductor Types - shared vocabulary for the orchestration core.
//!
//! Types here are used by every other conductor crate and by external
//! collaborators that register systems or consume events.
//!
//! # Overview
//!
//! - [`ErrorCode`]: stable, machine-readable error classification
//! - [`Priority`]: clamped `1..=10` priority
//! - [`SystemCategory`] / [`SystemStatus`]: registry classification
//! - [`QueueItemId`], [`DecisionId`], [`ConflictId`]: runtime record ids

mod error;
mod id;
mod priority;
mod system;

pub use error::{assert_error_code, assert_error_codes, ErrorCode};
pub use id::{ConflictId, DecisionId, QueueItemId};
pub use priority::Priority;
pub use system::{SystemCategory, SystemStatus, UnknownCategory};
