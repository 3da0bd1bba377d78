//! Orchestration queue: bounded priority queue with retry and
//! dead-lettering.
//!
//! ```text
//!  enqueue ─▶ [p9 p9 p7 p5 p5 p3] ─▶ drain (head first)
//!                 ▲                      │
//!                 │ requeue (failure,    │ max attempts
//!                 │ attempts < max)      ▼
//!                 └──────────────── dead letters (bounded)
//! ```

mod error;
#[allow(clippy::module_inception)]
mod queue;

pub use error::QueueError;
pub use queue::{DeadLetter, DeadLetterReason, EnqueueOutcome, OrchestrationQueue, QueueItem};
