//! Identifier types.
//!
//! Systems, rules and scenarios are keyed by their human-chosen names.
//! Records produced at runtime (queue items, decisions, conflicts) get
//! random UUID v4 identifiers so they stay unique across restarts and
//! can be correlated in external logs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of an item in the orchestration queue.
///
/// The id survives requeueing and dead-lettering, so a dead-letter
/// entry can be traced back to the enqueue that created it.
///
/// # Example
///
/// ```
/// use conductor_types::QueueItemId;
///
/// let a = QueueItemId::new();
/// let b = QueueItemId::new();
/// assert_ne!(a, b);
/// assert!(a.to_string().starts_with("q:"));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct QueueItemId(pub Uuid);

impl QueueItemId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for QueueItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for QueueItemId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "q:{}", self.0)
    }
}

/// Identifier of an entry in the decision log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DecisionId(pub Uuid);

impl DecisionId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for DecisionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for DecisionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "dec:{}", self.0)
    }
}

/// Identifier of a resolved rule conflict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConflictId(pub Uuid);

impl ConflictId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    #[must_use]
    pub fn uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for ConflictId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ConflictId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "conflict:{}", self.0)
    }
}

// Tests are in lib.rs as integration tests for public API
