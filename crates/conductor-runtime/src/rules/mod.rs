//! Rule / decision layer.
//!
//! | Module | Role |
//! |--------|------|
//! | [`Context`] | Snapshot of time, sensors, presence, prices, flags |
//! | [`Condition`] | Side-effect-free predicate tree over a context |
//! | [`Rule`] | Condition + action + priority |
//! | [`RuleEngine`] | Matching and priority-based conflict resolution |
//! | [`ConfidenceModel`] | Scores, feedback history, adaptive threshold |
//! | [`DecisionLog`] | Bounded record of what was executed |

mod condition;
mod confidence;
mod conflict;
mod context;
mod decision;
mod error;
mod evaluator;
mod rule;

pub use condition::{Condition, CustomPredicate};
pub use confidence::{ConfidenceModel, BASE_CONFIDENCE, MAX_THRESHOLD, MIN_THRESHOLD};
pub use conflict::{Conflict, ConflictLog, ConflictPair, ConflictTable, DEFAULT_CONFLICT_PAIRS};
pub use context::{ClockContextProvider, Context, ContextProvider};
pub use decision::{Decision, DecisionLog};
pub use error::PredicateError;
pub use evaluator::{RuleEngine, RuleEvaluation};
pub use rule::{Rule, RuleAction};
