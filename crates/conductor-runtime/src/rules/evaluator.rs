//! Rule matching and conflict resolution.
//!
//! # Evaluation
//!
//! ```text
//! rules ──▶ condition(ctx) ──▶ matches ──▶ sort ──▶ pairwise scan ──▶ survivors
//!              │ error                      │          │
//!              ▼                            │          ▼
//!          non-match (warn)   priority desc,     lower-ranked rule of a
//!                             declaration asc    conflicting pair removed
//! ```
//!
//! The pairwise scan walks matches in rank order. A rule already
//! removed cannot remove others, so the outcome depends only on the
//! ranking, and the ranking depends only on priority and declaration
//! order. The same context therefore always yields the same survivors.

use super::conflict::{Conflict, ConflictLog, ConflictTable};
use super::{Context, Rule};
use conductor_types::ConflictId;
use tracing::{debug, info, warn};

/// Result of one evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct RuleEvaluation {
    /// Rules whose condition held, before conflict resolution.
    pub matched: usize,
    /// Matches left after conflict resolution, in rank order.
    pub survivors: Vec<Rule>,
    /// Conflicts resolved in this pass.
    pub conflicts: Vec<Conflict>,
}

/// Holds the loaded rules and the conflict table.
#[derive(Debug, Clone)]
pub struct RuleEngine {
    rules: Vec<Rule>,
    table: ConflictTable,
    log: ConflictLog,
}

impl RuleEngine {
    #[must_use]
    pub fn new(table: ConflictTable, conflict_log_capacity: usize) -> Self {
        Self {
            rules: Vec::new(),
            table,
            log: ConflictLog::new(conflict_log_capacity),
        }
    }

    /// Appends a rule. Declaration order is insertion order; a rule with
    /// an id already present replaces it in place.
    pub fn add_rule(&mut self, rule: Rule) {
        match self.rules.iter_mut().find(|r| r.id == rule.id) {
            Some(existing) => {
                warn!(rule = %rule.id, "replacing rule with duplicate id");
                *existing = rule;
            }
            None => self.rules.push(rule),
        }
    }

    pub fn add_conflict_pair(&mut self, a: impl Into<String>, b: impl Into<String>) {
        self.table.add(a, b);
    }

    #[must_use]
    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    #[must_use]
    pub fn rule(&self, id: &str) -> Option<&Rule> {
        self.rules.iter().find(|r| r.id == id)
    }

    /// Retained conflicts, oldest first.
    #[must_use]
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.log.entries()
    }

    /// Matches every rule against `ctx` and resolves conflicts.
    pub fn evaluate(&mut self, ctx: &Context, now_ms: u64) -> RuleEvaluation {
        let mut matches: Vec<(usize, &Rule)> = self
            .rules
            .iter()
            .enumerate()
            .filter(|(_, rule)| match rule.condition.evaluate(ctx) {
                Ok(hit) => hit,
                Err(e) => {
                    warn!(rule = %rule.id, error = %e, "rule predicate failed, treating as non-match");
                    false
                }
            })
            .collect();
        matches.sort_by(|(ia, a), (ib, b)| b.priority.cmp(&a.priority).then(ia.cmp(ib)));

        let matched = matches.len();
        let mut removed = vec![false; matched];
        let mut conflicts = Vec::new();

        for i in 0..matched {
            if removed[i] {
                continue;
            }
            let winner = matches[i].1;
            for j in (i + 1)..matched {
                if removed[j] {
                    continue;
                }
                let loser = matches[j].1;
                let Some(kind) = self
                    .table
                    .conflict_type(winner.action.conflict_key(), loser.action.conflict_key())
                else {
                    continue;
                };
                removed[j] = true;
                info!(
                    winner = %winner.id,
                    loser = %loser.id,
                    conflict = %kind,
                    "rule conflict resolved"
                );
                conflicts.push(Conflict {
                    id: ConflictId::new(),
                    rule_a: winner.id.clone(),
                    rule_b: loser.id.clone(),
                    conflict_type: kind.to_string(),
                    winner: winner.id.clone(),
                    loser: loser.id.clone(),
                    timestamp_ms: now_ms,
                });
            }
        }

        let survivors: Vec<Rule> = matches
            .iter()
            .zip(&removed)
            .filter(|(_, gone)| !**gone)
            .map(|((_, rule), _)| (*rule).clone())
            .collect();

        for conflict in &conflicts {
            self.log.push(conflict.clone());
        }
        debug!(matched, survivors = survivors.len(), "rules evaluated");

        RuleEvaluation {
            matched,
            survivors,
            conflicts,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::{Condition, PredicateError, RuleAction};

    fn engine(rules: Vec<Rule>) -> RuleEngine {
        let mut engine = RuleEngine::new(ConflictTable::with_defaults(), 100);
        for rule in rules {
            engine.add_rule(rule);
        }
        engine
    }

    fn dispatch(id: &str, priority: i64, target: &str, action: &str) -> Rule {
        Rule::new(id, priority, Condition::Always, RuleAction::dispatch(target, action))
    }

    fn ids(rules: &[Rule]) -> Vec<&str> {
        rules.iter().map(|r| r.id.as_str()).collect()
    }

    #[test]
    fn higher_priority_wins_conflict() {
        let mut e = engine(vec![
            dispatch("cool", 5, "cooler", "activate-cooling"),
            dispatch("heat", 9, "hvac", "activate-heating"),
        ]);
        let out = e.evaluate(&Context::default(), 42);
        assert_eq!(out.matched, 2);
        assert_eq!(ids(&out.survivors), vec!["heat"]);
        assert_eq!(out.conflicts.len(), 1);
        let c = &out.conflicts[0];
        assert_eq!((c.winner.as_str(), c.loser.as_str()), ("heat", "cool"));
        assert_eq!(c.conflict_type, "activate-cooling/activate-heating");
        assert_eq!(c.timestamp_ms, 42);
        assert_eq!(e.conflicts().len(), 1);
    }

    #[test]
    fn equal_priority_resolved_by_declaration_order() {
        let rules = vec![
            dispatch("first", 6, "lamp", "lights-off"),
            dispatch("second", 6, "lamp", "lights-on"),
        ];
        for _ in 0..3 {
            let mut e = engine(rules.clone());
            let out = e.evaluate(&Context::default(), 0);
            assert_eq!(ids(&out.survivors), vec!["first"]);
        }
    }

    #[test]
    fn removed_rule_does_not_remove_others() {
        // lights-on beats lights-off; lights-off would have beaten the
        // second lights-on but is already gone.
        let mut e = engine(vec![
            dispatch("on-a", 9, "lamp", "lights-on"),
            dispatch("off", 7, "lamp", "lights-off"),
            dispatch("on-b", 5, "porch", "lights-on"),
        ]);
        let out = e.evaluate(&Context::default(), 0);
        assert_eq!(ids(&out.survivors), vec!["on-a", "on-b"]);
        assert_eq!(out.conflicts.len(), 1);
    }

    #[test]
    fn survivors_sorted_by_priority() {
        let mut e = engine(vec![
            dispatch("low", 2, "a", "x"),
            dispatch("high", 8, "b", "y"),
            dispatch("mid", 5, "c", "z"),
        ]);
        let out = e.evaluate(&Context::default(), 0);
        assert_eq!(ids(&out.survivors), vec!["high", "mid", "low"]);
        assert!(out.conflicts.is_empty());
    }

    #[test]
    fn predicate_error_is_non_match() {
        let mut e = engine(vec![
            Rule::new(
                "broken",
                10,
                Condition::custom("boom", |_: &Context| Err(PredicateError::Failed("boom".into()))),
                RuleAction::dispatch("hvac", "activate-heating"),
            ),
            Rule::new(
                "needs-sensor",
                10,
                Condition::SensorAbove { sensor: "co2".into(), value: 800.0 },
                RuleAction::dispatch("vent", "open"),
            ),
            dispatch("ok", 1, "hvac", "activate-cooling"),
        ]);
        let out = e.evaluate(&Context::default(), 0);
        assert_eq!(out.matched, 1);
        assert_eq!(ids(&out.survivors), vec!["ok"]);
    }

    #[test]
    fn custom_pairs_extend_table() {
        let mut e = engine(vec![
            dispatch("air", 4, "windows", "open-windows"),
            dispatch("heat", 8, "hvac", "activate-heating"),
        ]);
        e.add_conflict_pair("open-windows", "activate-heating");
        let out = e.evaluate(&Context::default(), 0);
        assert_eq!(ids(&out.survivors), vec!["heat"]);
    }

    #[test]
    fn duplicate_id_replaces_in_place() {
        let mut e = engine(vec![dispatch("r", 2, "a", "x"), dispatch("s", 2, "b", "y")]);
        e.add_rule(dispatch("r", 9, "a", "z"));
        assert_eq!(e.rules().len(), 2);
        assert_eq!(e.rule("r").unwrap().priority.get(), 9);
        assert_eq!(e.rules()[0].id, "r");
    }
}
