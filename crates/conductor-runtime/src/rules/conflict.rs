//! Conflict table and conflict records.
//!
//! Two matched rules conflict when their action keys form a pair in the
//! table, in either order. The conflict type is the pair as declared,
//! e.g. `activate-cooling/activate-heating`.

use conductor_types::ConflictId;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Mutually exclusive action pairs known out of the box.
pub const DEFAULT_CONFLICT_PAIRS: &[(&str, &str)] = &[
    ("activate-cooling", "activate-heating"),
    ("lights-on", "lights-off"),
    ("lock-doors", "unlock-doors"),
    ("arm-security", "disarm-security"),
    ("open-blinds", "close-blinds"),
];

/// One declared pair, as written in a definitions file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConflictPair {
    pub a: String,
    pub b: String,
}

impl ConflictPair {
    #[must_use]
    pub fn new(a: impl Into<String>, b: impl Into<String>) -> Self {
        Self {
            a: a.into(),
            b: b.into(),
        }
    }
}

/// Symmetric lookup of conflicting action keys.
#[derive(Debug, Clone, Default)]
pub struct ConflictTable {
    pairs: BTreeMap<(String, String), String>,
}

impl ConflictTable {
    /// Empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Table holding [`DEFAULT_CONFLICT_PAIRS`].
    #[must_use]
    pub fn with_defaults() -> Self {
        let mut table = Self::new();
        for (a, b) in DEFAULT_CONFLICT_PAIRS {
            table.add(*a, *b);
        }
        table
    }

    /// Adds a pair. Re-adding a pair in either order keeps the first name.
    pub fn add(&mut self, a: impl Into<String>, b: impl Into<String>) {
        let (a, b) = (a.into(), b.into());
        if a == b {
            return;
        }
        let name = format!("{a}/{b}");
        self.pairs
            .entry((a.clone(), b.clone()))
            .or_insert_with(|| name.clone());
        self.pairs.entry((b, a)).or_insert(name);
    }

    /// Conflict type for two action keys, if they conflict.
    #[must_use]
    pub fn conflict_type(&self, a: &str, b: &str) -> Option<&str> {
        self.pairs
            .get(&(a.to_string(), b.to_string()))
            .map(String::as_str)
    }

    /// Number of distinct pairs.
    #[must_use]
    pub fn len(&self) -> usize {
        self.pairs.len() / 2
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }
}

/// A resolved conflict.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conflict {
    pub id: ConflictId,
    pub rule_a: String,
    pub rule_b: String,
    pub conflict_type: String,
    pub winner: String,
    pub loser: String,
    pub timestamp_ms: u64,
}

/// Bounded history of conflicts, oldest evicted.
#[derive(Debug, Clone)]
pub struct ConflictLog {
    entries: VecDeque<Conflict>,
    capacity: usize,
}

impl ConflictLog {
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: VecDeque::new(),
            capacity,
        }
    }

    pub fn push(&mut self, conflict: Conflict) {
        if self.capacity == 0 {
            return;
        }
        while self.entries.len() >= self.capacity {
            self.entries.pop_front();
        }
        self.entries.push_back(conflict);
    }

    /// All retained conflicts, oldest first.
    #[must_use]
    pub fn entries(&self) -> Vec<Conflict> {
        self.entries.iter().cloned().collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lookup_is_symmetric() {
        let table = ConflictTable::with_defaults();
        assert_eq!(
            table.conflict_type("activate-heating", "activate-cooling"),
            Some("activate-cooling/activate-heating")
        );
        assert_eq!(
            table.conflict_type("activate-cooling", "activate-heating"),
            Some("activate-cooling/activate-heating")
        );
        assert_eq!(table.conflict_type("lights-on", "lock-doors"), None);
        assert_eq!(table.len(), DEFAULT_CONFLICT_PAIRS.len());
    }

    #[test]
    fn custom_pairs_and_duplicates() {
        let mut table = ConflictTable::new();
        table.add("open-windows", "activate-heating");
        table.add("activate-heating", "open-windows");
        table.add("same", "same");
        assert_eq!(table.len(), 1);
        assert_eq!(
            table.conflict_type("activate-heating", "open-windows"),
            Some("open-windows/activate-heating")
        );
    }

    #[test]
    fn log_is_bounded() {
        let mut log = ConflictLog::new(2);
        for i in 0..3 {
            log.push(Conflict {
                id: ConflictId::new(),
                rule_a: format!("a{i}"),
                rule_b: "b".into(),
                conflict_type: "t".into(),
                winner: format!("a{i}"),
                loser: "b".into(),
                timestamp_ms: i,
            });
        }
        let kept: Vec<_> = log.entries().into_iter().map(|c| c.timestamp_ms).collect();
        assert_eq!(kept, vec![1, 2]);
    }
}
