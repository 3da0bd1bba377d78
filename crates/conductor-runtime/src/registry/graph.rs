//! Dependency graph between systems.
//!
//! Edges point from a dependent to its dependency: if `hvac` needs
//! `power`, the graph holds `hvac → power`. Startup order walks edges
//! forward (dependencies first); cascade propagation walks them in
//! reverse (from a failed system to everything that needs it).
//!
//! Cycles are tolerated. A detected cycle is logged and the closing
//! edge is treated as already satisfied, so every traversal
//! terminates and visits each node once.

use serde::{Deserialize, Serialize};
use std::collections::{btree_set, BTreeMap, BTreeSet, HashSet, VecDeque};
use tracing::{debug, warn};

/// Directed `(dependent, dependency)` pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub dependent: String,
    pub dependency: String,
}

impl DependencyEdge {
    #[must_use]
    pub fn new(dependent: impl Into<String>, dependency: impl Into<String>) -> Self {
        Self {
            dependent: dependent.into(),
            dependency: dependency.into(),
        }
    }
}

/// Result of a startup-order traversal.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StartupPlan {
    /// Every node exactly once, dependencies before dependents.
    pub order: Vec<String>,
    /// Edges that closed a cycle and were treated as satisfied.
    pub cycle_edges: Vec<DependencyEdge>,
}

/// Nodes keyed by name, each with the set of names it depends on.
///
/// Ordered maps keep every traversal deterministic.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    nodes: BTreeMap<String, BTreeSet<String>>,
}

impl DependencyGraph {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds or replaces a node and its outgoing edges.
    ///
    /// Dependencies need not be registered yet; unknown names are kept
    /// as edges and skipped during traversal until they appear.
    pub fn insert(&mut self, name: impl Into<String>, dependencies: impl IntoIterator<Item = String>) {
        let name = name.into();
        let deps = dependencies.into_iter().filter(|d| *d != name).collect();
        self.nodes.insert(name, deps);
    }

    /// Removes a node. Edges from other nodes that point at it remain.
    pub fn remove(&mut self, name: &str) -> bool {
        self.nodes.remove(name).is_some()
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Immediate dependencies of `name`.
    #[must_use]
    pub fn dependencies(&self, name: &str) -> Vec<String> {
        self.nodes
            .get(name)
            .map(|deps| deps.iter().cloned().collect())
            .unwrap_or_default()
    }

    /// Immediate reverse edges: systems that list `name` as a dependency.
    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.nodes
            .iter()
            .filter(|(_, deps)| deps.contains(name))
            .map(|(node, _)| node.clone())
            .collect()
    }

    /// Full transitive edge list reachable from `name` through reverse
    /// edges, in breadth-first order.
    ///
    /// Each edge is `(dependent, dependency)` where `dependency` was
    /// reached first. This is the propagation path of a cascade failure
    /// starting at `name`.
    #[must_use]
    pub fn dependency_chain(&self, name: &str) -> Vec<DependencyEdge> {
        let mut edges = Vec::new();
        let mut visited: HashSet<String> = HashSet::from([name.to_string()]);
        let mut frontier = VecDeque::from([name.to_string()]);

        while let Some(current) = frontier.pop_front() {
            for dependent in self.dependents(&current) {
                edges.push(DependencyEdge::new(dependent.clone(), current.clone()));
                if visited.insert(dependent.clone()) {
                    frontier.push_back(dependent);
                }
            }
        }
        edges
    }

    /// Every system that directly or indirectly depends on `name`,
    /// each listed once, nearest first. `name` itself is excluded even
    /// when it sits on a cycle.
    #[must_use]
    pub fn transitive_dependents(&self, name: &str) -> Vec<String> {
        let mut seen = HashSet::new();
        self.dependency_chain(name)
            .into_iter()
            .map(|edge| edge.dependent)
            .filter(|d| d != name && seen.insert(d.clone()))
            .collect()
    }

    /// Every registered system `name` directly or indirectly depends on.
    #[must_use]
    pub fn transitive_dependencies(&self, name: &str) -> BTreeSet<String> {
        let mut found = BTreeSet::new();
        let mut stack = self.dependencies(name);
        while let Some(dep) = stack.pop() {
            if dep == name || !found.insert(dep.clone()) {
                continue;
            }
            stack.extend(self.dependencies(&dep));
        }
        found.retain(|d| self.contains(d));
        found
    }

    /// Topological order, dependencies before dependents.
    #[must_use]
    pub fn startup_order(&self) -> Vec<String> {
        self.startup_plan().order
    }

    /// Topological order plus the cycle edges that were bypassed.
    ///
    /// Depth-first search with a visiting set: reaching a node that is
    /// still on the path means a cycle, which is logged and skipped.
    /// The path lives on an explicit stack, so chain length is bounded
    /// by memory rather than by the thread stack.
    #[must_use]
    pub fn startup_plan(&self) -> StartupPlan {
        let mut plan = StartupPlan::default();
        let mut visited: HashSet<&str> = HashSet::new();
        let mut visiting: HashSet<&str> = HashSet::new();

        for root in self.nodes.keys() {
            if visited.contains(root.as_str()) {
                continue;
            }
            visiting.insert(root);
            let mut path = vec![(root.as_str(), self.dependencies_iter(root))];

            while let Some((name, deps)) = path.last_mut() {
                let name = *name;
                match deps.next() {
                    Some(dep) if !self.nodes.contains_key(dep) => {
                        debug!(system = %name, dependency = %dep, "dependency not registered, skipping");
                    }
                    Some(dep) if visiting.contains(dep.as_str()) => {
                        warn!(
                            system = %name,
                            dependency = %dep,
                            "dependency cycle detected, treating edge as satisfied"
                        );
                        plan.cycle_edges.push(DependencyEdge::new(name, dep.clone()));
                    }
                    Some(dep) if visited.contains(dep.as_str()) => {}
                    Some(dep) => {
                        visiting.insert(dep);
                        path.push((dep.as_str(), self.dependencies_iter(dep)));
                    }
                    None => {
                        path.pop();
                        visiting.remove(name);
                        visited.insert(name);
                        plan.order.push(name.to_string());
                    }
                }
            }
        }
        plan
    }

    fn dependencies_iter(&self, name: &str) -> btree_set::Iter<'_, String> {
        static NONE: BTreeSet<String> = BTreeSet::new();
        self.nodes.get(name).unwrap_or(&NONE).iter()
    }
}
