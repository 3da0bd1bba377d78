//! System registry: metadata, health and breakers for every system.
//!
//! # Status Rules
//!
//! | Cause | Status |
//! |-------|--------|
//! | registration | `online` |
//! | own breaker opens | `degraded` |
//! | a transitive dependency's breaker opens | `degraded` (cascade) |
//! | no heartbeat within `heartbeat_timeout_ms` | `degraded` (stale) |
//! | collaborator reports itself down | `offline` |
//! | heartbeat while half-open | `online` |
//! | heartbeat with closed breaker and no open dependency | `online` |
//!
//! A system is `degraded` whenever its breaker is open: the only way
//! out of a breaker-induced degradation is the half-open heartbeat.

use super::breaker::{BreakerState, BreakerTransition, CircuitBreaker};
use super::error::RegistryError;
use super::graph::{DependencyEdge, DependencyGraph, StartupPlan};
use crate::config::RegistryConfig;
use crate::engine::EventBus;
use conductor_event::ConductorEvent;
use conductor_types::{Priority, SystemCategory, SystemStatus};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

/// Inbound registration request.
///
/// Fields are kept loose (`category` as a string, `priority` as any
/// integer) because they come from collaborators; [`SystemRegistry`]
/// validates and normalizes them.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SystemRegistration {
    pub name: String,
    pub category: String,
    pub priority: i64,
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
    pub memory_budget_mb: Option<f64>,
}

impl SystemRegistration {
    /// Priority defaults to [`Priority::NORMAL`].
    #[must_use]
    pub fn new(name: impl Into<String>, category: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            category: category.into(),
            priority: i64::from(Priority::NORMAL.get()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn priority(mut self, priority: i64) -> Self {
        self.priority = priority;
        self
    }

    #[must_use]
    pub fn depends_on(mut self, dependency: impl Into<String>) -> Self {
        self.dependencies.push(dependency.into());
        self
    }

    #[must_use]
    pub fn metadata(mut self, key: impl Into<String>, value: Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    #[must_use]
    pub fn memory_budget_mb(mut self, budget: f64) -> Self {
        self.memory_budget_mb = Some(budget);
        self
    }
}

/// Health metrics carried by a heartbeat. Absent fields keep their
/// previous values.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Heartbeat {
    pub response_time_ms: Option<f64>,
    pub memory_usage_mb: Option<f64>,
    pub cpu_usage_percent: Option<f64>,
}

impl Heartbeat {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn response_time_ms(mut self, ms: f64) -> Self {
        self.response_time_ms = Some(ms);
        self
    }

    #[must_use]
    pub fn memory_usage_mb(mut self, mb: f64) -> Self {
        self.memory_usage_mb = Some(mb);
        self
    }

    #[must_use]
    pub fn cpu_usage_percent(mut self, percent: f64) -> Self {
        self.cpu_usage_percent = Some(percent);
        self
    }
}

/// Read-only snapshot of one system.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SystemInfo {
    pub name: String,
    pub category: SystemCategory,
    pub status: SystemStatus,
    pub priority: Priority,
    pub dependencies: Vec<String>,
    pub metadata: BTreeMap<String, Value>,
    pub registered_at_ms: u64,
    pub last_heartbeat_ms: u64,
    pub error_count: u64,
    pub last_error: Option<String>,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_budget_mb: f64,
    pub response_time_ms: Option<f64>,
    pub uptime_percent: f64,
    pub breaker: BreakerState,
    pub failure_count: u32,
}

/// Inputs for one load-balancing pass.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadSample {
    pub name: String,
    pub priority: Priority,
    pub cpu_percent: f64,
    pub memory_mb: f64,
    pub memory_budget_mb: f64,
}

#[derive(Debug, Clone)]
struct SystemRecord {
    category: SystemCategory,
    priority: Priority,
    dependencies: Vec<String>,
    metadata: BTreeMap<String, Value>,
    memory_budget_mb: f64,
    status: SystemStatus,
    registered_at_ms: u64,
    last_heartbeat_ms: u64,
    error_count: u64,
    last_error: Option<String>,
    cpu_percent: f64,
    memory_mb: f64,
    response_time_ms: Option<f64>,
    sweeps: u64,
    online_sweeps: u64,
    breaker: CircuitBreaker,
}

impl SystemRecord {
    fn uptime_percent(&self) -> f64 {
        if self.sweeps == 0 {
            return 100.0;
        }
        self.online_sweeps as f64 / self.sweeps as f64 * 100.0
    }

    fn snapshot(&self, name: &str) -> SystemInfo {
        SystemInfo {
            name: name.to_string(),
            category: self.category,
            status: self.status,
            priority: self.priority,
            dependencies: self.dependencies.clone(),
            metadata: self.metadata.clone(),
            registered_at_ms: self.registered_at_ms,
            last_heartbeat_ms: self.last_heartbeat_ms,
            error_count: self.error_count,
            last_error: self.last_error.clone(),
            cpu_percent: self.cpu_percent,
            memory_mb: self.memory_mb,
            memory_budget_mb: self.memory_budget_mb,
            response_time_ms: self.response_time_ms,
            uptime_percent: self.uptime_percent(),
            breaker: self.breaker.state(),
            failure_count: self.breaker.failure_count(),
        }
    }
}

/// Owns every registered system, its breaker, and the dependency graph.
///
/// All methods take the current time explicitly; the registry never
/// reads a clock itself.
#[derive(Debug)]
pub struct SystemRegistry {
    systems: BTreeMap<String, SystemRecord>,
    graph: DependencyGraph,
    config: RegistryConfig,
    bus: EventBus,
}

impl SystemRegistry {
    #[must_use]
    pub fn new(config: RegistryConfig, bus: EventBus) -> Self {
        Self {
            systems: BTreeMap::new(),
            graph: DependencyGraph::new(),
            config,
            bus,
        }
    }

    /// Validates and registers a system.
    ///
    /// The priority is clamped to 1–10. Registering a name again updates
    /// its configuration but keeps its breaker, status and counters.
    pub fn try_register(
        &mut self,
        registration: SystemRegistration,
        now_ms: u64,
    ) -> Result<(), RegistryError> {
        let name = registration.name.trim().to_string();
        if name.is_empty() {
            return Err(RegistryError::MissingName);
        }
        let category: SystemCategory = registration
            .category
            .parse()
            .map_err(|_| RegistryError::InvalidCategory(registration.category.clone()))?;
        let priority = Priority::new(registration.priority);
        let budget = registration
            .memory_budget_mb
            .filter(|b| *b > 0.0)
            .unwrap_or(self.config.default_memory_budget_mb);

        self.graph
            .insert(name.clone(), registration.dependencies.iter().cloned());

        match self.systems.get_mut(&name) {
            Some(existing) => {
                existing.category = category;
                existing.priority = priority;
                existing.dependencies = registration.dependencies;
                existing.metadata = registration.metadata;
                existing.memory_budget_mb = budget;
                debug!(system = %name, "system re-registered");
            }
            None => {
                self.systems.insert(
                    name.clone(),
                    SystemRecord {
                        category,
                        priority,
                        dependencies: registration.dependencies,
                        metadata: registration.metadata,
                        memory_budget_mb: budget,
                        status: SystemStatus::Online,
                        registered_at_ms: now_ms,
                        last_heartbeat_ms: now_ms,
                        error_count: 0,
                        last_error: None,
                        cpu_percent: 0.0,
                        memory_mb: 0.0,
                        response_time_ms: None,
                        sweeps: 0,
                        online_sweeps: 0,
                        breaker: CircuitBreaker::new(
                            self.config.max_failures,
                            self.config.half_open_timeout_ms,
                        ),
                    },
                );
                info!(system = %name, %category, priority = priority.get(), "system registered");
            }
        }

        self.bus.publish(ConductorEvent::SystemRegistered {
            system: name,
            category,
            priority,
        });
        Ok(())
    }

    /// Registers a system, logging and returning `false` on invalid input.
    pub fn register(&mut self, registration: SystemRegistration, now_ms: u64) -> bool {
        let name = registration.name.clone();
        match self.try_register(registration, now_ms) {
            Ok(()) => true,
            Err(e) => {
                warn!(system = %name, error = %e, "registration rejected");
                false
            }
        }
    }

    /// Removes a system, its breaker and its graph node.
    pub fn unregister(&mut self, name: &str) -> bool {
        if self.systems.remove(name).is_none() {
            return false;
        }
        self.graph.remove(name);
        info!(system = %name, "system unregistered");
        self.bus.publish(ConductorEvent::SystemUnregistered {
            system: name.to_string(),
        });
        true
    }

    /// Applies a heartbeat. Returns `false` for unknown systems.
    pub fn heartbeat(&mut self, name: &str, heartbeat: Heartbeat, now_ms: u64) -> bool {
        let blocked = self.has_open_dependency(name);
        let Some(rec) = self.systems.get_mut(name) else {
            debug!(system = %name, "heartbeat from unknown system");
            return false;
        };

        rec.last_heartbeat_ms = now_ms;
        if let Some(ms) = heartbeat.response_time_ms {
            rec.response_time_ms = Some(ms);
        }
        if let Some(mb) = heartbeat.memory_usage_mb {
            rec.memory_mb = mb;
        }
        if let Some(cpu) = heartbeat.cpu_usage_percent {
            rec.cpu_percent = cpu;
        }

        // A system whose dependency is still open stays degraded.
        let healthy = if blocked {
            SystemStatus::Degraded
        } else {
            SystemStatus::Online
        };

        if rec.breaker.record_success() == Some(BreakerTransition::Closed) {
            rec.status = healthy;
            info!(system = %name, status = %healthy, "circuit recovered");
            self.bus.publish(ConductorEvent::CircuitRecovered {
                system: name.to_string(),
            });
            return true;
        }

        match rec.status {
            SystemStatus::Offline => {
                rec.status = if rec.breaker.state() == BreakerState::Closed {
                    healthy
                } else {
                    SystemStatus::Degraded
                };
                info!(system = %name, status = %rec.status, "system back from offline");
            }
            SystemStatus::Degraded if rec.breaker.state() == BreakerState::Closed && !blocked => {
                rec.status = SystemStatus::Online;
                info!(system = %name, "system recovered");
            }
            _ => {}
        }
        true
    }

    /// Records an error reported by (or synthesized for) a system.
    ///
    /// When this opens the breaker, the system turns `degraded` and so
    /// does every registered transitive dependent, announced in a single
    /// `CascadeFailure` event.
    pub fn report_error(&mut self, name: &str, error: &str, now_ms: u64) -> Result<(), RegistryError> {
        let rec = self
            .systems
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownSystem(name.to_string()))?;

        rec.error_count += 1;
        rec.last_error = Some(error.to_string());
        debug!(system = %name, %error, failures = rec.breaker.failure_count() + 1, "system error");

        if rec.breaker.record_failure(now_ms) == Some(BreakerTransition::Opened) {
            rec.status = SystemStatus::Degraded;
            let failures = rec.breaker.failure_count();
            warn!(system = %name, failures, "circuit opened");
            self.bus.publish(ConductorEvent::CircuitOpened {
                system: name.to_string(),
                failures,
            });
            self.cascade(name);
        }
        Ok(())
    }

    /// Counts a successful dispatch as a breaker success.
    ///
    /// A half-open breaker closes here; the system's status is restored
    /// by its next heartbeat.
    pub fn record_success(&mut self, name: &str) {
        let Some(rec) = self.systems.get_mut(name) else {
            return;
        };
        if rec.breaker.record_success() == Some(BreakerTransition::Closed) {
            info!(system = %name, "circuit recovered after dispatch");
            self.bus.publish(ConductorEvent::CircuitRecovered {
                system: name.to_string(),
            });
        }
    }

    /// Marks a system offline at the collaborator's request.
    pub fn mark_offline(&mut self, name: &str) -> Result<(), RegistryError> {
        let rec = self
            .systems
            .get_mut(name)
            .ok_or_else(|| RegistryError::UnknownSystem(name.to_string()))?;
        if rec.breaker.is_open() {
            return Err(RegistryError::CircuitOpen(name.to_string()));
        }
        if rec.status != SystemStatus::Offline {
            rec.status = SystemStatus::Offline;
            info!(system = %name, "system offline");
            self.bus.publish(ConductorEvent::SystemOffline {
                system: name.to_string(),
            });
        }
        Ok(())
    }

    /// Breaker tick: moves open breakers whose timeout elapsed to
    /// half-open. Returns the affected names.
    pub fn check_breakers(&mut self, now_ms: u64) -> Vec<String> {
        let mut half_opened = Vec::new();
        for (name, rec) in &mut self.systems {
            if rec.breaker.check(now_ms) == Some(BreakerTransition::HalfOpened) {
                info!(system = %name, "circuit half-open");
                half_opened.push(name.clone());
            }
        }
        for name in &half_opened {
            self.bus.publish(ConductorEvent::CircuitHalfOpen {
                system: name.clone(),
            });
        }
        half_opened
    }

    /// Heartbeat sweep: degrades systems whose last heartbeat is older
    /// than the timeout and synthesizes an error report for each.
    /// Offline systems are not swept. Returns the stale names.
    pub fn sweep(&mut self, now_ms: u64) -> Vec<String> {
        let timeout = self.config.heartbeat_timeout_ms;
        let mut stale = Vec::new();

        for (name, rec) in &mut self.systems {
            if rec.status == SystemStatus::Offline {
                continue;
            }
            if now_ms.saturating_sub(rec.last_heartbeat_ms) > timeout {
                if rec.status == SystemStatus::Online {
                    rec.status = SystemStatus::Degraded;
                    warn!(system = %name, last_heartbeat_ms = rec.last_heartbeat_ms, "heartbeat timeout");
                    self.bus.publish(ConductorEvent::SystemStale {
                        system: name.clone(),
                        last_heartbeat_ms: rec.last_heartbeat_ms,
                    });
                }
                stale.push(name.clone());
            }
        }

        for name in &stale {
            // Names come from the map; cannot be unknown.
            let _ = self.report_error(name, "heartbeat timeout", now_ms);
        }

        for rec in self.systems.values_mut() {
            if rec.status == SystemStatus::Offline {
                continue;
            }
            rec.sweeps += 1;
            if rec.status == SystemStatus::Online {
                rec.online_sweeps += 1;
            }
        }
        stale
    }

    /// Re-applies cascade degradation for every open breaker. Catches
    /// dependents that registered or recovered after the original
    /// cascade. Returns how many systems were newly degraded.
    pub fn check_cascades(&mut self) -> usize {
        let open: Vec<String> = self
            .systems
            .iter()
            .filter(|(_, rec)| rec.breaker.is_open())
            .map(|(name, _)| name.clone())
            .collect();

        let mut degraded = 0;
        for source in open {
            let affected: Vec<String> = self
                .graph
                .transitive_dependents(&source)
                .into_iter()
                .filter(|dep| {
                    self.systems
                        .get(dep)
                        .is_some_and(|rec| rec.status == SystemStatus::Online)
                })
                .collect();
            if affected.is_empty() {
                continue;
            }
            for dep in &affected {
                if let Some(rec) = self.systems.get_mut(dep) {
                    rec.status = SystemStatus::Degraded;
                }
            }
            degraded += affected.len();
            warn!(system = %source, affected = ?affected, "cascade re-applied");
            self.bus
                .publish(ConductorEvent::CascadeFailure { source, affected });
        }
        degraded
    }

    fn cascade(&mut self, source: &str) {
        let affected: Vec<String> = self
            .graph
            .transitive_dependents(source)
            .into_iter()
            .filter(|dep| {
                self.systems
                    .get(dep)
                    .is_some_and(|rec| rec.status != SystemStatus::Offline)
            })
            .collect();
        if affected.is_empty() {
            return;
        }
        for dep in &affected {
            if let Some(rec) = self.systems.get_mut(dep) {
                rec.status = SystemStatus::Degraded;
            }
        }
        warn!(system = %source, affected = ?affected, "cascade failure");
        self.bus.publish(ConductorEvent::CascadeFailure {
            source: source.to_string(),
            affected,
        });
    }

    fn has_open_dependency(&self, name: &str) -> bool {
        self.graph
            .transitive_dependencies(name)
            .iter()
            .any(|dep| self.systems.get(dep).is_some_and(|rec| rec.breaker.is_open()))
    }

    // === Queries ===

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.systems.contains_key(name)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.systems.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.systems.is_empty()
    }

    #[must_use]
    pub fn get(&self, name: &str) -> Option<SystemInfo> {
        self.systems.get(name).map(|rec| rec.snapshot(name))
    }

    /// All systems, sorted by name.
    #[must_use]
    pub fn list(&self) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .map(|(name, rec)| rec.snapshot(name))
            .collect()
    }

    #[must_use]
    pub fn by_category(&self, category: SystemCategory) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .filter(|(_, rec)| rec.category == category)
            .map(|(name, rec)| rec.snapshot(name))
            .collect()
    }

    #[must_use]
    pub fn by_status(&self, status: SystemStatus) -> Vec<SystemInfo> {
        self.systems
            .iter()
            .filter(|(_, rec)| rec.status == status)
            .map(|(name, rec)| rec.snapshot(name))
            .collect()
    }

    #[must_use]
    pub fn status(&self, name: &str) -> Option<SystemStatus> {
        self.systems.get(name).map(|rec| rec.status)
    }

    #[must_use]
    pub fn priority(&self, name: &str) -> Option<Priority> {
        self.systems.get(name).map(|rec| rec.priority)
    }

    #[must_use]
    pub fn breaker_state(&self, name: &str) -> Option<BreakerState> {
        self.systems.get(name).map(|rec| rec.breaker.state())
    }

    /// `true` when the system is registered and its breaker is not open.
    #[must_use]
    pub fn allows_dispatch(&self, name: &str) -> bool {
        self.systems
            .get(name)
            .is_some_and(|rec| !rec.breaker.is_open())
    }

    #[must_use]
    pub fn load_samples(&self) -> Vec<LoadSample> {
        self.systems
            .iter()
            .map(|(name, rec)| LoadSample {
                name: name.clone(),
                priority: rec.priority,
                cpu_percent: rec.cpu_percent,
                memory_mb: rec.memory_mb,
                memory_budget_mb: rec.memory_budget_mb,
            })
            .collect()
    }

    #[must_use]
    pub fn startup_plan(&self) -> StartupPlan {
        self.graph.startup_plan()
    }

    #[must_use]
    pub fn dependents(&self, name: &str) -> Vec<String> {
        self.graph.dependents(name)
    }

    #[must_use]
    pub fn dependency_chain(&self, name: &str) -> Vec<DependencyEdge> {
        self.graph.dependency_chain(name)
    }
}
