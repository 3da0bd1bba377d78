//! ConductorEngine - the orchestrator handle.
//!
//! The [`ConductorEngine`] owns every piece of mutable orchestration
//! state and is the only way to reach it:
//!
//! - System registry (health, breakers, dependency graph)
//! - Orchestration queue and dead letters
//! - Rule engine, confidence model and decision log
//! - Scenario catalog
//! - Load balancer and insight heuristics
//!
//! # Locking
//!
//! All state sits behind one mutex. Every method takes the lock for a
//! short, synchronous section and releases it before any dispatch is
//! awaited, so a slow collaborator never blocks heartbeats, sweeps or
//! queries.
//!
//! ```text
//!  lock ─ read/mutate ─ unlock ─ dispatch(timeout).await ─ lock ─ record ─ unlock
//! ```
//!
//! # Cycles
//!
//! Each periodic cycle is a public method that reads the time from the
//! engine's [`Clock`]. [`ConductorEngine::spawn_cycles`] drives them on
//! tokio intervals; tests call them directly with a
//! [`ManualClock`](crate::ManualClock).

use super::eventbus::EventBus;
use crate::balancer::{LoadBalancer, LoadChange, LoadStatus};
use crate::clock::{hour_of_day, Clock, SystemClock};
use crate::config::ConductorConfig;
use crate::definitions::Definitions;
use crate::dispatch::{DispatchError, NullDispatcher, SystemDispatcher};
use crate::insight::{AnomalyDetector, Insight, Prediction, UsagePredictor};
use crate::queue::{DeadLetter, DeadLetterReason, EnqueueOutcome, OrchestrationQueue, QueueError, QueueItem};
use crate::registry::{
    BreakerState, Heartbeat, RegistryError, StartupPlan, SystemInfo, SystemRegistration,
    SystemRegistry,
};
use crate::rules::{
    ConfidenceModel, Conflict, ConflictPair, ConflictTable, Context, Decision, DecisionLog, Rule,
    RuleAction, RuleEngine,
};
use crate::scenario::{
    Scenario, ScenarioCatalog, ScenarioError, ScenarioReport, StepResult, StepStatus,
    SKIP_CIRCUIT_OPEN, SKIP_UNKNOWN_SYSTEM,
};
use conductor_event::{ActionRequest, ConductorEvent, DecisionOutcome};
use conductor_types::{DecisionId, Priority, QueueItemId, SystemCategory, SystemStatus};
use parking_lot::Mutex;
use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Confidence recorded for scenarios run on explicit request.
const MANUAL_CONFIDENCE: f64 = 1.0;

/// Feedback weight for outcomes the engine observes itself.
const OBSERVED_WEIGHT: f64 = 1.0;

/// Mutable orchestration state. Only touched under the engine lock.
struct EngineState {
    registry: SystemRegistry,
    queue: OrchestrationQueue,
    rules: RuleEngine,
    scenarios: ScenarioCatalog,
    confidence: ConfidenceModel,
    decisions: DecisionLog,
    balancer: LoadBalancer,
    anomalies: AnomalyDetector,
    usage: UsagePredictor,
}

struct EngineInner {
    state: Mutex<EngineState>,
    dispatcher: Arc<dyn SystemDispatcher>,
    clock: Arc<dyn Clock>,
    bus: EventBus,
    config: ConductorConfig,
    draining: AtomicBool,
}

/// Result of one rule-evaluation pass.
#[derive(Debug, Clone, Default)]
pub struct EvaluationReport {
    /// Rules whose condition held.
    pub matched: usize,
    /// Conflicts resolved in this pass.
    pub conflicts: Vec<Conflict>,
    /// One decision per rule that acted.
    pub decisions: Vec<Decision>,
    /// Rules that matched but scored below the threshold.
    pub confirmation_required: Vec<String>,
}

/// Result of one queue drain.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DrainReport {
    pub dispatched: usize,
    pub failed: usize,
    pub dead_lettered: usize,
    /// Items left in place because their target's breaker is open.
    pub held: usize,
}

/// Clears the drain flag when the drain ends, however it ends.
struct DrainGuard<'a>(&'a AtomicBool);

impl Drop for DrainGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Cheap-to-clone handle to the orchestration core.
///
/// # Example
///
/// ```
/// use conductor_runtime::{ConductorEngine, SystemRegistration};
///
/// let engine = ConductorEngine::builder().build();
/// assert!(engine.register_system(SystemRegistration::new("hvac", "climate").priority(9)));
/// assert!(!engine.register_system(SystemRegistration::new("toaster", "kitchen")));
/// assert_eq!(engine.systems().len(), 1);
/// ```
#[derive(Clone)]
pub struct ConductorEngine {
    inner: Arc<EngineInner>,
}

impl std::fmt::Debug for ConductorEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConductorEngine")
            .field("queue_depth", &self.queue_depth())
            .field("draining", &self.inner.draining.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl ConductorEngine {
    #[must_use]
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    #[must_use]
    pub fn config(&self) -> &ConductorConfig {
        &self.inner.config
    }

    #[must_use]
    pub fn now_ms(&self) -> u64 {
        self.inner.clock.now_ms()
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ConductorEvent> {
        self.inner.bus.subscribe()
    }

    #[must_use]
    pub fn event_bus(&self) -> &EventBus {
        &self.inner.bus
    }

    // === Inbound: collaborator systems ===

    /// Registers a system. Invalid input is logged and yields `false`.
    pub fn register_system(&self, registration: SystemRegistration) -> bool {
        let now = self.now_ms();
        self.inner.state.lock().registry.register(registration, now)
    }

    /// Registers a system, returning the typed error on invalid input.
    ///
    /// # Errors
    ///
    /// [`RegistryError::MissingName`] or [`RegistryError::InvalidCategory`].
    pub fn try_register_system(&self, registration: SystemRegistration) -> Result<(), RegistryError> {
        let now = self.now_ms();
        self.inner.state.lock().registry.try_register(registration, now)
    }

    /// Removes a system. Queued items for it are dead-lettered by the
    /// next drain.
    pub fn unregister_system(&self, name: &str) -> bool {
        let mut st = self.inner.state.lock();
        let removed = st.registry.unregister(name);
        if removed {
            st.balancer.remove(name);
            st.anomalies.remove(name);
        }
        removed
    }

    /// Applies a heartbeat and feeds its response time to the anomaly
    /// detector. Returns `false` for unknown systems.
    pub fn heartbeat(&self, name: &str, heartbeat: Heartbeat) -> bool {
        let now = self.now_ms();
        let mut st = self.inner.state.lock();
        if !st.registry.heartbeat(name, heartbeat, now) {
            return false;
        }
        if let Some(ms) = heartbeat.response_time_ms {
            for insight in st.anomalies.observe(name, ms) {
                self.publish_insight(name, insight);
            }
        }
        true
    }

    /// Records an error reported by a system.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSystem`].
    pub fn report_system_error(&self, name: &str, error: &str) -> Result<(), RegistryError> {
        let now = self.now_ms();
        self.inner.state.lock().registry.report_error(name, error, now)
    }

    /// Marks a system offline at its own request.
    ///
    /// # Errors
    ///
    /// [`RegistryError::UnknownSystem`], or [`RegistryError::CircuitOpen`]
    /// while the system's breaker is open.
    pub fn mark_offline(&self, name: &str) -> Result<(), RegistryError> {
        self.inner.state.lock().registry.mark_offline(name)
    }

    /// Reinforcement signal for a rule id or an action type.
    pub fn record_feedback(&self, key: &str, outcome: DecisionOutcome, weight: f64) {
        let mut st = self.inner.state.lock();
        self.apply_feedback(&mut st, key, outcome, weight);
    }

    // === Queue ===

    /// Queues an action for its target system.
    ///
    /// # Errors
    ///
    /// - [`QueueError::UnknownSystem`] if the target is not registered.
    /// - [`QueueError::Full`] if the queue is full and nothing could be
    ///   displaced; the action is in the dead-letter queue.
    pub fn enqueue_action(&self, request: ActionRequest, priority: Priority) -> Result<QueueItemId, QueueError> {
        let now = self.now_ms();
        let mut st = self.inner.state.lock();
        if !st.registry.contains(&request.target) {
            return Err(QueueError::UnknownSystem(request.target));
        }
        let item = QueueItem::new(request, priority, self.inner.config.queue.max_attempts, now);
        self.enqueue_item(&mut st, item, now)
    }

    fn enqueue_item(&self, st: &mut EngineState, item: QueueItem, now: u64) -> Result<QueueItemId, QueueError> {
        let id = item.id;
        match st.queue.enqueue(item, now) {
            EnqueueOutcome::Queued => Ok(id),
            EnqueueOutcome::Displaced { victim } => {
                self.after_dead_letter(st, &victim, DeadLetterReason::QueueFullDisplaced);
                Ok(id)
            }
            EnqueueOutcome::Rejected { item } => {
                self.after_dead_letter(st, &item, DeadLetterReason::QueueFullRejected);
                Err(QueueError::Full {
                    max_depth: st.queue.max_depth(),
                })
            }
        }
    }

    /// Announces a dead letter and charges it to the originating rule.
    fn after_dead_letter(&self, st: &mut EngineState, item: &QueueItem, reason: DeadLetterReason) {
        self.inner.bus.publish(ConductorEvent::ActionDeadLettered {
            request: item.request.clone(),
            reason: reason.to_string(),
        });
        if let Some(rule) = &item.origin_rule {
            self.apply_feedback(st, rule, DecisionOutcome::Failure, OBSERVED_WEIGHT);
        }
    }

    /// Queue drain tick.
    ///
    /// Dispatches the head item whose target breaker is not open, at
    /// most one per call. Items behind an open breaker stay in place
    /// without spending an attempt. Failures are requeued at the head of
    /// their priority band until `max_attempts`, then dead-lettered.
    /// Items whose system was unregistered are dead-lettered on the way
    /// and do not count as the tick's dispatch.
    ///
    /// # Errors
    ///
    /// [`QueueError::DrainInProgress`] if another drain is running.
    pub async fn drain_queue(&self) -> Result<DrainReport, QueueError> {
        if self
            .inner
            .draining
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(QueueError::DrainInProgress);
        }
        let _guard = DrainGuard(&self.inner.draining);

        let mut report = DrainReport::default();

        let next = loop {
            let now = self.now_ms();
            let mut guard = self.inner.state.lock();
            let st = &mut *guard;
            let registry = &st.registry;
            let blocked = |item: &QueueItem| registry.breaker_state(item.target()) == Some(BreakerState::Open);
            report.held = st.queue.iter().filter(|&item| blocked(item)).count();
            match st.queue.next_dispatchable(|item| !blocked(item)) {
                None => break None,
                Some(item) if !st.registry.contains(item.target()) => {
                    st.queue.dead_letter(
                        item.clone(),
                        DeadLetterReason::UnknownSystem,
                        Some(format!("system {} is not registered", item.target())),
                        now,
                    );
                    self.after_dead_letter(st, &item, DeadLetterReason::UnknownSystem);
                    report.dead_lettered += 1;
                }
                Some(item) => break Some(item),
            }
        };
        let Some(mut item) = next else {
            if report != DrainReport::default() {
                debug!(?report, "queue drained");
            }
            return Ok(report);
        };

        let result = self.dispatch_bounded(&item.request).await;

        let now = self.now_ms();
        let mut guard = self.inner.state.lock();
        let st = &mut *guard;
        match result {
            Ok(_) => {
                st.registry.record_success(item.target());
                debug!(id = %item.id, request = %item.request, "dispatched");
                self.inner.bus.publish(ConductorEvent::ActionDispatched {
                    request: item.request.clone(),
                });
                if let Some(rule) = &item.origin_rule {
                    self.apply_feedback(st, rule, DecisionOutcome::Success, OBSERVED_WEIGHT);
                }
                report.dispatched += 1;
            }
            Err(e) => {
                item.attempts += 1;
                item.last_error = Some(e.to_string());
                report.failed += 1;
                warn!(id = %item.id, request = %item.request, attempts = item.attempts, error = %e, "dispatch failed");
                // Target may have been unregistered mid-dispatch.
                let _ = st.registry.report_error(item.target(), &e.to_string(), now);
                self.inner.bus.publish(ConductorEvent::ActionFailed {
                    request: item.request.clone(),
                    error: e.to_string(),
                    attempts: item.attempts,
                });

                if item.exhausted() {
                    st.queue.dead_letter(
                        item.clone(),
                        DeadLetterReason::MaxAttemptsExceeded,
                        item.last_error.clone(),
                        now,
                    );
                    self.after_dead_letter(st, &item, DeadLetterReason::MaxAttemptsExceeded);
                    report.dead_lettered += 1;
                } else {
                    match st.queue.requeue_front(item, now) {
                        EnqueueOutcome::Queued => {}
                        EnqueueOutcome::Displaced { victim } => {
                            self.after_dead_letter(st, &victim, DeadLetterReason::QueueFullDisplaced);
                            report.dead_lettered += 1;
                        }
                        EnqueueOutcome::Rejected { item } => {
                            self.after_dead_letter(st, &item, DeadLetterReason::QueueFullRejected);
                            report.dead_lettered += 1;
                        }
                    }
                }
            }
        }

        debug!(?report, "queue drained");
        Ok(report)
    }

    async fn dispatch_bounded(&self, request: &ActionRequest) -> Result<Value, DispatchError> {
        let timeout = self.inner.config.queue.dispatch_timeout();
        match tokio::time::timeout(timeout, self.inner.dispatcher.dispatch(request)).await {
            Ok(result) => result,
            Err(_) => Err(DispatchError::Timeout {
                target: request.target.clone(),
                timeout_ms: self.inner.config.queue.dispatch_timeout_ms,
            }),
        }
    }

    // === Scenarios ===

    /// Runs a scenario step by step.
    ///
    /// Steps whose target breaker is open are skipped with reason
    /// `circuit-open`; they are not retried later. The run is logged as
    /// a decision.
    ///
    /// # Errors
    ///
    /// [`ScenarioError::NotFound`] or [`ScenarioError::Disabled`]; nothing
    /// is dispatched in that case.
    pub async fn execute_scenario(&self, name: &str) -> Result<ScenarioReport, ScenarioError> {
        let (report, _) = self.run_scenario(name, None, MANUAL_CONFIDENCE).await?;
        Ok(report)
    }

    async fn run_scenario(
        &self,
        name: &str,
        rule_id: Option<&str>,
        confidence: f64,
    ) -> Result<(ScenarioReport, Decision), ScenarioError> {
        let (steps, started) = {
            let st = self.inner.state.lock();
            (st.scenarios.prepare(name)?, self.now_ms())
        };
        info!(scenario = %name, steps = steps.len(), "scenario started");

        let mut results = Vec::with_capacity(steps.len());
        for request in steps {
            let skip = {
                let st = self.inner.state.lock();
                match st.registry.breaker_state(&request.target) {
                    None => Some(SKIP_UNKNOWN_SYSTEM),
                    Some(BreakerState::Open) => Some(SKIP_CIRCUIT_OPEN),
                    Some(_) => None,
                }
            };
            if let Some(reason) = skip {
                debug!(scenario = %name, request = %request, reason, "step skipped");
                self.inner.bus.publish(ConductorEvent::ActionSkipped {
                    request: request.clone(),
                    reason: reason.to_string(),
                });
                results.push(StepResult {
                    request,
                    status: StepStatus::Skipped {
                        reason: reason.to_string(),
                    },
                });
                continue;
            }

            let result = self.dispatch_bounded(&request).await;
            let now = self.now_ms();
            let mut st = self.inner.state.lock();
            let status = match result {
                Ok(_) => {
                    st.registry.record_success(&request.target);
                    self.inner.bus.publish(ConductorEvent::ActionDispatched {
                        request: request.clone(),
                    });
                    StepStatus::Executed
                }
                Err(e) => {
                    warn!(scenario = %name, request = %request, error = %e, "step failed");
                    let _ = st.registry.report_error(&request.target, &e.to_string(), now);
                    self.inner.bus.publish(ConductorEvent::ActionFailed {
                        request: request.clone(),
                        error: e.to_string(),
                        attempts: 1,
                    });
                    StepStatus::Failed {
                        error: e.to_string(),
                    }
                }
            };
            results.push(StepResult { request, status });
        }

        let finished = self.now_ms();
        let duration_ms = finished.saturating_sub(started);
        let report = ScenarioReport::new(name, results, duration_ms);

        let mut st = self.inner.state.lock();
        st.scenarios.record_execution(name, duration_ms);
        st.usage.record(hour_of_day(started), name);
        let decision = Decision {
            id: DecisionId::new(),
            timestamp_ms: finished,
            rule_id: rule_id.map(str::to_string),
            scenario: Some(name.to_string()),
            systems: report.systems(),
            confidence,
            outcome: report.outcome,
            duration_ms,
        };
        self.log_decision(&mut st, decision.clone());
        if let Some(rule) = rule_id {
            self.apply_feedback(&mut st, rule, report.outcome, OBSERVED_WEIGHT);
        }
        info!(
            scenario = %name,
            success = report.success,
            executed = report.executed(),
            skipped = report.skipped(),
            failed = report.failed(),
            "scenario completed"
        );
        self.inner.bus.publish(ConductorEvent::ScenarioCompleted {
            scenario: name.to_string(),
            success: report.success,
            executed: report.executed(),
            skipped: report.skipped(),
            failed: report.failed(),
            duration_ms,
        });
        Ok((report, decision))
    }

    /// Enables or disables a scenario. Returns `false` if unknown.
    pub fn set_scenario_enabled(&self, name: &str, enabled: bool) -> bool {
        self.inner.state.lock().scenarios.set_enabled(name, enabled)
    }

    // === Rules ===

    /// Rule evaluation cycle.
    ///
    /// Matches rules against `ctx`, resolves conflicts, scores the
    /// survivors and acts on those at or above the confidence threshold:
    /// dispatch actions are queued, scenario triggers run immediately.
    /// The rest emit `ConfirmationRequired`.
    pub async fn evaluate_rules(&self, ctx: &Context) -> EvaluationReport {
        let now = self.now_ms();
        let (evaluation, scored, threshold) = {
            let mut st = self.inner.state.lock();
            let evaluation = st.rules.evaluate(ctx, now);
            let scored: Vec<(Rule, f64)> = evaluation
                .survivors
                .iter()
                .map(|rule| (rule.clone(), st.confidence.score(rule)))
                .collect();
            (evaluation, scored, st.confidence.threshold())
        };

        for conflict in &evaluation.conflicts {
            self.inner.bus.publish(ConductorEvent::ConflictResolved {
                conflict_type: conflict.conflict_type.clone(),
                winner: conflict.winner.clone(),
                loser: conflict.loser.clone(),
            });
        }

        let mut report = EvaluationReport {
            matched: evaluation.matched,
            conflicts: evaluation.conflicts,
            ..EvaluationReport::default()
        };

        for (rule, confidence) in scored {
            if confidence < threshold {
                info!(rule = %rule.id, confidence, threshold, "confirmation required");
                self.inner.bus.publish(ConductorEvent::ConfirmationRequired {
                    rule_id: rule.id.clone(),
                    confidence,
                    threshold,
                });
                report.confirmation_required.push(rule.id);
                continue;
            }
            if let Some(decision) = self.execute_rule(&rule, confidence).await {
                report.decisions.push(decision);
            }
        }
        report
    }

    async fn execute_rule(&self, rule: &Rule, confidence: f64) -> Option<Decision> {
        match &rule.action {
            RuleAction::Dispatch { .. } => {
                let request = rule.action.request()?;
                let now = self.now_ms();
                let mut st = self.inner.state.lock();
                let outcome = if st.registry.contains(&request.target) {
                    let item = QueueItem::new(
                        request.clone(),
                        rule.priority,
                        self.inner.config.queue.max_attempts,
                        now,
                    )
                    .with_origin_rule(rule.id.clone());
                    match self.enqueue_item(&mut st, item, now) {
                        Ok(_) => DecisionOutcome::Success,
                        Err(e) => {
                            warn!(rule = %rule.id, error = %e, "rule action not queued");
                            DecisionOutcome::Failure
                        }
                    }
                } else {
                    warn!(rule = %rule.id, target_system = %request.target, "rule targets unknown system");
                    DecisionOutcome::Failure
                };
                let decision = Decision {
                    id: DecisionId::new(),
                    timestamp_ms: now,
                    rule_id: Some(rule.id.clone()),
                    scenario: None,
                    systems: vec![request.target],
                    confidence,
                    outcome,
                    duration_ms: 0,
                };
                self.log_decision(&mut st, decision.clone());
                Some(decision)
            }
            RuleAction::TriggerScenario { scenario } => {
                match self.run_scenario(scenario, Some(&rule.id), confidence).await {
                    Ok((_, decision)) => Some(decision),
                    Err(e) => {
                        warn!(rule = %rule.id, %scenario, error = %e, "rule scenario not run");
                        let now = self.now_ms();
                        let mut st = self.inner.state.lock();
                        let decision = Decision {
                            id: DecisionId::new(),
                            timestamp_ms: now,
                            rule_id: Some(rule.id.clone()),
                            scenario: Some(scenario.clone()),
                            systems: Vec::new(),
                            confidence,
                            outcome: DecisionOutcome::Failure,
                            duration_ms: 0,
                        };
                        self.log_decision(&mut st, decision.clone());
                        self.apply_feedback(&mut st, &rule.id, DecisionOutcome::Failure, OBSERVED_WEIGHT);
                        Some(decision)
                    }
                }
            }
        }
    }

    fn log_decision(&self, st: &mut EngineState, decision: Decision) {
        st.confidence.record_outcome(decision.outcome);
        self.inner.bus.publish(ConductorEvent::DecisionLogged {
            decision_id: decision.id,
            rule_id: decision.rule_id.clone(),
            scenario: decision.scenario.clone(),
            outcome: decision.outcome,
            confidence: decision.confidence,
        });
        st.decisions.push(decision);
    }

    fn apply_feedback(&self, st: &mut EngineState, key: &str, outcome: DecisionOutcome, weight: f64) {
        if let Some(threshold) = st.confidence.record_feedback(key, outcome, weight) {
            debug!(%key, %outcome, threshold, "confidence threshold adjusted");
            self.inner
                .bus
                .publish(ConductorEvent::ThresholdAdjusted { threshold });
        }
    }

    // === Health cycles ===

    /// Heartbeat sweep cycle. Returns the stale systems.
    pub fn sweep_heartbeats(&self) -> Vec<String> {
        let now = self.now_ms();
        self.inner.state.lock().registry.sweep(now)
    }

    /// Breaker check cycle. Returns systems that turned half-open.
    pub fn check_breakers(&self) -> Vec<String> {
        let now = self.now_ms();
        self.inner.state.lock().registry.check_breakers(now)
    }

    /// Cascade check cycle. Returns how many systems were newly degraded.
    pub fn check_cascades(&self) -> usize {
        self.inner.state.lock().registry.check_cascades()
    }

    /// Load-balancing cycle.
    pub fn rebalance(&self) -> Vec<LoadChange> {
        let mut guard = self.inner.state.lock();
        let st = &mut *guard;
        let samples = st.registry.load_samples();
        let changes = st.balancer.rebalance(&samples);
        for change in &changes {
            let event = match change {
                LoadChange::Shed { system, score } => ConductorEvent::LoadShed {
                    system: system.clone(),
                    score: *score,
                },
                LoadChange::Restored { system, score } => ConductorEvent::LoadRestored {
                    system: system.clone(),
                    score: *score,
                },
            };
            self.inner.bus.publish(event);
        }
        changes
    }

    fn publish_insight(&self, system: &str, insight: Insight) {
        let event = match insight {
            Insight::Bottleneck { response_time_ms } => {
                warn!(%system, response_time_ms, "bottleneck detected");
                ConductorEvent::BottleneckDetected {
                    system: system.to_string(),
                    response_time_ms,
                }
            }
            Insight::Anomaly {
                metric,
                value,
                z_score,
            } => {
                warn!(%system, %metric, value, z_score, "anomaly detected");
                ConductorEvent::AnomalyDetected {
                    system: system.to_string(),
                    metric,
                    value,
                    z_score,
                }
            }
        };
        self.inner.bus.publish(event);
    }

    // === Queries ===

    #[must_use]
    pub fn systems(&self) -> Vec<SystemInfo> {
        self.inner.state.lock().registry.list()
    }

    #[must_use]
    pub fn systems_by_category(&self, category: SystemCategory) -> Vec<SystemInfo> {
        self.inner.state.lock().registry.by_category(category)
    }

    #[must_use]
    pub fn systems_by_status(&self, status: SystemStatus) -> Vec<SystemInfo> {
        self.inner.state.lock().registry.by_status(status)
    }

    #[must_use]
    pub fn system(&self, name: &str) -> Option<SystemInfo> {
        self.inner.state.lock().registry.get(name)
    }

    #[must_use]
    pub fn breaker_state(&self, name: &str) -> Option<BreakerState> {
        self.inner.state.lock().registry.breaker_state(name)
    }

    #[must_use]
    pub fn scenarios(&self) -> Vec<Scenario> {
        self.inner.state.lock().scenarios.list()
    }

    #[must_use]
    pub fn rules(&self) -> Vec<Rule> {
        self.inner.state.lock().rules.rules().to_vec()
    }

    /// Up to `n` decisions, newest first.
    #[must_use]
    pub fn recent_decisions(&self, n: usize) -> Vec<Decision> {
        self.inner.state.lock().decisions.recent(n)
    }

    /// Retained conflicts, oldest first.
    #[must_use]
    pub fn conflicts(&self) -> Vec<Conflict> {
        self.inner.state.lock().rules.conflicts()
    }

    #[must_use]
    pub fn dead_letters(&self) -> Vec<DeadLetter> {
        self.inner.state.lock().queue.dead_letters()
    }

    /// Pending items in dequeue order.
    #[must_use]
    pub fn queued_items(&self) -> Vec<QueueItem> {
        self.inner.state.lock().queue.items()
    }

    #[must_use]
    pub fn queue_depth(&self) -> usize {
        self.inner.state.lock().queue.len()
    }

    #[must_use]
    pub fn load_status(&self) -> LoadStatus {
        self.inner.state.lock().balancer.status()
    }

    #[must_use]
    pub fn is_shed(&self, name: &str) -> bool {
        self.inner.state.lock().balancer.is_shed(name)
    }

    /// Registered systems, dependencies before dependents.
    #[must_use]
    pub fn startup_order(&self) -> Vec<String> {
        self.startup_plan().order
    }

    /// Startup order plus the edges that closed a cycle.
    #[must_use]
    pub fn startup_plan(&self) -> StartupPlan {
        self.inner.state.lock().registry.startup_plan()
    }

    #[must_use]
    pub fn confidence_threshold(&self) -> f64 {
        self.inner.state.lock().confidence.threshold()
    }

    #[must_use]
    pub fn accuracy(&self) -> f64 {
        self.inner.state.lock().confidence.accuracy()
    }

    /// Most frequently run scenario at `hour` (0–23).
    #[must_use]
    pub fn predict_scenario(&self, hour: u8) -> Option<Prediction> {
        self.inner.state.lock().usage.predict(hour)
    }
}

/// Builder for [`ConductorEngine`].
///
/// Defaults: [`ConductorConfig::default`], [`NullDispatcher`],
/// [`SystemClock`], a fresh [`EventBus`], the default conflict table.
#[derive(Default)]
pub struct EngineBuilder {
    config: ConductorConfig,
    dispatcher: Option<Arc<dyn SystemDispatcher>>,
    clock: Option<Arc<dyn Clock>>,
    bus: Option<EventBus>,
    systems: Vec<SystemRegistration>,
    conflict_pairs: Vec<ConflictPair>,
    rules: Vec<Rule>,
    scenarios: Vec<Scenario>,
}

impl EngineBuilder {
    #[must_use]
    pub fn config(mut self, config: ConductorConfig) -> Self {
        self.config = config;
        self
    }

    #[must_use]
    pub fn dispatcher(mut self, dispatcher: Arc<dyn SystemDispatcher>) -> Self {
        self.dispatcher = Some(dispatcher);
        self
    }

    #[must_use]
    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    #[must_use]
    pub fn event_bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// System registered when the engine is built.
    #[must_use]
    pub fn system(mut self, registration: SystemRegistration) -> Self {
        self.systems.push(registration);
        self
    }

    /// Extra conflict pair on top of the defaults.
    #[must_use]
    pub fn conflict_pair(mut self, a: impl Into<String>, b: impl Into<String>) -> Self {
        self.conflict_pairs.push(ConflictPair::new(a, b));
        self
    }

    #[must_use]
    pub fn rule(mut self, rule: Rule) -> Self {
        self.rules.push(rule);
        self
    }

    #[must_use]
    pub fn rules(mut self, rules: impl IntoIterator<Item = Rule>) -> Self {
        self.rules.extend(rules);
        self
    }

    #[must_use]
    pub fn scenario(mut self, scenario: Scenario) -> Self {
        self.scenarios.push(scenario);
        self
    }

    /// Adds everything declared in a definitions file.
    #[must_use]
    pub fn definitions(mut self, definitions: Definitions) -> Self {
        self.systems.extend(definitions.systems);
        self.conflict_pairs.extend(definitions.conflicts);
        self.rules.extend(definitions.rules);
        self.scenarios.extend(definitions.scenarios);
        self
    }

    #[must_use]
    pub fn build(self) -> ConductorEngine {
        let config = self.config;
        let bus = self.bus.unwrap_or_default();
        let clock = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let dispatcher = self.dispatcher.unwrap_or_else(|| Arc::new(NullDispatcher));

        let mut rules = RuleEngine::new(ConflictTable::with_defaults(), config.rules.conflict_log_capacity);
        for pair in self.conflict_pairs {
            rules.add_conflict_pair(pair.a, pair.b);
        }
        for rule in self.rules {
            rules.add_rule(rule);
        }

        let mut scenarios = ScenarioCatalog::new();
        for scenario in self.scenarios {
            scenarios.insert(scenario);
        }

        let mut registry = SystemRegistry::new(config.registry.clone(), bus.clone());
        let now = clock.now_ms();
        for registration in self.systems {
            registry.register(registration, now);
        }

        let state = EngineState {
            registry,
            queue: OrchestrationQueue::new(&config.queue),
            rules,
            scenarios,
            confidence: ConfidenceModel::new(config.rules.confidence_threshold),
            decisions: DecisionLog::new(config.rules.decision_log_capacity),
            balancer: LoadBalancer::new(config.balancer.clone()),
            anomalies: AnomalyDetector::new(config.insight.clone()),
            usage: UsagePredictor::new(),
        };

        ConductorEngine {
            inner: Arc::new(EngineInner {
                state: Mutex::new(state),
                dispatcher,
                clock,
                bus,
                config,
                draining: AtomicBool::new(false),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::rules::Condition;
    use crate::testing::ScriptedDispatcher;
    use std::time::Duration;

    struct Harness {
        engine: ConductorEngine,
        dispatcher: Arc<ScriptedDispatcher>,
        clock: Arc<ManualClock>,
    }

    fn harness(builder: EngineBuilder) -> Harness {
        let dispatcher = Arc::new(ScriptedDispatcher::new());
        let clock = Arc::new(ManualClock::new(1_000));
        let engine = builder
            .dispatcher(dispatcher.clone())
            .clock(clock.clone())
            .build();
        Harness {
            engine,
            dispatcher,
            clock,
        }
    }

    fn open_breaker(engine: &ConductorEngine, name: &str) {
        for _ in 0..engine.config().registry.max_failures {
            engine.report_system_error(name, "boom").unwrap();
        }
        assert_eq!(engine.breaker_state(name), Some(BreakerState::Open));
    }

    fn heat_rule(priority: i64) -> Rule {
        Rule::new(
            "heat",
            priority,
            Condition::Always,
            RuleAction::dispatch("hvac", "activate-heating"),
        )
    }

    #[tokio::test]
    async fn queued_action_is_dispatched() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("hvac", "climate")));
        h.engine
            .enqueue_action(ActionRequest::new("hvac", "activate-heating"), Priority::new(7))
            .unwrap();
        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(h.engine.queue_depth(), 0);
        assert_eq!(h.dispatcher.calls_to("hvac"), 1);
    }

    #[tokio::test]
    async fn each_drain_dispatches_one_item() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("lamp", "lighting")));
        for scene in ["dawn", "day", "dusk"] {
            h.engine
                .enqueue_action(ActionRequest::new("lamp", scene), Priority::NORMAL)
                .unwrap();
        }

        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(h.engine.queue_depth(), 2);
        assert_eq!(h.dispatcher.calls()[0].action_type, "dawn");

        h.engine.drain_queue().await.unwrap();
        h.engine.drain_queue().await.unwrap();
        assert_eq!(h.engine.queue_depth(), 0);
        assert_eq!(h.dispatcher.calls_to("lamp"), 3);
        assert_eq!(h.engine.drain_queue().await.unwrap(), DrainReport::default());
    }

    #[tokio::test]
    async fn drain_passes_over_open_breaker_to_next_item() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("hvac", "climate"))
                .system(SystemRegistration::new("lamp", "lighting")),
        );
        open_breaker(&h.engine, "hvac");
        h.engine
            .enqueue_action(ActionRequest::new("hvac", "activate-heating"), Priority::new(9))
            .unwrap();
        h.engine
            .enqueue_action(ActionRequest::new("lamp", "on"), Priority::new(2))
            .unwrap();

        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!((report.dispatched, report.held), (1, 1));
        assert_eq!(h.engine.queued_items()[0].request.target, "hvac");
        assert_eq!(h.engine.queued_items()[0].attempts, 0);
    }

    #[tokio::test]
    async fn enqueue_unknown_target_rejected() {
        let h = harness(ConductorEngine::builder());
        let err = h
            .engine
            .enqueue_action(ActionRequest::new("ghost", "boo"), Priority::NORMAL)
            .unwrap_err();
        assert_eq!(err, QueueError::UnknownSystem("ghost".into()));
        assert!(h.engine.dead_letters().is_empty());
    }

    #[tokio::test]
    async fn failing_item_dead_lettered_once_after_max_attempts() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("pool", "household")));
        h.dispatcher.fail_always("pool");
        h.engine
            .enqueue_action(ActionRequest::new("pool", "heat"), Priority::NORMAL)
            .unwrap();

        // Each drain tries the item once. The third failure also opens
        // the breaker, but the item is already exhausted.
        for _ in 0..3 {
            h.engine.drain_queue().await.unwrap();
        }
        assert_eq!(h.engine.queue_depth(), 0);
        let dead = h.engine.dead_letters();
        assert_eq!(dead.len(), 1);
        assert_eq!(dead[0].reason, DeadLetterReason::MaxAttemptsExceeded);
        assert_eq!(dead[0].item.attempts, 3);
        assert!(dead[0].failure_reason.as_deref().unwrap().contains("scripted failure"));
        assert_eq!(h.dispatcher.calls_to("pool"), 3);
    }

    #[tokio::test]
    async fn open_breaker_holds_item_without_charging_attempts() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("hvac", "climate")));
        open_breaker(&h.engine, "hvac");
        h.engine
            .enqueue_action(ActionRequest::new("hvac", "activate-heating"), Priority::NORMAL)
            .unwrap();

        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.held, 1);
        assert_eq!(h.dispatcher.calls().len(), 0);
        assert_eq!(h.engine.queued_items()[0].attempts, 0);

        h.clock.advance(Duration::from_millis(h.engine.config().registry.half_open_timeout_ms));
        assert_eq!(h.engine.check_breakers(), vec!["hvac".to_string()]);
        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.dispatched, 1);
        assert_eq!(h.engine.breaker_state("hvac"), Some(BreakerState::Closed));
    }

    #[tokio::test]
    async fn unregistered_target_dead_lettered_on_drain() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("hvac", "climate")));
        h.engine
            .enqueue_action(ActionRequest::new("hvac", "x"), Priority::NORMAL)
            .unwrap();
        assert!(h.engine.unregister_system("hvac"));
        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.dead_lettered, 1);
        assert_eq!(h.engine.dead_letters()[0].reason, DeadLetterReason::UnknownSystem);
    }

    #[tokio::test(start_paused = true)]
    async fn dispatch_timeout_counts_as_failure() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("slow", "infrastructure")));
        h.dispatcher.delay("slow", Duration::from_secs(60));
        h.engine
            .enqueue_action(ActionRequest::new("slow", "x"), Priority::NORMAL)
            .unwrap();
        let report = h.engine.drain_queue().await.unwrap();
        assert_eq!(report.failed, 1);
        let item = &h.engine.queued_items()[0];
        assert_eq!(item.attempts, 1);
        assert!(item.last_error.as_deref().unwrap().contains("timed out"));
        assert_eq!(h.engine.system("slow").unwrap().failure_count, 1);
    }

    #[tokio::test]
    async fn concurrent_drain_refused() {
        let h = harness(ConductorEngine::builder());
        h.engine.inner.draining.store(true, Ordering::SeqCst);
        assert_eq!(h.engine.drain_queue().await, Err(QueueError::DrainInProgress));
        h.engine.inner.draining.store(false, Ordering::SeqCst);
        assert!(h.engine.drain_queue().await.is_ok());
    }

    #[tokio::test]
    async fn rule_feedback_from_queue_outcome() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("hvac", "climate"))
                .rule(heat_rule(9)),
        );
        let mut events = h.engine.subscribe();
        let report = h.engine.evaluate_rules(&Context::from_millis(0)).await;
        assert_eq!(report.decisions.len(), 1);
        assert_eq!(h.engine.queue_depth(), 1);

        h.engine.drain_queue().await.unwrap();
        assert!((h.engine.confidence_threshold() - 0.595).abs() < 1e-9);

        let mut adjusted = false;
        while let Ok(ev) = events.try_recv() {
            adjusted |= matches!(ev, ConductorEvent::ThresholdAdjusted { .. });
        }
        assert!(adjusted);
    }

    #[tokio::test]
    async fn low_confidence_requires_confirmation() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("hvac", "climate"))
                .rule(heat_rule(5)),
        );
        for _ in 0..3 {
            h.engine.record_feedback("heat", DecisionOutcome::Failure, 1.0);
        }
        let report = h.engine.evaluate_rules(&Context::from_millis(0)).await;
        assert_eq!(report.confirmation_required, vec!["heat".to_string()]);
        assert!(report.decisions.is_empty());
        assert_eq!(h.engine.queue_depth(), 0);
    }

    #[tokio::test]
    async fn rule_triggers_scenario_once_logged() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("lighting", "lighting"))
                .scenario(Scenario::new(
                    "good-night",
                    vec![ActionRequest::new("lighting", "lights-off")],
                ))
                .rule(Rule::new(
                    "bedtime",
                    6,
                    Condition::Always,
                    RuleAction::trigger_scenario("good-night"),
                )),
        );
        let report = h.engine.evaluate_rules(&Context::from_millis(0)).await;
        assert_eq!(report.decisions.len(), 1);
        let decision = &report.decisions[0];
        assert_eq!(decision.rule_id.as_deref(), Some("bedtime"));
        assert_eq!(decision.scenario.as_deref(), Some("good-night"));
        assert_eq!(decision.outcome, DecisionOutcome::Success);
        assert_eq!(h.engine.recent_decisions(10).len(), 1);
        assert_eq!(h.engine.scenarios()[0].execution_count, 1);
    }

    #[tokio::test]
    async fn scenario_errors_fail_fast() {
        let h = harness(
            ConductorEngine::builder()
                .scenario(Scenario::new("party", vec![ActionRequest::new("audio", "play")]).disabled()),
        );
        assert_eq!(
            h.engine.execute_scenario("nope").await,
            Err(ScenarioError::NotFound("nope".into()))
        );
        assert_eq!(
            h.engine.execute_scenario("party").await,
            Err(ScenarioError::Disabled("party".into()))
        );
        assert!(h.dispatcher.calls().is_empty());
        assert!(h.engine.recent_decisions(10).is_empty());
    }

    #[tokio::test]
    async fn scenario_usage_feeds_prediction() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("blinds", "climate"))
                .scenario(Scenario::new(
                    "morning",
                    vec![ActionRequest::new("blinds", "open-blinds")],
                )),
        );
        h.clock.set(7 * 3_600_000 + 5);
        h.engine.execute_scenario("morning").await.unwrap();
        let prediction = h.engine.predict_scenario(7).unwrap();
        assert_eq!(prediction.scenario, "morning");
        assert!(h.engine.predict_scenario(8).is_none());
    }

    #[tokio::test]
    async fn heartbeat_spike_emits_anomaly() {
        let h = harness(ConductorEngine::builder().system(SystemRegistration::new("hvac", "climate")));
        let mut events = h.engine.subscribe();
        for ms in [100.0, 104.0, 96.0, 101.0, 99.0] {
            assert!(h.engine.heartbeat("hvac", Heartbeat::new().response_time_ms(ms)));
        }
        h.engine.heartbeat("hvac", Heartbeat::new().response_time_ms(2_500.0));

        let mut kinds = Vec::new();
        while let Ok(ev) = events.try_recv() {
            match ev {
                ConductorEvent::AnomalyDetected { .. } => kinds.push("anomaly"),
                ConductorEvent::BottleneckDetected { .. } => kinds.push("bottleneck"),
                _ => {}
            }
        }
        assert_eq!(kinds, vec!["bottleneck", "anomaly"]);
        assert!(!h.engine.heartbeat("ghost", Heartbeat::new()));
    }

    #[tokio::test]
    async fn rebalance_publishes_shed() {
        let h = harness(
            ConductorEngine::builder()
                .system(SystemRegistration::new("pool", "household").priority(2).memory_budget_mb(100.0)),
        );
        h.engine.heartbeat(
            "pool",
            Heartbeat::new().cpu_usage_percent(95.0).memory_usage_mb(95.0),
        );
        let changes = h.engine.rebalance();
        assert_eq!(changes.len(), 1);
        assert!(h.engine.is_shed("pool"));
        assert_eq!(h.engine.load_status().shed, vec!["pool".to_string()]);

        assert!(h.engine.unregister_system("pool"));
        assert!(!h.engine.is_shed("pool"));
    }
}
