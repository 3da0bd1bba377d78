//! Periodic cycles.
//!
//! | Cycle | Interval | Body |
//! |-------|----------|------|
//! | `heartbeat-sweep` | `registry.sweep_interval_ms` | [`ConductorEngine::sweep_heartbeats`] |
//! | `breaker-check` | `registry.breaker_check_interval_ms` | [`ConductorEngine::check_breakers`] |
//! | `cascade-check` | `registry.cascade_check_interval_ms` | [`ConductorEngine::check_cascades`] |
//! | `rule-evaluation` | `rules.evaluation_interval_ms` | [`ConductorEngine::evaluate_rules`] |
//! | `queue-drain` | `queue.drain_interval_ms` | [`ConductorEngine::drain_queue`] |
//! | `load-balance` | `balancer.interval_ms` | [`ConductorEngine::rebalance`] |
//!
//! Every iteration runs in its own task. A panicking iteration is
//! logged and the cycle carries on with the next tick.

use super::engine::ConductorEngine;
use crate::rules::ContextProvider;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info};

/// Running cycle tasks. Dropping the handles stops the cycles too.
#[derive(Debug)]
pub struct CycleHandles {
    tasks: Vec<(&'static str, JoinHandle<()>)>,
}

impl CycleHandles {
    /// Names of the running cycles.
    #[must_use]
    pub fn names(&self) -> Vec<&'static str> {
        self.tasks.iter().map(|(name, _)| *name).collect()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Stops every cycle. Iterations already dispatching run to
    /// completion or timeout in their own tasks.
    pub fn shutdown(mut self) {
        self.abort_all();
        info!("cycles stopped");
    }

    fn abort_all(&mut self) {
        for (name, task) in self.tasks.drain(..) {
            debug!(cycle = name, "aborting cycle");
            task.abort();
        }
    }
}

impl Drop for CycleHandles {
    fn drop(&mut self) {
        self.abort_all();
    }
}

fn spawn_cycle<F, Fut>(name: &'static str, interval_ms: u64, mut body: F) -> (&'static str, JoinHandle<()>)
where
    F: FnMut() -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let period = Duration::from_millis(interval_ms.max(1));
    let task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        loop {
            ticker.tick().await;
            if let Err(e) = tokio::spawn(body()).await {
                error!(cycle = name, error = %e, "cycle iteration failed");
            }
        }
    });
    (name, task)
}

impl ConductorEngine {
    /// Starts every periodic cycle on the current tokio runtime.
    ///
    /// `provider` supplies the context for each rule evaluation.
    #[must_use]
    pub fn spawn_cycles(&self, provider: Arc<dyn ContextProvider>) -> CycleHandles {
        let cfg = self.config().clone();
        let mut tasks = Vec::with_capacity(6);

        let engine = self.clone();
        tasks.push(spawn_cycle("heartbeat-sweep", cfg.registry.sweep_interval_ms, move || {
            let engine = engine.clone();
            async move {
                let stale = engine.sweep_heartbeats();
                if !stale.is_empty() {
                    debug!(?stale, "heartbeat sweep");
                }
            }
        }));

        let engine = self.clone();
        tasks.push(spawn_cycle("breaker-check", cfg.registry.breaker_check_interval_ms, move || {
            let engine = engine.clone();
            async move {
                engine.check_breakers();
            }
        }));

        let engine = self.clone();
        tasks.push(spawn_cycle("cascade-check", cfg.registry.cascade_check_interval_ms, move || {
            let engine = engine.clone();
            async move {
                engine.check_cascades();
            }
        }));

        let engine = self.clone();
        tasks.push(spawn_cycle("rule-evaluation", cfg.rules.evaluation_interval_ms, move || {
            let engine = engine.clone();
            let provider = Arc::clone(&provider);
            async move {
                let ctx = provider.snapshot(engine.now_ms());
                let report = engine.evaluate_rules(&ctx).await;
                debug!(
                    matched = report.matched,
                    acted = report.decisions.len(),
                    deferred = report.confirmation_required.len(),
                    "rules evaluated"
                );
            }
        }));

        let engine = self.clone();
        tasks.push(spawn_cycle("queue-drain", cfg.queue.drain_interval_ms, move || {
            let engine = engine.clone();
            async move {
                if let Err(e) = engine.drain_queue().await {
                    debug!(error = %e, "queue drain skipped");
                }
            }
        }));

        let engine = self.clone();
        tasks.push(spawn_cycle("load-balance", cfg.balancer.interval_ms, move || {
            let engine = engine.clone();
            async move {
                engine.rebalance();
            }
        }));

        info!(cycles = tasks.len(), "cycles started");
        CycleHandles { tasks }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;
    use crate::registry::SystemRegistration;
    use crate::rules::{ClockContextProvider, Condition, Rule, RuleAction};
    use crate::testing::ScriptedDispatcher;
    use crate::ConductorConfig;

    #[tokio::test(start_paused = true)]
    async fn cycles_evaluate_and_drain() {
        let dispatcher = Arc::new(ScriptedDispatcher::new());
        let engine = ConductorEngine::builder()
            .dispatcher(dispatcher.clone())
            .clock(Arc::new(ManualClock::new(0)))
            .system(SystemRegistration::new("hvac", "climate"))
            .rule(Rule::new(
                "heat",
                9,
                Condition::Always,
                RuleAction::dispatch("hvac", "activate-heating"),
            ))
            .build();

        let handles = engine.spawn_cycles(Arc::new(ClockContextProvider));
        assert_eq!(handles.len(), 6);
        assert!(handles.names().contains(&"queue-drain"));

        tokio::time::sleep(Duration::from_millis(2_500)).await;
        assert!(dispatcher.calls_to("hvac") >= 1);

        handles.shutdown();
        // Let an iteration caught mid-flight finish.
        tokio::time::sleep(Duration::from_millis(10)).await;
        let calls = dispatcher.calls().len();
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(dispatcher.calls().len(), calls);
    }

    #[tokio::test(start_paused = true)]
    async fn panicking_iteration_does_not_stop_cycle() {
        let engine = ConductorEngine::builder()
            .config(ConductorConfig::default())
            .clock(Arc::new(ManualClock::new(0)))
            .build();
        let counter = Arc::new(std::sync::atomic::AtomicUsize::new(0));
        let seen = Arc::clone(&counter);
        let provider = move |now: u64| {
            let n = seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            if n == 0 {
                panic!("context source unavailable");
            }
            crate::rules::Context::from_millis(now)
        };
        let handles = engine.spawn_cycles(Arc::new(provider));
        let interval = engine.config().rules.evaluation_interval_ms;
        tokio::time::sleep(Duration::from_millis(interval * 2 + 10)).await;
        assert!(counter.load(std::sync::atomic::Ordering::SeqCst) >= 2);
        handles.shutdown();
    }
}
