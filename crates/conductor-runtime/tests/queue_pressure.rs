//! Integration tests for the orchestration queue under pressure.
//!
//! Covers displacement and rejection at capacity, retry exhaustion,
//! dispatch timeouts and the single-drain guarantee.

use conductor_event::{ActionRequest, ConductorEvent};
use conductor_runtime::testing::ScriptedDispatcher;
use conductor_runtime::{
    ConductorConfig, ConductorEngine, DeadLetterReason, ManualClock, QueueError,
    SystemRegistration,
};
use conductor_types::Priority;
use std::sync::Arc;
use std::time::Duration;

fn engine_with_depth(max_depth: usize) -> (ConductorEngine, Arc<ScriptedDispatcher>) {
    let mut config = ConductorConfig::default();
    config.queue.max_depth = max_depth;
    let dispatcher = Arc::new(ScriptedDispatcher::new());
    let engine = ConductorEngine::builder()
        .config(config)
        .dispatcher(dispatcher.clone())
        .clock(Arc::new(ManualClock::new(1_000)))
        .system(SystemRegistration::new("lighting", "lighting"))
        .system(SystemRegistration::new("sprinklers", "household"))
        .build();
    (engine, dispatcher)
}

fn lights(n: usize) -> ActionRequest {
    ActionRequest::new("lighting", format!("scene-{n}"))
}

#[test]
fn full_queue_displaces_low_priority_then_rejects() {
    let (engine, _) = engine_with_depth(3);
    for n in 0..3 {
        engine
            .enqueue_action(lights(n), Priority::new(2))
            .expect("room in queue");
    }

    // Higher priority pushes out the newest low-priority item.
    engine
        .enqueue_action(lights(10), Priority::new(8))
        .expect("displaces a priority-2 item");
    assert_eq!(engine.queue_depth(), 3);
    let dead = engine.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].reason, DeadLetterReason::QueueFullDisplaced);
    assert_eq!(dead[0].item.request.action_type, "scene-2");

    engine.enqueue_action(lights(11), Priority::new(8)).expect("displaces");
    engine.enqueue_action(lights(12), Priority::new(9)).expect("displaces");
    assert_eq!(engine.queue_depth(), 3);

    // Everything left is at or above the displacement ceiling.
    let err = engine
        .enqueue_action(lights(13), Priority::new(9))
        .unwrap_err();
    assert_eq!(err, QueueError::Full { max_depth: 3 });
    assert_eq!(engine.queue_depth(), 3);

    let dead = engine.dead_letters();
    assert_eq!(dead.len(), 4);
    assert_eq!(dead[3].reason, DeadLetterReason::QueueFullRejected);

    let priorities: Vec<u8> = engine
        .queued_items()
        .iter()
        .map(|item| item.priority.get())
        .collect();
    assert_eq!(priorities, vec![9, 8, 8]);
}

#[test]
fn equal_priority_is_never_displaced() {
    let (engine, _) = engine_with_depth(1);
    engine
        .enqueue_action(lights(0), Priority::new(3))
        .expect("room in queue");
    assert!(engine.enqueue_action(lights(1), Priority::new(3)).is_err());
    assert_eq!(engine.queued_items()[0].request.action_type, "scene-0");
}

/// An always-failing action is retried across drains and lands in the
/// dead-letter queue exactly once.
#[tokio::test]
async fn exhausted_item_is_dead_lettered_once() {
    let (engine, dispatcher) = engine_with_depth(10);
    dispatcher.fail_always("sprinklers");
    let mut rx = engine.subscribe();

    engine
        .enqueue_action(ActionRequest::new("sprinklers", "water-lawn"), Priority::NORMAL)
        .expect("registered target");

    for _ in 0..6 {
        engine.drain_queue().await.expect("no concurrent drain");
    }

    assert_eq!(engine.queue_depth(), 0);
    let dead = engine.dead_letters();
    assert_eq!(dead.len(), 1);
    assert_eq!(dead[0].reason, DeadLetterReason::MaxAttemptsExceeded);
    assert_eq!(dead[0].item.attempts, engine.config().queue.max_attempts);
    assert_eq!(
        dispatcher.calls_to("sprinklers"),
        engine.config().queue.max_attempts as usize
    );

    let mut dead_lettered = 0;
    let mut failures = 0;
    while let Ok(event) = rx.try_recv() {
        match event {
            ConductorEvent::ActionDeadLettered { .. } => dead_lettered += 1,
            ConductorEvent::ActionFailed { .. } => failures += 1,
            _ => {}
        }
    }
    assert_eq!(dead_lettered, 1);
    assert_eq!(failures, 3);
}

/// One transient failure: the item stays queued and succeeds next drain.
#[tokio::test]
async fn transient_failure_is_retried() {
    let (engine, dispatcher) = engine_with_depth(10);
    dispatcher.fail_times("lighting", 1);
    engine
        .enqueue_action(lights(0), Priority::NORMAL)
        .expect("registered target");

    let first = engine.drain_queue().await.expect("no concurrent drain");
    assert_eq!((first.dispatched, first.failed), (0, 1));
    assert_eq!(engine.queued_items()[0].attempts, 1);

    let second = engine.drain_queue().await.expect("no concurrent drain");
    assert_eq!(second.dispatched, 1);
    assert_eq!(engine.queue_depth(), 0);
    assert!(engine.dead_letters().is_empty());
}

#[tokio::test(start_paused = true)]
async fn slow_dispatch_times_out() {
    let (engine, dispatcher) = engine_with_depth(10);
    dispatcher.delay("lighting", Duration::from_secs(60));
    engine
        .enqueue_action(lights(0), Priority::NORMAL)
        .expect("registered target");

    let report = engine.drain_queue().await.expect("no concurrent drain");
    assert_eq!(report.failed, 1);
    let item = &engine.queued_items()[0];
    assert_eq!(item.attempts, 1);
    assert!(item
        .last_error
        .as_deref()
        .expect("failure recorded")
        .contains("timed out"));
}

#[tokio::test(start_paused = true)]
async fn only_one_drain_at_a_time() {
    let (engine, dispatcher) = engine_with_depth(10);
    dispatcher.delay("lighting", Duration::from_millis(200));
    engine
        .enqueue_action(lights(0), Priority::NORMAL)
        .expect("registered target");

    let background = engine.clone();
    let first = tokio::spawn(async move { background.drain_queue().await });
    tokio::task::yield_now().await;

    assert_eq!(engine.drain_queue().await, Err(QueueError::DrainInProgress));

    let report = first
        .await
        .expect("drain task joins")
        .expect("first drain runs");
    assert_eq!(report.dispatched, 1);
    assert!(engine.drain_queue().await.is_ok());
}
