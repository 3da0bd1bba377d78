//! Benchmark: rule evaluation and conflict resolution cost
//!
//! # Background
//!
//! The rule-evaluation cycle matches every rule against a fresh context
//! and then scans matched pairs against the conflict table, which is
//! quadratic in the number of matches. These groups track how that
//! scales with rule count and with the share of rules that conflict.
//!
//! # When to revisit
//!
//! - If deployments routinely carry more than a few hundred rules
//! - If the evaluation interval drops well below one second

use conductor_runtime::rules::{Condition, ConflictTable, Context, Rule, RuleAction, RuleEngine};
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

const ACTIONS: &[&str] = &[
    "activate-cooling",
    "activate-heating",
    "lights-on",
    "lights-off",
    "lock-doors",
    "unlock-doors",
];

fn engine_with(count: usize, conflicting: bool) -> RuleEngine {
    let mut engine = RuleEngine::new(ConflictTable::with_defaults(), 100);
    for i in 0..count {
        let action = if conflicting {
            ACTIONS[i % ACTIONS.len()].to_string()
        } else {
            format!("action-{i}")
        };
        engine.add_rule(Rule::new(
            format!("rule-{i}"),
            (i % 10) as i64 + 1,
            Condition::All {
                conditions: vec![
                    Condition::SensorBelow {
                        sensor: "indoor_temp".into(),
                        value: 30.0,
                    },
                    Condition::Presence { present: true },
                ],
            },
            RuleAction::dispatch(format!("system-{}", i % 8), action),
        ));
    }
    engine
}

fn bench_evaluate(c: &mut Criterion) {
    let mut group = c.benchmark_group("rule_evaluation");
    let ctx = Context::from_millis(0)
        .with_sensor("indoor_temp", 21.0)
        .with_presence(true);

    for count in [10, 100, 500] {
        group.throughput(Throughput::Elements(count as u64));

        let mut independent = engine_with(count, false);
        group.bench_with_input(BenchmarkId::new("independent", count), &count, |b, _| {
            b.iter(|| black_box(independent.evaluate(&ctx, 0)));
        });

        let mut conflicting = engine_with(count, true);
        group.bench_with_input(BenchmarkId::new("conflicting", count), &count, |b, _| {
            b.iter(|| black_box(conflicting.evaluate(&ctx, 0)));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_evaluate);
criterion_main!(benches);
