//! Execution benchmarks: backtracking search and dispatch.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use stackfsm_core::{CompiledMachine, ConsumeOptions, Machine};
use std::sync::Arc;

fn compile(rules: serde_json::Value) -> Arc<CompiledMachine> {
    Arc::new(CompiledMachine::from_json(&rules).unwrap())
}

/// Binary strings ending in `11`.
fn odd_binary() -> Arc<CompiledMachine> {
    compile(json!([
        {"tokens": [
            {"type": "state", "name": "s0", "initial": true},
            {"type": "transition", "label": "0", "direction": "r"},
            {"type": "state", "name": "s0"},
            {"type": "transition", "label": "1", "direction": "r"},
            {"type": "state", "name": "s0"},
            {"type": "transition", "label": "1", "direction": "r"},
            {"type": "state", "name": "s1", "accepting": true}
        ]}
    ]))
}

/// Balanced a^n b^n.
fn balanced() -> Arc<CompiledMachine> {
    compile(json!([
        {"tokens": [
            {"type": "state", "name": "q0", "initial": true},
            {"type": "transition", "label": "a", "direction": "r",
             "stack_ops": [{"read": "_", "write": "a"}]},
            {"type": "state", "name": "q0"}
        ]},
        {"tokens": [
            {"type": "state", "name": "q0"},
            {"type": "transition", "label": "_", "direction": "r"},
            {"type": "state", "name": "q1", "accepting": true}
        ]},
        {"tokens": [
            {"type": "state", "name": "q1"},
            {"type": "transition", "label": "b", "direction": "r",
             "stack_ops": [{"read": "a"}]},
            {"type": "state", "name": "q1"}
        ]}
    ]))
}

fn bench_consume_nfa(c: &mut Criterion) {
    let mut group = c.benchmark_group("consume_nfa");
    let definition = odd_binary();

    for len in [8, 32, 128] {
        let input: String = (0..len).map(|i| if i % 3 == 0 { '1' } else { '0' }).collect::<String>() + "11";
        let mut machine = Machine::new(Arc::clone(&definition));

        group.throughput(Throughput::Elements(input.len() as u64));
        group.bench_with_input(BenchmarkId::new("accept", len), &input, |b, input| {
            b.iter(|| {
                black_box(
                    machine
                        .consume_with(input.as_str(), ConsumeOptions::reset())
                        .in_accept_state(),
                )
            })
        });
    }

    group.finish();
}

fn bench_consume_pda(c: &mut Criterion) {
    let mut group = c.benchmark_group("consume_pda");
    let definition = balanced();

    for n in [4, 16, 64] {
        let accepted = format!("{}{}", "a".repeat(n), "b".repeat(n));
        let rejected = format!("{}{}", "a".repeat(n), "b".repeat(n + 1));
        let mut machine = Machine::new(Arc::clone(&definition));

        group.bench_with_input(BenchmarkId::new("accept", n), &accepted, |b, input| {
            b.iter(|| {
                black_box(
                    machine
                        .consume_with(input.as_str(), ConsumeOptions::reset())
                        .in_accept_state(),
                )
            })
        });

        group.bench_with_input(BenchmarkId::new("exhaust", n), &rejected, |b, input| {
            b.iter(|| {
                black_box(
                    machine
                        .consume_with(input.as_str(), ConsumeOptions::reset())
                        .in_accept_state(),
                )
            })
        });
    }

    group.finish();
}

fn bench_dispatch(c: &mut Criterion) {
    let definition = compile(json!([
        {"tokens": [
            {"type": "state", "name": "off", "initial": true},
            {"type": "transition", "label": "push", "direction": "lr"},
            {"type": "state", "name": "forward"},
            {"type": "transition", "label": "collide", "direction": "lr"},
            {"type": "state", "name": "backward"},
            {"type": "transition", "label": "push", "direction": "r"},
            {"type": "state", "name": "off"}
        ]}
    ]));
    let mut machine = Machine::new(definition);

    c.bench_function("dispatch_cycle", |b| {
        b.iter(|| {
            machine.dispatch("push").unwrap();
            machine.dispatch("collide").unwrap();
            machine.dispatch("push").unwrap();
            black_box(machine.state().len())
        })
    });
}

criterion_group!(benches, bench_consume_nfa, bench_consume_pda, bench_dispatch);
criterion_main!(benches);
