//! Benchmarks for subscriber fan-out on a single property write.
//!
//! Run with: cargo bench -p mvvm-core --bench notify_bench

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use mvvm_core::{Object, Value, Watcher};
use serde_json::json;
use std::hint::black_box;

fn bench_notify_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("notify/fanout");

    for subscribers in [1usize, 16, 256] {
        let data = Object::from_json(json!({"user": {"name": "x"}})).expect("object");
        let watchers: Vec<Watcher> = (0..subscribers)
            .map(|_| Watcher::new(&data, "user.name", |_| Ok(())).expect("watcher"))
            .collect();
        let user = data.peek("user");
        let user = user.as_object().expect("object").clone();

        let mut flip = false;
        group.bench_with_input(
            BenchmarkId::from_parameter(subscribers),
            &subscribers,
            |b, _| {
                b.iter(|| {
                    flip = !flip;
                    let name = if flip { "a" } else { "b" };
                    user.set("name", black_box(Value::from(name))).expect("set");
                });
            },
        );
        drop(watchers);
    }

    group.finish();
}

fn bench_resolve_depth(c: &mut Criterion) {
    let data = Object::from_json(json!({"a": {"b": {"c": {"d": {"e": 1}}}}})).expect("object");
    c.bench_function("resolve/depth5", |b| {
        b.iter(|| mvvm_core::resolve(&data, black_box("a.b.c.d.e")).expect("resolve"));
    });
}

criterion_group!(benches, bench_notify_fanout, bench_resolve_depth);
criterion_main!(benches);
