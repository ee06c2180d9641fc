//! Emit and traversal throughput.
//!
//! Run with:
//! ```sh
//! cargo bench --bench store
//! ```

use celestial_core::{EventId, NewEvent, Store, View};
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const SIZES: [usize; 3] = [1_000, 10_000, 50_000];

/// A ladder of stacked diamonds: every rung forks in two and merges again.
fn ladder(rungs: usize) -> Store {
    let store = Store::new();
    let mut tip = emit(&store, &[]);
    for _ in 0..rungs {
        let left = emit(&store, &[tip]);
        let right = emit(&store, &[tip]);
        tip = emit(&store, &[left, right]);
    }
    store
}

fn emit(store: &Store, parents: &[EventId]) -> EventId {
    store
        .emit(NewEvent::new("bench").with_parents(parents.iter().copied()))
        .map(|event| event.id)
        .unwrap_or_default()
}

fn bench_emit(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.emit");
    for size in SIZES {
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter(|| {
                let store = Store::new();
                let mut prev = emit(&store, &[]);
                for _ in 1..size {
                    prev = emit(&store, &[prev]);
                }
                black_box(store.len())
            });
        });
    }
    group.finish();
}

fn bench_traversal(c: &mut Criterion) {
    let mut group = c.benchmark_group("store.traverse");
    for rungs in [100, 1_000] {
        let store = ladder(rungs);
        let tip = store.len() as EventId;
        group.bench_with_input(BenchmarkId::new("descendants", rungs), &store, |b, store| {
            b.iter(|| black_box(store.descendants(1, View::Struct)));
        });
        group.bench_with_input(BenchmarkId::new("provenance_meta", rungs), &store, |b, store| {
            b.iter(|| black_box(store.provenance(tip, View::Meta)));
        });
        group.bench_with_input(BenchmarkId::new("ancestors", rungs), &store, |b, store| {
            b.iter(|| black_box(store.ancestors(tip)));
        });
    }
    group.finish();
}

criterion_group!(benches, bench_emit, bench_traversal);
criterion_main!(benches);
