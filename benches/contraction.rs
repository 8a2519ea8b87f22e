//! Benchmarks for incremental contraction maintenance.
//!
//! Measures the cost of pushing single-edge edits through an SCC level on a
//! chain workload, against the baseline of recontracting the level from
//! scratch after every edit.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use declevel::prelude::*;

/// A directed chain 0 -> 1 -> … -> n-1.
fn chain(n: i64) -> MultilevelGraph {
    MultilevelGraph::with_schemes(
        (0..n).map(|k| (k, Attributes::new())),
        (0..n - 1).map(|k| (k, k + 1, Attributes::new())),
        vec![Box::new(SccsScheme::new())],
    )
    .expect("chain construction")
}

/// Incrementally add and remove a back edge far down the chain; each pair
/// of edits collapses a long suffix into one component and splits it again.
fn bench_incremental_back_edge(c: &mut Criterion) {
    let mut ml = chain(1_000);
    ml.build_to(1).expect("initial build");

    c.bench_function("scc_incremental_back_edge_1k_chain", |b| {
        b.iter(|| {
            ml.add_edge(900, 800, Attributes::new()).expect("add");
            ml.build_to(1).expect("propagate add");
            ml.remove_edge(900, 800).expect("remove");
            ml.build_to(1).expect("propagate remove");
            black_box(ml.height());
        })
    });
}

/// The same edit pair answered by a full recontraction each time.
fn bench_full_rebuild_back_edge(c: &mut Criterion) {
    let mut ml = chain(1_000);
    ml.build_to(1).expect("initial build");

    c.bench_function("scc_full_rebuild_back_edge_1k_chain", |b| {
        b.iter(|| {
            ml.add_edge(900, 800, Attributes::new()).expect("add");
            ml.rebuild(1).expect("rebuild after add");
            ml.remove_edge(900, 800).expect("remove");
            ml.rebuild(1).expect("rebuild after remove");
            black_box(ml.height());
        })
    });
}

/// Cost of a deep structural copy of a built level.
fn bench_get_graph_deep_copy(c: &mut Criterion) {
    let mut ml = chain(1_000);
    ml.build_to(1).expect("initial build");

    c.bench_function("get_graph_deep_copy_1k_chain", |b| {
        b.iter(|| black_box(ml.get_graph(1).expect("deep copy")))
    });
}

criterion_group!(
    benches,
    bench_incremental_back_edge,
    bench_full_rebuild_back_edge,
    bench_get_graph_deep_copy
);
criterion_main!(benches);
