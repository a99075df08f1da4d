//! Performance benchmarks for the replicated structures.
//!
//! Covers local typing and deletion, replaying peer logs in causal and
//! reversed order (the latter exercises dependency buffering), resolving
//! anchors through tombstones, and register-map merges.
//!
//! Run with: cargo bench

use criterion::{BatchSize, BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};
use crdt_replica::{Crdt, Operation, OperationId, ReplicatedOrderedTree, ReplicatedRegisterMap};

fn typed(replica: &str, size: usize) -> ReplicatedOrderedTree<char> {
    let mut tree = ReplicatedOrderedTree::new(replica);
    let mut last = OperationId::ROOT;
    for i in 0..size {
        let ch = (b'A' + (i % 26) as u8) as char;
        last = tree.insert_after(&last, ch, "char").unwrap().id().clone();
    }
    tree
}

/// Benchmark sequential typing
fn bench_sequential_insertions(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_insertions");

    for size in [100, 1000, 5000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("insert_after", size), size, |b, &size| {
            b.iter(|| black_box(typed("A", size).text()));
        });
    }
    group.finish();
}

/// Benchmark tombstoning every node
fn bench_sequential_deletions(c: &mut Criterion) {
    let mut group = c.benchmark_group("sequential_deletions");

    for size in [100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::new("delete", size), size, |b, &size| {
            b.iter_batched(
                || {
                    let tree = typed("A", size);
                    let ids = tree.flatten();
                    (tree, ids)
                },
                |(mut tree, ids)| {
                    for id in &ids {
                        black_box(tree.delete(id).unwrap());
                    }
                    black_box(tree.text())
                },
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

/// Benchmark replaying a peer's log, in order and fully reversed
fn bench_log_replay(c: &mut Criterion) {
    let mut group = c.benchmark_group("log_replay");

    for size in [100, 1000].iter() {
        let log: Vec<Operation<char>> = typed("B", *size).operations().to_vec();
        let reversed: Vec<Operation<char>> = log.iter().rev().cloned().collect();
        group.throughput(Throughput::Elements(*size as u64));

        group.bench_with_input(BenchmarkId::new("causal_order", size), &log, |b, log| {
            b.iter(|| {
                let mut tree = ReplicatedOrderedTree::new("A");
                black_box(tree.execute_operations(log.iter().cloned(), |_, _| {}))
            });
        });
        group.bench_with_input(BenchmarkId::new("reversed_order", size), &reversed, |b, log| {
            b.iter(|| {
                let mut tree = ReplicatedOrderedTree::new("A");
                black_box(tree.execute_operations(log.iter().cloned(), |_, _| {}))
            });
        });
    }
    group.finish();
}

/// Benchmark concurrent editing: replicas type at the front, then merge
fn bench_concurrent_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("concurrent_merge");

    for replicas in [2usize, 5, 10].iter() {
        group.bench_with_input(
            BenchmarkId::new("replicas", replicas),
            replicas,
            |b, &replicas| {
                let trees: Vec<_> = (0..replicas)
                    .map(|r| typed(&format!("r{r}"), 100))
                    .collect();
                b.iter(|| {
                    let mut merged = ReplicatedOrderedTree::new("merged");
                    for tree in &trees {
                        merged.merge(tree);
                    }
                    black_box(merged.len())
                });
            },
        );
    }
    group.finish();
}

/// Benchmark anchor resolution across long tombstone runs
fn bench_tombstone_anchors(c: &mut Criterion) {
    let mut group = c.benchmark_group("tombstone_anchors");

    for size in [100, 1000].iter() {
        let mut tree = typed("A", *size);
        let ids = tree.flatten();
        for id in ids.iter().skip(1) {
            tree.delete(id).unwrap();
        }
        let last = ids.last().cloned();

        group.bench_with_input(BenchmarkId::new("get_active_id", size), &last, |b, last| {
            b.iter(|| black_box(tree.get_active_id(last.as_ref())));
        });
    }
    group.finish();
}

/// Benchmark register-map merges with many conflicting writes
fn bench_register_merge(c: &mut Criterion) {
    let mut group = c.benchmark_group("register_merge");

    for writes in [100, 1000].iter() {
        let mut a = ReplicatedRegisterMap::new("A");
        let mut b_map = ReplicatedRegisterMap::new("B");
        for i in 0..*writes {
            a.set(format!("shape-{}", i % 50), "x", i as i64);
            b_map.set(format!("shape-{}", i % 50), "x", -(i as i64));
        }

        group.throughput(Throughput::Elements(*writes as u64 * 2));
        group.bench_function(BenchmarkId::new("two_replicas", writes), |bencher| {
            bencher.iter(|| {
                let mut merged = ReplicatedRegisterMap::new("merged");
                merged.merge(&a);
                merged.merge(&b_map);
                black_box(merged.get("shape-0", "x").copied())
            });
        });
    }
    group.finish();
}

criterion_group!(
    benches,
    bench_sequential_insertions,
    bench_sequential_deletions,
    bench_log_replay,
    bench_concurrent_merge,
    bench_tombstone_anchors,
    bench_register_merge
);
criterion_main!(benches);
