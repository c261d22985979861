//! Rule graph execution benchmarks
//!
//! Measures the cost of running representative graphs synchronously and
//! asynchronously, including nested graphs over collections.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rulegraph::prelude::*;
use std::sync::Arc;

#[derive(Clone)]
struct Item {
    sku: String,
    note: Option<String>,
}

struct Order {
    reference: String,
    status: String,
    items: Vec<Item>,
}

fn order(items: usize, valid: bool) -> Order {
    let sku = if valid { "SKU-0001" } else { "BAD" };
    Order {
        reference: "ORD-2024-0001".to_string(),
        status: "pending".to_string(),
        items: (0..items)
            .map(|_| Item {
                sku: sku.to_string(),
                note: None,
            })
            .collect(),
    }
}

fn item_graph() -> Arc<RuleGraph<Item>> {
    let mut graph = RuleGraph::new();
    graph
        .rule_for("sku", |i: &Item| i.sku.clone())
        .not_empty()
        .exact_length(8);
    graph
        .rule_for("note", |i: &Item| i.note.clone())
        .max_length(200);
    Arc::new(graph)
}

fn order_graph() -> RuleGraph<Order> {
    let mut graph = RuleGraph::new();
    graph
        .rule_for("reference", |o: &Order| o.reference.clone())
        .not_empty()
        .length(4, 32)
        .expect("valid bounds");
    graph
        .rule_for("status", |o: &Order| o.status.clone())
        .is_enum_name(["pending", "paid", "shipped"], false)
        .expect("non-empty names");
    graph
        .rule_for_each("items", |o: &Order| o.items.clone())
        .set_validator(item_graph());
    graph
}

/// Benchmark a flat graph without nested rules
fn bench_flat_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("flat_graph");
    let graph = order_graph();
    let subject = order(0, true);

    group.bench_function("valid", |b| b.iter(|| graph.validate(black_box(&subject))));

    let mut invalid = order(0, true);
    invalid.reference = String::new();
    group.bench_function("invalid", |b| b.iter(|| graph.validate(black_box(&invalid))));

    group.finish();
}

/// Benchmark nested graphs over growing collections
fn bench_collection_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("collection_graph");
    let graph = order_graph();

    for items in [1usize, 10, 100] {
        let valid = order(items, true);
        let invalid = order(items, false);

        group.bench_with_input(BenchmarkId::new("valid", items), &valid, |b, subject| {
            b.iter(|| graph.validate(black_box(subject)))
        });
        group.bench_with_input(BenchmarkId::new("invalid", items), &invalid, |b, subject| {
            b.iter(|| graph.validate(black_box(subject)))
        });
    }

    group.finish();
}

/// Benchmark the async path on a current-thread runtime
fn bench_async_graph(c: &mut Criterion) {
    let mut group = c.benchmark_group("async_graph");
    let runtime = tokio::runtime::Builder::new_current_thread()
        .build()
        .expect("runtime");
    let graph = order_graph();
    let subject = order(10, true);

    group.bench_function("sync_10_items", |b| b.iter(|| graph.validate(black_box(&subject))));
    group.bench_function("async_10_items", |b| {
        b.iter(|| runtime.block_on(graph.validate_async(black_box(&subject))))
    });

    group.finish();
}

criterion_group!(benches, bench_flat_graph, bench_collection_graph, bench_async_graph);
criterion_main!(benches);
