//! Benchmark for the dependency-scheduled pipeline
//!
//! Measures time breakdown:
//! - Graph construction (validation + adjacency wiring)
//! - Full pipeline runs over no-op components (pure scheduling overhead)
//!
//! Run with:
//! ```bash
//! cargo bench --bench pipeline_bench
//! ```

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use std::sync::Arc;
use transcript_suite_core::{
    Component, DependencyGraph, DependencyResults, Payload, Pipeline, TaskError,
};

struct NoOp;

impl Component<()> for NoOp {
    fn execute(&self, _deps: &DependencyResults, _args: &()) -> Result<Payload, TaskError> {
        Ok(Payload::Empty)
    }
}

/// `len` components in a single dependency chain
fn chain_entries(len: usize) -> Vec<(String, Vec<String>)> {
    (0..len)
        .map(|i| {
            let deps = if i == 0 {
                Vec::new()
            } else {
                vec![format!("node_{}", i - 1)]
            };
            (format!("node_{i}"), deps)
        })
        .collect()
}

/// `layers` layers of `width` components, each depending on the whole
/// previous layer
fn layered_entries(layers: usize, width: usize) -> Vec<(String, Vec<String>)> {
    let mut entries = Vec::with_capacity(layers * width);
    for layer in 0..layers {
        let parents: Vec<String> = if layer == 0 {
            Vec::new()
        } else {
            (0..width)
                .map(|i| format!("node_{}_{}", layer - 1, i))
                .collect()
        };
        for i in 0..width {
            entries.push((format!("node_{layer}_{i}"), parents.clone()));
        }
    }
    entries
}

fn benchmark_graph_build(c: &mut Criterion) {
    let chain = chain_entries(64);
    c.bench_function("graph_build_chain_64", |b| {
        b.iter(|| {
            let graph = DependencyGraph::build(black_box(&chain)).expect("Failed to build graph");
            black_box(graph);
        })
    });

    let layered = layered_entries(8, 8);
    c.bench_function("graph_build_layered_8x8", |b| {
        b.iter(|| {
            let graph =
                DependencyGraph::build(black_box(&layered)).expect("Failed to build graph");
            black_box(graph);
        })
    });
}

fn noop_pipeline(entries: &[(String, Vec<String>)], workers: usize) -> Pipeline<()> {
    let mut pipeline = Pipeline::with_workers(workers);
    for (name, deps) in entries {
        pipeline
            .register(name, deps, Arc::new(NoOp))
            .expect("Failed to register component");
    }
    pipeline
}

fn benchmark_pipeline_run(c: &mut Criterion) {
    // Wide fan-out: 32 independent components, one layer.
    let wide: Vec<(String, Vec<String>)> = (0..32)
        .map(|i| (format!("node_{i}"), Vec::new()))
        .collect();
    let mut wide_pipeline = noop_pipeline(&wide, 4);
    c.bench_function("pipeline_run_wide_32_workers_4", |b| {
        b.iter(|| {
            let states = wide_pipeline
                .run(black_box(Payload::Empty), ())
                .expect("Run failed");
            black_box(states);
        })
    });

    // Deep chain: strictly sequential layers.
    let chain = chain_entries(16);
    let mut chain_pipeline = noop_pipeline(&chain, 4);
    c.bench_function("pipeline_run_chain_16_workers_4", |b| {
        b.iter(|| {
            let states = chain_pipeline
                .run(black_box(Payload::Empty), ())
                .expect("Run failed");
            black_box(states);
        })
    });

    // Layered fan-in/fan-out with a single worker as the serial baseline.
    let layered = layered_entries(4, 4);
    let mut serial_pipeline = noop_pipeline(&layered, 1);
    c.bench_function("pipeline_run_layered_4x4_workers_1", |b| {
        b.iter(|| {
            let states = serial_pipeline
                .run(black_box(Payload::Empty), ())
                .expect("Run failed");
            black_box(states);
        })
    });

    let mut parallel_pipeline = noop_pipeline(&layered, 4);
    c.bench_function("pipeline_run_layered_4x4_workers_4", |b| {
        b.iter(|| {
            let states = parallel_pipeline
                .run(black_box(Payload::Empty), ())
                .expect("Run failed");
            black_box(states);
        })
    });
}

criterion_group!(benches, benchmark_graph_build, benchmark_pipeline_run);
criterion_main!(benches);
