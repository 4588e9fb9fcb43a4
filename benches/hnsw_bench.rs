//! Benchmarks for graph construction and queries.
//!
//! Run with: cargo bench --bench hnsw_bench
//!
//! Point the `HNSW_BENCH_FVECS` environment variable at an fvecs file to
//! benchmark against a real dataset; otherwise seeded synthetic vectors
//! are used.


use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use data_loader::{generate_normalized_vectors, generate_random_vectors, load_fvecs};
use hnswlite::prelude::*;
use std::collections::HashSet;

const DIM: usize = 32;

/// Metric for the scaling group, from `HNSW_BENCH_METRIC` if set
/// ("cosine" or "euclidean").
fn bench_metric() -> Metric {
    std::env::var("HNSW_BENCH_METRIC")
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(Metric::Euclidean)
}

fn dataset(count: usize) -> Vec<Vec<f32>> {
    if let Ok(path) = std::env::var("HNSW_BENCH_FVECS") {
        if let Ok(mut vectors) = load_fvecs(std::path::Path::new(&path)) {
            vectors.truncate(count);
            if !vectors.is_empty() {
                return vectors;
            }
        }
        eprintln!("could not read {path}, falling back to synthetic data");
    }
    generate_random_vectors(count, DIM, 42)
}

fn build_graph(vectors: &[Vec<f32>], m: usize, ef_construction: usize) -> HnswGraph<f32> {
    let params = HnswParams::new(Metric::Euclidean)
        .with_m(m)
        .with_ef_construction(ef_construction)
        .with_seed(7);
    let mut graph = HnswGraph::<f32>::new(params).unwrap();
    for (i, v) in vectors.iter().enumerate() {
        graph.add_point(i as LabelType, v).unwrap();
    }
    graph
}

/// Exhaustive top-k ids, used for the recall report.
fn brute_force_ids(vectors: &[Vec<f32>], query: &[f32], k: usize) -> Vec<LabelType> {
    let mut scored: Vec<(usize, f32)> = vectors
        .iter()
        .enumerate()
        .map(|(i, v)| {
            let d2: f32 = v.iter().zip(query).map(|(a, b)| (a - b) * (a - b)).sum();
            (i, d2)
        })
        .collect();
    scored.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.into_iter().take(k).map(|(i, _)| i as LabelType).collect()
}

/// Benchmark insertion throughput at several graph sizes.
fn bench_build(c: &mut Criterion) {
    let mut group = c.benchmark_group("build");
    group.sample_size(10);

    for size in [500, 1000, 2000] {
        let vectors = dataset(size);
        group.throughput(Throughput::Elements(size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| build_graph(black_box(&vectors), 16, 100));
        });
    }

    group.finish();
}

/// Benchmark construction with varying M.
fn bench_build_varying_m(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_m");
    group.sample_size(10);

    let vectors = dataset(1000);
    for m in [4, 8, 16, 32] {
        group.throughput(Throughput::Elements(vectors.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(m), &m, |b, &m| {
            b.iter(|| build_graph(black_box(&vectors), m, 100));
        });
    }

    group.finish();
}

/// Benchmark construction with varying ef_construction.
fn bench_build_varying_ef(c: &mut Criterion) {
    let mut group = c.benchmark_group("build_ef_construction");
    group.sample_size(10);

    let vectors = dataset(1000);
    for ef in [50, 100, 200, 400] {
        group.throughput(Throughput::Elements(vectors.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(ef), &ef, |b, &ef| {
            b.iter(|| build_graph(black_box(&vectors), 16, ef));
        });
    }

    group.finish();
}

/// Benchmark query latency with varying ef_search, reporting recall@10
/// against brute force once per configuration.
fn bench_query_varying_ef(c: &mut Criterion) {
    let mut group = c.benchmark_group("query_ef_search");

    let vectors = dataset(5000);
    let graph = build_graph(&vectors, 16, 200);
    let queries = generate_random_vectors(100, vectors[0].len(), 777);

    for ef in [10, 50, 100, 200] {
        // Recall report alongside the latency numbers.
        let mut hits = 0usize;
        let mut expected = 0usize;
        for query in &queries {
            let truth: HashSet<LabelType> =
                brute_force_ids(&vectors, query, 10).into_iter().collect();
            let found = graph
                .search_knn(query, 10, Some(&QueryParams::new().with_ef_search(ef)))
                .unwrap();
            hits += found.iter().filter(|n| truth.contains(&n.id)).count();
            expected += truth.len();
        }
        eprintln!(
            "ef_search={ef}: recall@10 = {:.3}",
            hits as f64 / expected as f64
        );

        let params = QueryParams::new().with_ef_search(ef);
        group.bench_with_input(BenchmarkId::from_parameter(ef), &ef, |b, _| {
            let mut i = 0usize;
            b.iter(|| {
                i = (i + 1) % queries.len();
                graph
                    .search_knn(black_box(&queries[i]), black_box(10), Some(&params))
                    .unwrap()
            });
        });
    }

    group.finish();
}

/// Benchmark query latency at several graph sizes.
fn bench_query_scaling(c: &mut Criterion) {
    let metric = bench_metric();
    let mut group = c.benchmark_group(format!("query_scaling_{metric}"));

    for size in [1000, 5000, 10000] {
        let vectors = match metric {
            Metric::Cosine => generate_normalized_vectors(size, DIM, 42),
            Metric::Euclidean => dataset(size),
        };
        let params = HnswParams::new(metric)
            .with_m(16)
            .with_ef_construction(100)
            .with_seed(7);
        let mut graph = HnswGraph::<f32>::new(params).unwrap();
        for (i, v) in vectors.iter().enumerate() {
            graph.add_point(i as LabelType, v).unwrap();
        }
        let query = generate_random_vectors(1, vectors[0].len(), 5).pop().unwrap();

        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, _| {
            b.iter(|| graph.search_knn(black_box(&query), black_box(10), None).unwrap());
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_build,
    bench_build_varying_m,
    bench_build_varying_ef,
    bench_query_varying_ef,
    bench_query_scaling
);
criterion_main!(benches);
