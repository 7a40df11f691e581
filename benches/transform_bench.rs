// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for transform chain enumeration, the second heaviest-weighted
//! pipeline stage, across catalog size and chain depth.
//!
//! Run with: cargo bench --bench transform_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigInt;
use oeis_matcher::transforms::{default_catalog, search_chains, Transform};

fn query_terms(len: usize) -> Vec<BigInt> {
    (0..len).map(|i| BigInt::from((i * i + 1) as i64)).collect()
}

fn small_catalog() -> Vec<Transform> {
    vec![
        Transform::Scale(2),
        Transform::Scale(3),
        Transform::Shift(1),
        Transform::Diff(1),
        Transform::PartialSum,
        Transform::Abs,
    ]
}

fn bench_depth(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_depth");
    let terms = query_terms(12);
    let catalog = small_catalog();
    for &depth in &[1u32, 2, 3] {
        group.bench_with_input(BenchmarkId::new("small_catalog", depth), &depth, |b, &depth| {
            b.iter(|| {
                let results = search_chains(black_box(&catalog), depth, black_box(&terms), 3);
                black_box(results);
            });
        });
    }
    group.finish();
}

fn bench_catalog_size(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform_catalog_size");
    let terms = query_terms(12);
    let full = default_catalog();
    let small = small_catalog();
    group.bench_function("full_catalog_depth2", |b| {
        b.iter(|| {
            let results = search_chains(black_box(&full), 2, black_box(&terms), 3);
            black_box(results);
        });
    });
    group.bench_function("small_catalog_depth2", |b| {
        b.iter(|| {
            let results = search_chains(black_box(&small), 2, black_box(&terms), 3);
            black_box(results);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_depth, bench_catalog_size);
criterion_main!(benches);
