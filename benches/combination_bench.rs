// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Benchmarks for 2- and 3-sequence combination search, the heaviest-weighted
//! stage of the pipeline, across a range of candidate-pool sizes.
//!
//! Run with: cargo bench --bench combination_bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use num_bigint::BigInt;
use oeis_matcher::combination::{search_pairs, search_triples, CombinationSearchOptions};
use oeis_matcher::record::SequenceRecord;

fn make_candidates(n: usize, len: usize) -> Vec<SequenceRecord> {
    (0..n)
        .map(|i| {
            let terms: Vec<BigInt> = (0..len).map(|j| BigInt::from((i * 31 + j * 7 + 1) as i64)).collect();
            SequenceRecord::new(format!("A{i:06}"), terms, None, None)
        })
        .collect()
}

fn query_from(a: &SequenceRecord, b: &SequenceRecord, len: usize) -> Vec<BigInt> {
    (0..len).map(|i| &a.terms[i] + &b.terms[i]).collect()
}

fn bench_pairs(c: &mut Criterion) {
    let mut group = c.benchmark_group("combination_pairs");
    for &n in &[20usize, 80, 200] {
        let candidates = make_candidates(n, 10);
        let query = query_from(&candidates[0], &candidates[1], 10);
        let opts = CombinationSearchOptions::default();
        group.bench_with_input(BenchmarkId::new("pool_size", n), &n, |b, _| {
            b.iter(|| {
                let (results, _capped) = search_pairs(black_box(&query), 3, black_box(&candidates), black_box(&opts));
                black_box(results);
            });
        });
    }
    group.finish();
}

fn bench_triples(c: &mut Criterion) {
    let mut group = c.benchmark_group("combination_triples");
    for &n in &[12usize, 40, 100] {
        let candidates = make_candidates(n, 10);
        let mut query = query_from(&candidates[0], &candidates[1], 10);
        for (q, t) in query.iter_mut().zip(&candidates[2].terms) {
            *q += t;
        }
        let opts = CombinationSearchOptions::default_for_triples();
        group.bench_with_input(BenchmarkId::new("pool_size", n), &n, |b, _| {
            b.iter(|| {
                let (results, _capped) = search_triples(black_box(&query), 3, black_box(&candidates), black_box(&opts));
                black_box(results);
            });
        });
    }
    group.finish();
}

fn bench_rational_mode(c: &mut Criterion) {
    let mut group = c.benchmark_group("combination_rational");
    let candidates = make_candidates(80, 10);
    let query = query_from(&candidates[0], &candidates[1], 10);
    let mut opts = CombinationSearchOptions::default();
    opts.use_rational = true;
    group.bench_function("pool_80", |b| {
        b.iter(|| {
            let (results, _capped) = search_pairs(black_box(&query), 3, black_box(&candidates), black_box(&opts));
            black_box(results);
        });
    });
    group.finish();
}

criterion_group!(benches, bench_pairs, bench_triples, bench_rational_mode);
criterion_main!(benches);
