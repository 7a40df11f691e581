// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Combination search: is the query an integer (or rational) linear
//! combination of 2 or 3 known sequences, under per-component transforms and
//! small index shifts? (spec section 4.6, the hottest loop)
//!
//! Bounded on every axis that could otherwise blow up: candidate count,
//! coefficient-tuple evaluations, wall-clock, and total matches recorded. All
//! caps are soft — the in-flight evaluation always finishes, only the *next*
//! one is skipped once a cap trips (spec section 5).

use crate::record::SequenceRecord;
use crate::transforms::Transform;
use num_bigint::BigInt;
use num_rational::BigRational;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

/// Per-component transform allowed in combination search (spec section 4.6:
/// "extensible" set, currently `{Id, Diff, PartialSum}`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ComponentTransform {
    Id,
    Diff,
    PartialSum,
}

impl ComponentTransform {
    pub fn weight(&self) -> f64 {
        match self {
            ComponentTransform::Id => 0.0,
            ComponentTransform::Diff => 1.2,
            ComponentTransform::PartialSum => 1.1,
        }
    }

    pub fn apply(&self, terms: &[BigInt]) -> Vec<BigInt> {
        match self {
            ComponentTransform::Id => terms.to_vec(),
            ComponentTransform::Diff => Transform::Diff(1).apply(terms),
            ComponentTransform::PartialSum => Transform::PartialSum.apply(terms),
        }
    }

    fn label(&self) -> &'static str {
        match self {
            ComponentTransform::Id => "Id",
            ComponentTransform::Diff => "Diff",
            ComponentTransform::PartialSum => "PartialSum",
        }
    }

    fn latex_label(&self) -> &'static str {
        match self {
            ComponentTransform::Id => "",
            ComponentTransform::Diff => "\\Delta",
            ComponentTransform::PartialSum => "\\mathrm{psum}",
        }
    }
}

/// A coefficient, integer or exact rational (spec section 4.6).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Coeff {
    Int(i64),
    Rational(i64, i64), // numerator, denominator > 0, already reduced
}

impl Coeff {
    fn abs_f64(&self) -> f64 {
        match self {
            Coeff::Int(v) => (*v as f64).abs(),
            Coeff::Rational(n, d) => (*n as f64 / *d as f64).abs(),
        }
    }

    fn is_zero(&self) -> bool {
        matches!(self, Coeff::Int(0)) || matches!(self, Coeff::Rational(0, _))
    }

    fn format(&self) -> String {
        match self {
            Coeff::Int(v) => v.to_string(),
            Coeff::Rational(n, 1) => n.to_string(),
            Coeff::Rational(n, d) => format!("{n}/{d}"),
        }
    }

    fn format_latex(&self) -> String {
        match self {
            Coeff::Int(v) => v.to_string(),
            Coeff::Rational(n, 1) => n.to_string(),
            Coeff::Rational(n, d) => {
                if *n < 0 {
                    format!("-\\tfrac{{{}}}{{{d}}}", -n)
                } else {
                    format!("\\tfrac{{{n}}}{{{d}}}")
                }
            }
        }
    }

    fn has_denominator(&self) -> bool {
        matches!(self, Coeff::Rational(_, d) if *d != 1)
    }
}

/// A found combination (spec section 3/4.6).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CombinationMatch {
    pub ids: Vec<String>,
    pub component_transforms: Vec<ComponentTransform>,
    pub coeffs: Vec<Coeff>,
    pub shifts: Vec<i64>,
    pub length: usize,
    pub score: f64,
    pub complexity: f64,
    pub expression: String,
    pub latex: String,
}

/// Tuning knobs for `search` (spec section 4.6, plus the section B
/// post-filters supplementing the distilled spec).
#[derive(Debug, Clone)]
pub struct CombinationSearchOptions {
    pub coeffs: Vec<i64>,
    pub max_shift: i64,
    pub max_shift_back: i64,
    pub component_transforms: Vec<ComponentTransform>,
    pub max_candidates: usize,
    pub max_checks: u64,
    pub max_time: Duration,
    pub max_combinations: usize,
    pub use_rational: bool,
    pub coeff_bound: i64,
    /// Optional post-filter floor on `score` (section B, off by default).
    pub min_score: Option<f64>,
    /// Optional post-filter ceiling on `complexity` (section B, off by default).
    pub max_complexity: Option<f64>,
}

impl Default for CombinationSearchOptions {
    fn default() -> Self {
        CombinationSearchOptions {
            coeffs: vec![-3, -2, -1, 1, 2, 3],
            max_shift: 2,
            max_shift_back: 2,
            component_transforms: vec![ComponentTransform::Id, ComponentTransform::Diff, ComponentTransform::PartialSum],
            max_candidates: 200,
            max_checks: 200_000,
            max_time: Duration::from_secs(2),
            max_combinations: 50,
            use_rational: false,
            coeff_bound: 100,
            min_score: None,
            max_complexity: None,
        }
    }
}

impl CombinationSearchOptions {
    /// The 3-sequence default coefficient set is narrower (spec section 4.6).
    pub fn default_for_triples() -> Self {
        CombinationSearchOptions {
            coeffs: vec![-2, -1, 1, 2],
            ..Default::default()
        }
    }
}

struct Budget {
    started: Instant,
    checks: u64,
    max_checks: u64,
    max_time: Duration,
    tripped: bool,
}

impl Budget {
    fn new(max_checks: u64, max_time: Duration) -> Self {
        Budget { started: Instant::now(), checks: 0, max_checks, max_time, tripped: false }
    }

    /// Call before each coefficient-tuple evaluation. Returns `false` once
    /// tripped; a tripped budget stays tripped for the rest of the search.
    fn tick(&mut self) -> bool {
        if self.tripped {
            return false;
        }
        if self.started.elapsed() >= self.max_time {
            self.tripped = true;
            return false;
        }
        self.checks += 1;
        if self.checks > self.max_checks {
            self.tripped = true;
            return false;
        }
        true
    }
}

/// All k-subsets of `0..n`, in ascending lexicographic order of indices.
fn k_subsets(n: usize, k: usize) -> Vec<Vec<usize>> {
    let mut out = Vec::new();
    if k == 0 || k > n {
        return out;
    }
    let mut combo: Vec<usize> = (0..k).collect();
    loop {
        out.push(combo.clone());
        let mut i = k;
        loop {
            if i == 0 {
                return out;
            }
            i -= 1;
            if combo[i] != i + n - k {
                break;
            }
            if i == 0 {
                return out;
            }
        }
        combo[i] += 1;
        for j in i + 1..k {
            combo[j] = combo[j - 1] + 1;
        }
    }
}

/// Cartesian product of `k` copies of `pool`, in pool order (spec section 5:
/// "coefficient tuples in the given catalog's declared order").
fn cartesian_power<T: Clone>(pool: &[T], k: usize) -> Vec<Vec<T>> {
    let mut out: Vec<Vec<T>> = vec![Vec::new()];
    for _ in 0..k {
        let mut next = Vec::with_capacity(out.len() * pool.len());
        for prefix in &out {
            for item in pool {
                let mut v = prefix.clone();
                v.push(item.clone());
                next.push(v);
            }
        }
        out = next;
    }
    out
}

/// Aligned slices for a shift tuple: returns `(component slices, query slice
/// start, length)`, or `None` if alignment fails (spec section 4.6).
fn align(seqs: &[Vec<BigInt>], shifts: &[i64], query_len: usize, min_match_length: usize) -> Option<(Vec<&[BigInt]>, usize, usize)> {
    let all_nonneg = shifts.iter().all(|&s| s >= 0);
    if all_nonneg {
        let mut slices = Vec::with_capacity(seqs.len());
        for (seq, &s) in seqs.iter().zip(shifts) {
            let s = s as usize;
            if seq.len() < s || seq.len() - s < query_len {
                return None;
            }
            slices.push(&seq[s..s + query_len]);
        }
        Some((slices, 0, query_len))
    } else {
        let n_min = shifts.iter().map(|&s| (-s).max(0)).max().unwrap_or(0) as usize;
        let mut n_max = query_len as i64;
        for (seq, &s) in seqs.iter().zip(shifts) {
            let bound = seq.len() as i64 - s;
            n_max = n_max.min(bound);
        }
        let l = n_max - n_min as i64;
        if l <= 0 || (l as usize) < min_match_length {
            return None;
        }
        let l = l as usize;
        let mut slices = Vec::with_capacity(seqs.len());
        for (seq, &s) in seqs.iter().zip(shifts) {
            let start = (n_min as i64 + s) as usize;
            slices.push(&seq[start..start + l]);
        }
        Some((slices, n_min, l))
    }
}

fn popularity_bonus(records: &[&SequenceRecord]) -> f64 {
    const WEIGHTS: &[(&str, f64)] = &[("core", 1.0), ("nice", 0.6), ("easy", 0.3), ("hard", 0.2), ("nonn", 0.1)];
    let mut total = 0.0;
    for rec in records {
        if let Some(kws) = &rec.keywords {
            for (kw, w) in WEIGHTS {
                if kws.contains(*kw) {
                    total += w;
                }
            }
        }
    }
    total
}

fn complexity_of(coeffs: &[Coeff], shifts: &[i64], transforms: &[ComponentTransform]) -> f64 {
    let k = coeffs.len();
    let coeff_sum: f64 = coeffs.iter().map(Coeff::abs_f64).sum();
    let shift_sum: f64 = shifts.iter().map(|s| s.unsigned_abs() as f64).sum();
    let extra_k = 0.5 * (k as f64 - 2.0).max(0.0);
    let transform_sum: f64 = transforms.iter().map(ComponentTransform::weight).sum();
    coeff_sum + 0.5 * shift_sum + extra_k + transform_sum
}

fn format_expression(ids: &[String], transforms: &[ComponentTransform], coeffs: &[Coeff], shifts: &[i64]) -> String {
    let mut parts = Vec::new();
    for i in 0..ids.len() {
        let shift_str = match shifts[i].cmp(&0) {
            std::cmp::Ordering::Equal => "n".to_string(),
            std::cmp::Ordering::Greater => format!("n+{}", shifts[i]),
            std::cmp::Ordering::Less => format!("n{}", shifts[i]),
        };
        let body = format!("A_{}({})", ids[i], shift_str);
        let wrapped = match transforms[i] {
            ComponentTransform::Id => body,
            other => format!("{}({})", other.label(), body),
        };
        parts.push(format!("{}*{}", coeffs[i].format(), wrapped));
    }
    format!("a(n) = {}", parts.join(" + "))
}

fn format_latex(ids: &[String], transforms: &[ComponentTransform], coeffs: &[Coeff], shifts: &[i64]) -> String {
    let mut parts = Vec::new();
    for i in 0..ids.len() {
        let shift_str = match shifts[i].cmp(&0) {
            std::cmp::Ordering::Equal => "n".to_string(),
            std::cmp::Ordering::Greater => format!("n+{}", shifts[i]),
            std::cmp::Ordering::Less => format!("n{}", shifts[i]),
        };
        let body = format!("a_{{{}}}({})", ids[i], shift_str);
        let wrapped = match transforms[i] {
            ComponentTransform::Id => body,
            other => format!("{}({})", other.latex_label(), body),
        };
        parts.push(format!("{}\\,{}", coeffs[i].format_latex(), wrapped));
    }
    format!("a(n) = {}", parts.join(" + "))
}

/// `n x n` determinant by cofactor expansion along the first row. `n <= 3`
/// in practice (2- and 3-sequence combinations only).
fn determinant(matrix: &[Vec<BigInt>]) -> BigInt {
    let n = matrix.len();
    if n == 1 {
        return matrix[0][0].clone();
    }
    let mut det = BigInt::zero();
    let mut sign = 1i64;
    for col in 0..n {
        let minor: Vec<Vec<BigInt>> = matrix[1..]
            .iter()
            .map(|row| {
                row.iter()
                    .enumerate()
                    .filter(|(c, _)| *c != col)
                    .map(|(_, v)| v.clone())
                    .collect()
            })
            .collect();
        det += BigInt::from(sign) * &matrix[0][col] * determinant(&minor);
        sign = -sign;
    }
    det
}

/// Exact rational solve for the k unknown coefficients from the first `k`
/// aligned positions, via Cramer's rule (spec section 4.6). Returns `None` if
/// the system is singular or any coefficient exceeds `coeff_bound`.
fn solve_rational(slices: &[&[BigInt]], query_slice: &[BigInt], coeff_bound: i64) -> Option<Vec<BigRational>> {
    let k = slices.len();
    if query_slice.len() < k {
        return None;
    }
    let a: Vec<Vec<BigInt>> = (0..k).map(|row| (0..k).map(|col| slices[col][row].clone()).collect()).collect();
    let b: Vec<BigInt> = (0..k).map(|row| query_slice[row].clone()).collect();

    let det_a = determinant(&a);
    if det_a.is_zero() {
        return None;
    }

    let mut coeffs = Vec::with_capacity(k);
    for col in 0..k {
        let mut a_col = a.clone();
        for row in 0..k {
            a_col[row][col] = b[row].clone();
        }
        let det_col = determinant(&a_col);
        let rational = BigRational::new(det_col, det_a.clone());
        let bound = BigInt::from(coeff_bound);
        if rational.numer().abs() > bound || *rational.denom() > bound {
            return None;
        }
        coeffs.push(rational);
    }
    Some(coeffs)
}

fn verify_rational(slices: &[&[BigInt]], query_slice: &[BigInt], coeffs: &[BigRational]) -> bool {
    for pos in 0..query_slice.len() {
        let mut sum = BigRational::from_integer(BigInt::zero());
        for (slice, c) in slices.iter().zip(coeffs) {
            sum += c * BigRational::from_integer(slice[pos].clone());
        }
        if sum != BigRational::from_integer(query_slice[pos].clone()) {
            return false;
        }
    }
    true
}

fn to_coeff_vec(rationals: &[BigRational]) -> Vec<Coeff> {
    rationals
        .iter()
        .map(|r| {
            if r.is_integer() {
                Coeff::Int(r.numer().clone().to_string().parse().unwrap_or(0))
            } else {
                let n: i64 = r.numer().to_string().parse().unwrap_or(0);
                let d: i64 = r.denom().to_string().parse().unwrap_or(1);
                Coeff::Rational(n, d)
            }
        })
        .collect()
}

/// Search for k-sequence (`k = candidate_subset.len()`) combinations matching
/// `query_terms`. Shared implementation for both `search_pairs` and
/// `search_triples`.
fn search_k(query_terms: &[BigInt], min_match_length: usize, candidates: &[SequenceRecord], k: usize, opts: &CombinationSearchOptions) -> (Vec<CombinationMatch>, bool) {
    let mut sorted_candidates: Vec<&SequenceRecord> = candidates.iter().collect();
    sorted_candidates.sort_by(|a, b| a.id.cmp(&b.id));
    sorted_candidates.truncate(opts.max_candidates);

    let shift_range: Vec<i64> = (-opts.max_shift_back..=opts.max_shift).collect();
    let shift_tuples = cartesian_power(&shift_range, k);
    let transform_tuples = cartesian_power(&opts.component_transforms, k);
    let coeff_tuples = if opts.use_rational { Vec::new() } else { cartesian_power(&opts.coeffs, k) };

    let mut budget = Budget::new(opts.max_checks, opts.max_time);
    let mut seen = std::collections::HashSet::new();
    let mut results = Vec::new();
    let mut combinations_capped = false;

    'subsets: for subset in k_subsets(sorted_candidates.len(), k) {
        let recs: Vec<&SequenceRecord> = subset.iter().map(|&i| sorted_candidates[i]).collect();
        let ids: Vec<String> = recs.iter().map(|r| r.id.clone()).collect();

        for transforms in &transform_tuples {
            let seqs: Vec<Vec<BigInt>> = recs.iter().zip(transforms).map(|(r, t)| t.apply(&r.terms)).collect();
            if seqs.iter().any(|s| s.is_empty()) {
                continue;
            }

            for shifts in &shift_tuples {
                let Some((slices, q_start, length)) = align(&seqs, shifts, query_terms.len(), min_match_length) else {
                    continue;
                };
                let query_slice = &query_terms[q_start..q_start + length];

                if opts.use_rational {
                    if !budget.tick() {
                        combinations_capped = true;
                        break 'subsets;
                    }
                    let Some(rational_coeffs) = solve_rational(&slices, query_slice, opts.coeff_bound) else {
                        continue;
                    };
                    if rational_coeffs.iter().all(|c| c.is_zero()) {
                        continue;
                    }
                    if !verify_rational(&slices, query_slice, &rational_coeffs) {
                        continue;
                    }
                    let coeffs = to_coeff_vec(&rational_coeffs);
                    record_match(&mut results, &mut seen, opts, &ids, transforms, &coeffs, shifts, length, &recs);
                    if results.len() >= opts.max_combinations {
                        combinations_capped = true;
                        break 'subsets;
                    }
                } else {
                    for coeffs_i64 in &coeff_tuples {
                        if !budget.tick() {
                            combinations_capped = true;
                            break 'subsets;
                        }
                        if coeffs_i64.iter().all(|&c| c == 0) {
                            continue;
                        }
                        let mut ok = true;
                        for pos in 0..length {
                            let mut sum = BigInt::zero();
                            for (slice, &c) in slices.iter().zip(coeffs_i64) {
                                sum += BigInt::from(c) * &slice[pos];
                            }
                            if sum != query_slice[pos] {
                                ok = false;
                                break;
                            }
                        }
                        if !ok {
                            continue;
                        }
                        let coeffs: Vec<Coeff> = coeffs_i64.iter().map(|&c| Coeff::Int(c)).collect();
                        record_match(&mut results, &mut seen, opts, &ids, transforms, &coeffs, shifts, length, &recs);
                        if results.len() >= opts.max_combinations {
                            combinations_capped = true;
                            break 'subsets;
                        }
                    }
                }
            }
        }
    }

    results.sort_by(|a: &CombinationMatch, b: &CombinationMatch| {
        b.score
            .partial_cmp(&a.score)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.complexity.partial_cmp(&b.complexity).unwrap_or(std::cmp::Ordering::Equal))
            .then(b.length.cmp(&a.length))
            .then(a.ids.cmp(&b.ids))
    });
    (results, combinations_capped)
}

#[allow(clippy::too_many_arguments)]
fn record_match(
    results: &mut Vec<CombinationMatch>,
    seen: &mut std::collections::HashSet<String>,
    opts: &CombinationSearchOptions,
    ids: &[String],
    transforms: &[ComponentTransform],
    coeffs: &[Coeff],
    shifts: &[i64],
    length: usize,
    recs: &[&SequenceRecord],
) {
    if coeffs.iter().all(Coeff::is_zero) {
        return;
    }
    let complexity = complexity_of(coeffs, shifts, transforms);
    if let Some(max_c) = opts.max_complexity {
        if complexity > max_c {
            return;
        }
    }
    let bonus = popularity_bonus(recs);
    let score = length as f64 / (1.0 + complexity) * (1.0 + 0.1 * bonus);
    if let Some(min_s) = opts.min_score {
        if score < min_s {
            return;
        }
    }

    let dedup_key = format!(
        "{}|{}|{}|{}",
        ids.join(","),
        transforms.iter().map(|t| t.label()).collect::<Vec<_>>().join(","),
        coeffs.iter().map(Coeff::format).collect::<Vec<_>>().join(","),
        shifts.iter().map(|s| s.to_string()).collect::<Vec<_>>().join(","),
    );
    if !seen.insert(dedup_key) {
        return;
    }

    let expression = format_expression(ids, transforms, coeffs, shifts);
    let latex = format_latex(ids, transforms, coeffs, shifts);
    results.push(CombinationMatch {
        ids: ids.to_vec(),
        component_transforms: transforms.to_vec(),
        coeffs: coeffs.to_vec(),
        shifts: shifts.to_vec(),
        length,
        score,
        complexity,
        expression,
        latex,
    });
}

/// 2-sequence combination search. Returns matches plus whether a work cap
/// (time, checks, or combination count) was hit before exhausting the search
/// space (spec section 5: a soft deadline, surfaced as a diagnostics flag).
pub fn search_pairs(query_terms: &[BigInt], min_match_length: usize, candidates: &[SequenceRecord], opts: &CombinationSearchOptions) -> (Vec<CombinationMatch>, bool) {
    search_k(query_terms, min_match_length, candidates, 2, opts)
}

/// 3-sequence combination search. See `search_pairs` for the return shape.
pub fn search_triples(query_terms: &[BigInt], min_match_length: usize, candidates: &[SequenceRecord], opts: &CombinationSearchOptions) -> (Vec<CombinationMatch>, bool) {
    search_k(query_terms, min_match_length, candidates, 3, opts)
}
