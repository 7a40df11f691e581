// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Property-based tests for the universally-quantified invariants and
//! round-trip laws of the matching pipeline.
//!
//! Mirrors the teacher crate's `tests/property/` layout: strategies up top,
//! `proptest!` blocks grouped by the component they exercise.

use num_bigint::BigInt;
use oeis_matcher::combination::{search_pairs, CombinationSearchOptions};
use oeis_matcher::matcher::{match_exact, MatchKind};
use oeis_matcher::query::parse_query;
use oeis_matcher::record::SequenceRecord;
use oeis_matcher::store::{IndexStore, MemoryStore};
use oeis_matcher::term::Query;
use oeis_matcher::transforms::Transform;
use proptest::prelude::*;

// ============================================================================
// STRATEGIES
// ============================================================================

/// Small-magnitude terms keep combination/transform arithmetic from
/// overflowing `i64` scratch conversions used only inside test assertions.
fn term_strategy() -> impl Strategy<Value = i64> {
    -50i64..50i64
}

fn terms_strategy(min_len: usize, max_len: usize) -> impl Strategy<Value = Vec<i64>> {
    prop::collection::vec(term_strategy(), min_len..=max_len)
}

fn to_bigints(xs: &[i64]) -> Vec<BigInt> {
    xs.iter().map(|&x| BigInt::from(x)).collect()
}

fn rec(id: &str, terms: &[i64]) -> SequenceRecord {
    SequenceRecord::new(id.to_string(), to_bigints(terms), None, None)
}

// ============================================================================
// EXACT MATCHER PROPERTIES (spec section 8, invariants 1-2)
// ============================================================================

proptest! {
    /// Invariant 1: for any wildcard-free query that is a genuine prefix of
    /// a stored sequence, the exact matcher reports it with kind=Prefix,
    /// offset=0.
    #[test]
    fn prop_prefix_correctness(seq in terms_strategy(5, 20), qlen in 1usize..5usize) {
        let qlen = qlen.min(seq.len());
        let query_terms = &seq[..qlen];
        let text = query_terms.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        let query = parse_query(&text, 1, false).unwrap();
        let record = rec("A1", &seq);

        let matches = match_exact(&query, vec![record], None, None);
        prop_assert_eq!(matches.len(), 1);
        prop_assert_eq!(matches[0].kind, MatchKind::Prefix);
        prop_assert_eq!(matches[0].offset, 0);
        prop_assert_eq!(matches[0].length, qlen);
    }

    /// Invariant 2: any reported Subsequence match genuinely occurs at its
    /// claimed offset.
    #[test]
    fn prop_subsequence_soundness(
        prefix in terms_strategy(0, 6),
        needle in terms_strategy(1, 5),
        suffix in terms_strategy(0, 6),
    ) {
        let mut seq = prefix.clone();
        seq.extend(&needle);
        seq.extend(&suffix);

        let text = needle.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(",");
        let query = parse_query(&text, 1, true).unwrap();
        let record = rec("A1", &seq);

        let matches = match_exact(&query, vec![record], None, None);
        for m in &matches {
            if m.kind == MatchKind::Subsequence {
                let window = &seq[m.offset..m.offset + m.length];
                prop_assert_eq!(window.to_vec(), needle.clone());
            }
        }
    }
}

// ============================================================================
// PREFIX INDEX SOUNDNESS (spec section 8, invariant 3)
// ============================================================================

proptest! {
    #[test]
    fn prop_prefix_index_is_subset_of_full_scan(
        records in prop::collection::vec(terms_strategy(3, 10), 1..12),
        prefix in terms_strategy(3, 5),
    ) {
        let recs: Vec<SequenceRecord> = records
            .iter()
            .enumerate()
            .map(|(i, terms)| rec(&format!("A{i}"), terms))
            .collect();
        let store = MemoryStore::new(recs);
        let prefix_bi = to_bigints(&prefix);

        let from_index: Vec<String> = store.iter_by_prefix5(&prefix_bi).map(|r| r.id).collect();
        let k = prefix_bi.len().min(5);
        let from_scan: Vec<String> = store
            .iter_all()
            .filter(|r| {
                let rk = r.terms.len().min(5).min(k);
                r.terms[..rk] == prefix_bi[..rk]
            })
            .map(|r| r.id)
            .collect();

        for id in &from_index {
            prop_assert!(from_scan.contains(id));
        }
    }
}

// ============================================================================
// COMBINATION EXACTNESS AND BUDGET BOUND (spec section 8, invariants 4-5)
// ============================================================================

proptest! {
    /// Invariant 4: every reported combination genuinely satisfies
    /// `sum(coeff * component) == query` on its aligned slice.
    #[test]
    fn prop_combination_exactness(
        a in terms_strategy(6, 6),
        b in terms_strategy(6, 6),
        c1 in -3i64..=3i64,
        c2 in -3i64..=3i64,
    ) {
        prop_assume!(c1 != 0 || c2 != 0);
        let query: Vec<i64> = a.iter().zip(&b).map(|(x, y)| c1 * x + c2 * y).collect();
        let rec_a = rec("A1", &a);
        let rec_b = rec("A2", &b);
        let query_bi = to_bigints(&query);

        let opts = CombinationSearchOptions {
            coeffs: vec![c1, c2, -c1, -c2].into_iter().chain([1, -1]).collect(),
            max_shift: 0,
            max_shift_back: 0,
            component_transforms: vec![oeis_matcher::combination::ComponentTransform::Id],
            ..CombinationSearchOptions::default()
        };
        let (results, _capped) = search_pairs(&query_bi, 3, &[rec_a, rec_b], &opts);

        for m in &results {
            let recs_by_id: std::collections::HashMap<&str, &[i64]> =
                [("A1", a.as_slice()), ("A2", b.as_slice())].into_iter().collect();
            let mut sum = vec![BigInt::from(0); m.length];
            for (id, coeff, shift) in m.ids.iter().zip(&m.coeffs).zip(&m.shifts).map(|((i, c), s)| (i, c, s)) {
                let terms = recs_by_id[id.as_str()];
                let c_val = match coeff {
                    oeis_matcher::combination::Coeff::Int(v) => *v,
                    oeis_matcher::combination::Coeff::Rational(n, 1) => *n,
                    oeis_matcher::combination::Coeff::Rational(_, _) => continue,
                };
                let start = *shift;
                for i in 0..m.length {
                    let idx = (start + i as i64) as usize;
                    sum[i] += BigInt::from(c_val) * BigInt::from(terms[idx]);
                }
            }
            prop_assert_eq!(sum, query_bi[..m.length].to_vec());
        }
    }

    /// Invariant 5: combination search never performs more than `max_checks`
    /// coefficient-tuple evaluations worth of work; a tiny cap must still
    /// terminate quickly and return a `capped` flag rather than hang.
    #[test]
    fn prop_budget_bound_terminates(a in terms_strategy(6, 6), b in terms_strategy(6, 6)) {
        let query = to_bigints(&a);
        let rec_a = rec("A1", &a);
        let rec_b = rec("A2", &b);
        let opts = CombinationSearchOptions {
            max_checks: 3,
            ..CombinationSearchOptions::default()
        };
        let (_results, _capped) = search_pairs(&query, 3, &[rec_a, rec_b], &opts);
        // Termination itself (no timeout) is the property under test; proptest's
        // harness will fail the test if this hangs past its own deadline.
    }
}

// ============================================================================
// DE-DUP (spec section 8, invariant 6)
// ============================================================================

proptest! {
    #[test]
    fn prop_exact_matches_dedup_by_id_and_kind(seq in terms_strategy(5, 10)) {
        let query = Query::new(
            seq[..3].iter().map(|&v| oeis_matcher::term::Term::Concrete(BigInt::from(v))).collect(),
            1,
            true,
        );
        // Three records sharing the same id but only the first is returned
        // by a real IndexStore; simulate duplicate candidates reaching the
        // matcher directly (e.g. from a unioned bucket) and confirm no
        // (id, kind) pair appears twice in a single `match_exact` call's
        // semantics at the pipeline's de-dup layer.
        let r = rec("A1", &seq);
        let matches = match_exact(&query, vec![r.clone(), r.clone(), r], None, None);
        let mut seen = std::collections::HashSet::new();
        let mut unique = Vec::new();
        for m in matches {
            if seen.insert((m.id.clone(), m.kind)) {
                unique.push(m);
            }
        }
        prop_assert!(unique.len() <= 2); // at most one Prefix, one Subsequence
    }
}

// ============================================================================
// DETERMINISM (spec section 8, invariant 7)
// ============================================================================

proptest! {
    #[test]
    fn prop_transform_search_is_deterministic(seq in terms_strategy(5, 10)) {
        let terms = to_bigints(&seq);
        let catalog = vec![Transform::Scale(2), Transform::Affine(2, 1), Transform::Diff(1), Transform::Reverse];
        let first = oeis_matcher::transforms::search_chains(&catalog, 2, &terms, 3);
        let second = oeis_matcher::transforms::search_chains(&catalog, 2, &terms, 3);
        prop_assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(&second) {
            prop_assert_eq!(&a.chain, &b.chain);
            prop_assert_eq!(&a.output, &b.output);
        }
    }
}

// ============================================================================
// TRANSFORM ROUND-TRIP / IDEMPOTENCE LAWS (spec section 8)
// ============================================================================

proptest! {
    #[test]
    fn prop_partial_sum_then_diff_returns_tail(seq in terms_strategy(2, 12)) {
        let terms = to_bigints(&seq);
        let summed = Transform::PartialSum.apply(&terms);
        let back = Transform::Diff(1).apply(&summed);
        // Diff(1) of a partial-sum sequence of length n restores the
        // original's last n-1 elements (the first element is consumed by
        // differencing, per spec section 8).
        prop_assert_eq!(back, terms[1..].to_vec());
    }

    #[test]
    fn prop_reverse_is_involution(seq in terms_strategy(0, 12)) {
        let terms = to_bigints(&seq);
        let once = Transform::Reverse.apply(&terms);
        let twice = Transform::Reverse.apply(&once);
        prop_assert_eq!(twice, terms);
    }

    #[test]
    fn prop_abs_is_idempotent(seq in terms_strategy(0, 12)) {
        let terms = to_bigints(&seq);
        let once = Transform::Abs.apply(&terms);
        let twice = Transform::Abs.apply(&once);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn prop_scale_then_inverse_scale_is_identity_when_divisible(
        seq in prop::collection::vec(-10i64..=10i64, 1..8),
        k in prop::sample::select(vec![2i64, 3, 4, 5, -2, -3]),
    ) {
        let terms = to_bigints(&seq);
        // Scale(k) then dividing back out by k (the conceptual Scale(1/k))
        // recovers the original exactly, since every value divides evenly
        // by construction (spec section 8).
        let scaled = Transform::Scale(k).apply(&terms);
        let recovered: Vec<BigInt> = scaled.iter().map(|v| v / k).collect();
        prop_assert_eq!(recovered, terms);
    }
}
