// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Stored sequences and their derived invariants (spec section 3).
//!
//! `Invariants` are computed once at index build and re-derivable at any
//! time from `terms` alone — nothing here depends on build-time context.
//! The candidate filter (`candidates`) consumes these as a cheap pre-filter
//! before running anything expensive.

use num_bigint::BigInt;
use num_integer::Integer;
use num_traits::{Signed, Zero};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Coarse shape of a sequence's signs, ignoring wildcards when derived from
/// a query (spec section 4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SignPattern {
    Empty,
    NonNeg,
    NonPos,
    Alternating,
    Mixed,
}

/// Coarse shape of the first-difference sequence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FirstDiffSign {
    /// Fewer than two terms: not applicable.
    Na,
    Pos,
    Neg,
    NonNeg,
    NonPos,
    Flat,
    Mixed,
}

/// Per-sequence derived summary, recomputable from `terms` alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Invariants {
    pub prefix5: Vec<BigInt>,
    pub min: Option<BigInt>,
    pub max: Option<BigInt>,
    pub gcd: BigInt,
    pub is_nondecreasing: bool,
    pub is_nonincreasing: bool,
    pub sign_pattern: SignPattern,
    pub first_diff_sign: FirstDiffSign,
    pub nonzero_count: usize,
    /// Mean of `log(|a_n| + 1) / (n + 1)` over terms where `a_n != 0`;
    /// `0.0` if there are no nonzero terms (spec section 3).
    pub growth_rate: f64,
}

impl Invariants {
    pub fn compute(terms: &[BigInt]) -> Self {
        let prefix5 = terms.iter().take(5).cloned().collect();
        let min = terms.iter().min().cloned();
        let max = terms.iter().max().cloned();
        let gcd = gcd_of_abs(terms);
        let (is_nondecreasing, is_nonincreasing) = monotonic_flags(terms);
        let sign_pattern = sign_pattern_of(terms.iter().map(|t| Some(t.clone())));
        let first_diff_sign = first_diff_sign_of(terms);
        let nonzero_count = terms.iter().filter(|t| !t.is_zero()).count();
        let growth_rate = growth_rate_of(terms);
        Invariants {
            prefix5,
            min,
            max,
            gcd,
            is_nondecreasing,
            is_nonincreasing,
            sign_pattern,
            first_diff_sign,
            nonzero_count,
            growth_rate,
        }
    }
}

/// gcd of absolute values; `0` for an empty slice (gcd identity).
pub fn gcd_of_abs(terms: &[BigInt]) -> BigInt {
    let mut g = BigInt::zero();
    for t in terms {
        g = g.gcd(&t.abs());
    }
    g
}

fn monotonic_flags(terms: &[BigInt]) -> (bool, bool) {
    if terms.is_empty() {
        return (false, false);
    }
    let nondecr = terms.windows(2).all(|w| w[0] <= w[1]);
    let nonincr = terms.windows(2).all(|w| w[0] >= w[1]);
    (nondecr, nonincr)
}

/// Sign pattern over optional terms (wildcards treated as absent, per spec
/// section 4.3: "ignoring `Any` terms").
pub fn sign_pattern_of<I: IntoIterator<Item = Option<BigInt>>>(values: I) -> SignPattern {
    let present: Vec<BigInt> = values.into_iter().flatten().collect();
    if present.is_empty() {
        return SignPattern::Empty;
    }
    let all_nonneg = present.iter().all(|v| *v >= BigInt::zero());
    let all_nonpos = present.iter().all(|v| *v <= BigInt::zero());
    if all_nonneg {
        return SignPattern::NonNeg;
    }
    if all_nonpos {
        return SignPattern::NonPos;
    }
    let alternating = present.windows(2).all(|w| {
        w[0].is_zero() || w[1].is_zero() || (w[0] > BigInt::zero()) != (w[1] > BigInt::zero())
    });
    if alternating {
        SignPattern::Alternating
    } else {
        SignPattern::Mixed
    }
}

fn first_diff_sign_of(terms: &[BigInt]) -> FirstDiffSign {
    first_diff_sign_optional(terms.iter().cloned().map(Some))
}

/// First-difference sign over optional terms, skipping any pair that
/// touches a wildcard (used by the candidate selector on raw queries).
pub fn first_diff_sign_optional<I: IntoIterator<Item = Option<BigInt>>>(
    values: I,
) -> FirstDiffSign {
    let present: Vec<BigInt> = values.into_iter().flatten().collect();
    if present.len() < 2 {
        return FirstDiffSign::Na;
    }
    let diffs: Vec<BigInt> = present.windows(2).map(|w| &w[1] - &w[0]).collect();
    let all_pos = diffs.iter().all(|d| *d > BigInt::zero());
    let all_neg = diffs.iter().all(|d| *d < BigInt::zero());
    let all_nonneg = diffs.iter().all(|d| *d >= BigInt::zero());
    let all_nonpos = diffs.iter().all(|d| *d <= BigInt::zero());
    let all_flat = diffs.iter().all(|d| d.is_zero());
    if all_flat {
        FirstDiffSign::Flat
    } else if all_pos {
        FirstDiffSign::Pos
    } else if all_neg {
        FirstDiffSign::Neg
    } else if all_nonneg {
        FirstDiffSign::NonNeg
    } else if all_nonpos {
        FirstDiffSign::NonPos
    } else {
        FirstDiffSign::Mixed
    }
}

fn growth_rate_of(terms: &[BigInt]) -> f64 {
    use num_traits::ToPrimitive;
    let mut acc = 0.0;
    let mut count = 0usize;
    for (idx, v) in terms.iter().enumerate() {
        if v.is_zero() {
            continue;
        }
        // `to_f64` saturates to +/-inf for magnitudes beyond f64 range; that's
        // fine, growth_rate is a ranking aid, never used for equality (spec
        // section 1: "Decimal / floating-point arithmetic ... never for
        // equality").
        let mag = v.abs().to_f64().unwrap_or(f64::INFINITY);
        acc += (mag + 1.0).ln() / (idx as f64 + 1.0);
        count += 1;
    }
    if count == 0 {
        0.0
    } else {
        acc / count as f64
    }
}

/// A single stored sequence (spec section 3).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SequenceRecord {
    pub id: String,
    pub terms: Vec<BigInt>,
    pub name: Option<String>,
    pub keywords: Option<BTreeSet<String>>,
    pub invariants: Invariants,
}

impl SequenceRecord {
    pub fn new(id: String, terms: Vec<BigInt>, name: Option<String>, keywords: Option<BTreeSet<String>>) -> Self {
        let invariants = Invariants::compute(&terms);
        SequenceRecord { id, terms, name, keywords, invariants }
    }

    pub fn length(&self) -> usize {
        self.terms.len()
    }

    /// Truncate to at most `max_terms`, recomputing invariants (truncation
    /// at index build is lossy but stable, spec section 3).
    pub fn truncated(&self, max_terms: usize) -> Self {
        let terms: Vec<BigInt> = self.terms.iter().take(max_terms).cloned().collect();
        SequenceRecord::new(self.id.clone(), terms, self.name.clone(), self.keywords.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bi(v: i64) -> BigInt { BigInt::from(v) }

    #[test]
    fn sign_pattern_nonneg() {
        let terms = vec![bi(0), bi(1), bi(2)];
        assert_eq!(sign_pattern_of(terms.into_iter().map(Some)), SignPattern::NonNeg);
    }

    #[test]
    fn sign_pattern_alternating() {
        let terms = vec![bi(1), bi(-1), bi(2), bi(-2)];
        assert_eq!(sign_pattern_of(terms.into_iter().map(Some)), SignPattern::Alternating);
    }

    #[test]
    fn first_diff_pos() {
        let terms = vec![bi(1), bi(2), bi(4), bi(7)];
        assert_eq!(first_diff_sign_of(&terms), FirstDiffSign::Pos);
    }

    #[test]
    fn gcd_of_abs_values() {
        let terms = vec![bi(4), bi(-6), bi(10)];
        assert_eq!(gcd_of_abs(&terms), bi(2));
    }

    #[test]
    fn invariants_roundtrip_length() {
        let rec = SequenceRecord::new(
            "A000001".to_string(),
            vec![bi(1), bi(2), bi(3), bi(4), bi(5), bi(6)],
            None,
            None,
        );
        assert_eq!(rec.invariants.prefix5.len(), 5);
        assert_eq!(rec.length(), 6);
    }
}
