// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Similarity ranking: is the query approximately a scaled-and-shifted
//! version of a known sequence? (spec section 4.4)
//!
//! This is the one stage that legitimately uses floating point, since it's
//! ranking, not equality (spec section 1). Overflow turning a candidate's
//! terms into `f64` is recovered locally by skipping that candidate (spec
//! section 7) rather than failing the whole ranking pass.

use crate::record::SequenceRecord;
use crate::term::Query;
use num_traits::ToPrimitive;

#[derive(Debug, Clone)]
pub struct ScoredCandidate {
    pub record: SequenceRecord,
    pub corr: f64,
    pub mse: f64,
    pub scale: f64,
    pub offset: f64,
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        0.0
    } else {
        values.iter().sum::<f64>() / values.len() as f64
    }
}

/// Pearson correlation on the first `min(x.len(), y.len())` terms. `0.0` if
/// fewer than two points or either side has zero variance.
pub fn correlation(x: &[f64], y: &[f64]) -> f64 {
    let n = x.len().min(y.len());
    if n < 2 {
        return 0.0;
    }
    let (x, y) = (&x[..n], &y[..n]);
    let mx = mean(x);
    let my = mean(y);
    let num: f64 = x.iter().zip(y).map(|(a, b)| (a - mx) * (b - my)).sum();
    let denx: f64 = x.iter().map(|a| (a - mx).powi(2)).sum::<f64>().sqrt();
    let deny: f64 = y.iter().map(|b| (b - my).powi(2)).sum::<f64>().sqrt();
    if denx == 0.0 || deny == 0.0 {
        0.0
    } else {
        num / (denx * deny)
    }
}

/// Least-squares fit of `scale * target + offset ≈ query` over the first
/// `n = min(query.len(), target.len())` terms. Returns `(scale, offset,
/// mse)`. If the normal-equation denominator is zero, `scale = 0` and
/// `offset = mean(query)` (spec section 4.4).
pub fn fit_scale_offset(query: &[f64], target: &[f64]) -> (f64, f64, f64) {
    let n = query.len().min(target.len());
    if n == 0 {
        return (0.0, 0.0, f64::INFINITY);
    }
    let (x, y) = (&target[..n], &query[..n]);
    let sum_x: f64 = x.iter().sum();
    let sum_y: f64 = y.iter().sum();
    let sum_xx: f64 = x.iter().map(|v| v * v).sum();
    let sum_xy: f64 = x.iter().zip(y).map(|(a, b)| a * b).sum();
    let n_f = n as f64;
    let denom = n_f * sum_xx - sum_x * sum_x;

    let (scale, offset) = if denom == 0.0 {
        (0.0, mean(y))
    } else {
        let scale = (n_f * sum_xy - sum_x * sum_y) / denom;
        let offset = (sum_y - scale * sum_x) / n_f;
        (scale, offset)
    };

    let mse = mean(
        &x.iter()
            .zip(y)
            .map(|(xi, yi)| (scale * xi + offset - yi).powi(2))
            .collect::<Vec<_>>(),
    );
    (scale, offset, mse)
}

fn to_f64_checked(values: &[num_bigint::BigInt]) -> Option<Vec<f64>> {
    let mut out = Vec::with_capacity(values.len());
    for v in values {
        let f = v.to_f64()?;
        if !f.is_finite() {
            return None;
        }
        out.push(f);
    }
    Some(out)
}

/// Rank candidates by correlation, then MSE of the best scale/offset fit.
/// Wildcarded queries return an empty ranking (spec section 4.4). A
/// candidate whose terms overflow `f64` conversion is skipped, not fatal.
pub fn rank_candidates<I: IntoIterator<Item = SequenceRecord>>(
    query: &Query,
    candidates: I,
    top_k: usize,
) -> Vec<ScoredCandidate> {
    if query.has_wildcards() {
        return Vec::new();
    }
    let Some(q_terms) = query.as_concrete_terms() else {
        return Vec::new();
    };
    let Some(q_f) = to_f64_checked(&q_terms) else {
        return Vec::new();
    };

    let mut scored: Vec<ScoredCandidate> = Vec::new();
    for rec in candidates {
        let Some(rec_f) = to_f64_checked(&rec.terms) else {
            continue; // overflow on this candidate: skip, don't fail the pass
        };
        let corr = correlation(&q_f, &rec_f);
        let (scale, offset, mse) = fit_scale_offset(&q_f, &rec_f);
        scored.push(ScoredCandidate { record: rec, corr, mse, scale, offset });
    }

    scored.sort_by(|a, b| {
        b.corr
            .partial_cmp(&a.corr)
            .unwrap_or(std::cmp::Ordering::Equal)
            .then(a.mse.partial_cmp(&b.mse).unwrap_or(std::cmp::Ordering::Equal))
    });
    scored.truncate(top_k);
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use num_bigint::BigInt;

    fn rec(id: &str, terms: &[i64]) -> SequenceRecord {
        SequenceRecord::new(id.to_string(), terms.iter().map(|&v| BigInt::from(v)).collect(), None, None)
    }

    #[test]
    fn perfect_linear_fit_has_zero_mse() {
        let query = parse_query("2,4,6,8,10", 3, false).unwrap();
        let ranked = rank_candidates(&query, vec![rec("A1", &[1, 2, 3, 4, 5])], 10);
        assert_eq!(ranked.len(), 1);
        assert!((ranked[0].scale - 2.0).abs() < 1e-9);
        assert!(ranked[0].mse < 1e-9);
        assert!((ranked[0].corr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn wildcarded_query_ranks_empty() {
        let query = parse_query("1,?,3", 3, false).unwrap();
        let ranked = rank_candidates(&query, vec![rec("A1", &[1, 2, 3])], 10);
        assert!(ranked.is_empty());
    }

    #[test]
    fn constant_variance_gives_zero_correlation() {
        assert_eq!(correlation(&[1.0, 1.0, 1.0], &[1.0, 2.0, 3.0]), 0.0);
    }
}
