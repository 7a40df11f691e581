// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The exact matcher: prefix and subsequence search, with wildcard support
//! (spec section 4.2).
//!
//! Wildcard-free queries use KMP so a single subsequence scan stays linear
//! in the candidate's length; queries containing `Any` fall back to a
//! straightforward `O(n*m)` scan with per-position wildcard equality, since
//! KMP's failure function isn't well-defined once pattern characters can
//! match anything.

use crate::record::SequenceRecord;
use crate::term::{Query, Term};
use num_bigint::BigInt;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MatchKind {
    Prefix,
    Subsequence,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Match {
    pub id: String,
    pub name: Option<String>,
    pub kind: MatchKind,
    pub offset: usize,
    pub length: usize,
    pub score: f64,
    pub transform_chain: Option<String>,
    pub snippet: Option<Vec<BigInt>>,
}

/// `query_terms[i]` equals `seq_terms[i]` for every `i`, or is a wildcard.
fn is_prefix(query_terms: &[Term], seq_terms: &[BigInt]) -> bool {
    if query_terms.len() > seq_terms.len() {
        return false;
    }
    query_terms.iter().zip(seq_terms).all(|(q, s)| q.matches(s))
}

/// KMP search for a wildcard-free pattern in `text`. Returns the first
/// offset, or `None`.
fn kmp_find(pattern: &[BigInt], text: &[BigInt]) -> Option<usize> {
    let m = pattern.len();
    let n = text.len();
    if m == 0 || m > n {
        return None;
    }

    let mut lps = vec![0usize; m];
    let mut k = 0usize;
    for i in 1..m {
        while k > 0 && pattern[k] != pattern[i] {
            k = lps[k - 1];
        }
        if pattern[k] == pattern[i] {
            k += 1;
        }
        lps[i] = k;
    }

    let mut q = 0usize;
    for i in 0..n {
        while q > 0 && pattern[q] != text[i] {
            q = lps[q - 1];
        }
        if pattern[q] == text[i] {
            q += 1;
            if q == m {
                return Some(i + 1 - m);
            }
        }
    }
    None
}

/// Wildcard-aware subsequence scan: `O(n*m)`, used only when the query
/// contains `Any` terms (KMP's failure function doesn't apply).
fn wildcard_scan(pattern: &[Term], text: &[BigInt]) -> Option<usize> {
    let m = pattern.len();
    let n = text.len();
    if m == 0 || m > n {
        return None;
    }
    'outer: for start in 0..=(n - m) {
        for (p, t) in pattern.iter().zip(&text[start..start + m]) {
            if !p.matches(t) {
                continue 'outer;
            }
        }
        return Some(start);
    }
    None
}

/// Find prefix (and, if `query.allow_subsequence`, subsequence) matches in
/// `candidates`. Stops accumulating once `limit` distinct matches are
/// found. Final order: prefix before subsequence; within a kind, longer
/// matches first, then lower offset (spec section 4.2).
pub fn match_exact<I: IntoIterator<Item = SequenceRecord>>(
    query: &Query,
    candidates: I,
    limit: Option<usize>,
    snippet_len: Option<usize>,
) -> Vec<Match> {
    let mut results = Vec::new();
    if query.len() < query.min_match_length {
        return results;
    }

    for seq in candidates {
        if let Some(lim) = limit {
            if results.len() >= lim {
                break;
            }
        }
        if is_prefix(&query.terms, &seq.terms) {
            results.push(build_match(&seq, MatchKind::Prefix, 0, query.len(), snippet_len));
        } else if query.allow_subsequence {
            let offset = if query.has_wildcards() {
                wildcard_scan(&query.terms, &seq.terms)
            } else {
                let pattern: Vec<BigInt> = query
                    .terms
                    .iter()
                    .map(|t| t.as_concrete().cloned().unwrap())
                    .collect();
                kmp_find(&pattern, &seq.terms)
            };
            if let Some(off) = offset {
                results.push(build_match(&seq, MatchKind::Subsequence, off, query.len(), snippet_len));
            }
        }
    }

    results.sort_by(|a, b| {
        let kind_key = |k: MatchKind| if k == MatchKind::Prefix { 0 } else { 1 };
        kind_key(a.kind)
            .cmp(&kind_key(b.kind))
            .then(b.length.cmp(&a.length))
            .then(a.offset.cmp(&b.offset))
    });
    if let Some(lim) = limit {
        results.truncate(lim);
    }
    results
}

fn build_match(seq: &SequenceRecord, kind: MatchKind, offset: usize, length: usize, snippet_len: Option<usize>) -> Match {
    let score = match kind {
        MatchKind::Prefix => length as f64,
        MatchKind::Subsequence => length as f64 - 0.5,
    };
    let snippet = snippet_len.map(|n| seq.terms.iter().take(n).cloned().collect());
    Match {
        id: seq.id.clone(),
        name: seq.name.clone(),
        kind,
        offset,
        length,
        score,
        transform_chain: None,
        snippet,
    }
}
