// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Candidate selection: narrow ~400k sequences down to a pool worth the
//! expense of exact/transform/combination matching (spec section 4.3).

use crate::record::{first_diff_sign_optional, sign_pattern_of, SequenceRecord};
use crate::similarity::rank_candidates;
use crate::store::{IndexStore, InvariantFilter};
use crate::term::Query;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap};

/// Select a bounded candidate pool using the prefix index when possible,
/// otherwise invariant filters with a tolerance band on nonzero count
/// (spec section 4.3). Never materializes the full result set — callers
/// truncate.
pub fn candidates<'a>(
    query: &Query,
    store: &'a dyn IndexStore,
    use_prefix_index: bool,
    loosen_nonzero: bool,
) -> Box<dyn Iterator<Item = SequenceRecord> + 'a> {
    if query.has_wildcards() {
        // Invariant filters are unsound under wildcards: a wildcard position
        // could match any sign or value, so no invariant-based pre-filter
        // can be trusted to not exclude the true match.
        return store.iter_all();
    }

    if use_prefix_index && !query.allow_subsequence && query.len() >= 5 {
        let prefix = query.as_concrete_terms().expect("checked above: no wildcards");
        return store.iter_by_prefix5(&prefix[..5]);
    }

    let opt_terms = query.terms.iter().map(|t| t.as_concrete().cloned());
    let sign_pattern = sign_pattern_of(opt_terms.clone());
    let first_diff_sign = first_diff_sign_optional(opt_terms);
    let nz = query.terms.iter().filter(|t| t.as_concrete().map(|v| !num_traits::Zero::is_zero(v)).unwrap_or(false)).count();
    let len = query.len().max(1);
    let band = ((len + 1) / 2).max(1);

    let nonzero_range = if loosen_nonzero {
        None
    } else {
        Some((nz.saturating_sub(band), nz + band))
    };

    let filter = InvariantFilter {
        sign_pattern: Some(sign_pattern),
        first_diff_sign: Some(first_diff_sign),
        nonzero_range,
        length_range: Some((query.min_match_length, usize::MAX)),
    };
    store.iter_filtered(&filter)
}

/// A higher-level bucket combining invariant-filtered and similarity-ranked
/// candidates, for the combination search (spec section 4.3).
#[derive(Debug, Clone)]
pub struct CandidateBucket {
    pub records: Vec<SequenceRecord>,
}

/// Build a combination-search bucket: base records from `candidates`,
/// unioned with similarity-ranked records (prioritizing the latter), sorted
/// by closeness in length to the query, truncated to `max_records`, and
/// optionally topped up from a full scan.
pub fn build_bucket(
    query: &Query,
    store: &dyn IndexStore,
    max_records: usize,
    similar_limit: usize,
    fill_unfiltered: bool,
) -> CandidateBucket {
    let qlen = query.len();
    let base: Vec<SequenceRecord> = candidates(query, store, true, false).collect();
    let similar = rank_candidates(query, store.iter_all(), similar_limit);

    let mut by_id: HashMap<String, SequenceRecord> = HashMap::new();
    for r in &base {
        by_id.insert(r.id.clone(), r.clone());
    }
    let sim_ids: Vec<String> = similar.iter().map(|c| c.record.id.clone()).collect();
    for c in &similar {
        by_id.entry(c.record.id.clone()).or_insert_with(|| c.record.clone());
    }

    let sim_order: HashMap<&str, usize> = sim_ids.iter().enumerate().map(|(i, id)| (id.as_str(), i)).collect();
    let mut priority: Vec<SequenceRecord> = Vec::new();
    let mut other: Vec<SequenceRecord> = Vec::new();
    for rec in by_id.into_values() {
        if sim_order.contains_key(rec.id.as_str()) {
            priority.push(rec);
        } else {
            other.push(rec);
        }
    }
    priority.sort_by_key(|r| sim_order.get(r.id.as_str()).copied().unwrap_or(usize::MAX));
    other.sort_by(|a, b| {
        let da = (a.length() as i64 - qlen as i64).abs();
        let db = (b.length() as i64 - qlen as i64).abs();
        da.cmp(&db).then(a.id.cmp(&b.id))
    });

    let mut records = priority;
    records.extend(other);
    records.truncate(max_records);

    if fill_unfiltered && records.len() < max_records {
        let mut seen: std::collections::HashSet<String> = records.iter().map(|r| r.id.clone()).collect();
        for rec in store.iter_all() {
            if records.len() >= max_records {
                break;
            }
            if seen.contains(&rec.id) {
                continue;
            }
            if rec.length() < query.min_match_length {
                continue;
            }
            seen.insert(rec.id.clone());
            records.push(rec);
        }
    }

    CandidateBucket { records }
}

/// Length-closest candidates from a full, unfiltered scan, selected via a
/// bounded max-heap keyed on `|length - query_len|` (spec section B:
/// `skip_prefix_filter` variant of the original's bucket builder).
pub fn closest_by_length(query: &Query, store: &dyn IndexStore, max_records: usize) -> Vec<SequenceRecord> {
    let qlen = query.len() as i64;
    let mut heap: BinaryHeap<(i64, Reverse<String>, SequenceRecord)> = BinaryHeap::new();
    for rec in store.iter_all() {
        let dist = (rec.length() as i64 - qlen).abs();
        let key = (dist, Reverse(rec.id.clone()), rec);
        if heap.len() < max_records {
            heap.push(key);
        } else if let Some(worst) = heap.peek() {
            if key.0 < worst.0 || (key.0 == worst.0 && key.1 > worst.1) {
                heap.pop();
                heap.push(key);
            }
        }
    }
    let mut out: Vec<SequenceRecord> = heap.into_iter().map(|(_, _, r)| r).collect();
    out.sort_by(|a, b| {
        let da = (a.length() as i64 - qlen).abs();
        let db = (b.length() as i64 - qlen).abs();
        da.cmp(&db).then(a.id.cmp(&b.id))
    });
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query::parse_query;
    use crate::store::MemoryStore;
    use num_bigint::BigInt;

    fn rec(id: &str, terms: &[i64]) -> SequenceRecord {
        SequenceRecord::new(id.to_string(), terms.iter().map(|&v| BigInt::from(v)).collect(), None, None)
    }

    #[test]
    fn wildcard_query_forces_full_scan() {
        let store = MemoryStore::new(vec![rec("A1", &[1, 2, 3, 4, 5])]);
        let query = parse_query("1,?,3", 3, false).unwrap();
        let got: Vec<String> = candidates(&query, &store, true, false).map(|r| r.id).collect();
        assert_eq!(got, vec!["A1"]);
    }

    #[test]
    fn prefix_index_used_for_long_enough_query() {
        let store = MemoryStore::new(vec![rec("A1", &[1, 2, 3, 4, 5, 6]), rec("A2", &[9, 9, 9, 9, 9])]);
        let query = parse_query("1,2,3,4,5", 3, false).unwrap();
        let got: Vec<String> = candidates(&query, &store, true, false).map(|r| r.id).collect();
        assert_eq!(got, vec!["A1"]);
    }

    #[test]
    fn bucket_truncates_to_max_records() {
        let recs: Vec<SequenceRecord> = (0..20).map(|i| rec(&format!("A{i}"), &[i, i + 1, i + 2])).collect();
        let store = MemoryStore::new(recs);
        let query = parse_query("1,2,3", 3, false).unwrap();
        let bucket = build_bucket(&query, &store, 5, 5, false);
        assert!(bucket.records.len() <= 5);
    }

    #[test]
    fn closest_by_length_orders_by_distance() {
        let store = MemoryStore::new(vec![
            rec("A_far", &[1, 2, 3, 4, 5, 6, 7, 8, 9, 10]),
            rec("A_near", &[1, 2, 3]),
        ]);
        let query = parse_query("1,2,3", 3, false).unwrap();
        let got = closest_by_length(&query, &store, 1);
        assert_eq!(got[0].id, "A_near");
    }
}
