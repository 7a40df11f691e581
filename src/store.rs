// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `IndexStore`: the boundary to the sequence corpus (spec section 4.1/6).
//!
//! The core never depends on a concrete storage engine — a pooled SQLite
//! handle, a memory-mapped file, whatever — only on this trait. We ship one
//! concrete, in-memory implementation (`MemoryStore`) plus a small on-disk
//! container (`file`) so the library is runnable end to end without pulling
//! in a database. All iterators here are lazy, produce each record at most
//! once, and are restartable by calling the method again (spec section 4.1).

pub mod file;

use crate::record::{FirstDiffSign, SequenceRecord, SignPattern};
use num_bigint::BigInt;
use std::collections::HashMap;

/// Filter predicate for `iter_filtered`, mirroring spec section 4.1's
/// parameter list exactly: every field is optional and absent fields impose
/// no constraint.
#[derive(Debug, Clone, Default)]
pub struct InvariantFilter {
    pub sign_pattern: Option<SignPattern>,
    pub first_diff_sign: Option<FirstDiffSign>,
    pub nonzero_range: Option<(usize, usize)>,
    pub length_range: Option<(usize, usize)>,
}

impl InvariantFilter {
    fn matches(&self, rec: &SequenceRecord) -> bool {
        if let Some(sp) = self.sign_pattern {
            if rec.invariants.sign_pattern != sp {
                return false;
            }
        }
        if let Some(fd) = self.first_diff_sign {
            if rec.invariants.first_diff_sign != fd {
                return false;
            }
        }
        if let Some((lo, hi)) = self.nonzero_range {
            let nz = rec.invariants.nonzero_count;
            if nz < lo || nz > hi {
                return false;
            }
        }
        if let Some((lo, hi)) = self.length_range {
            let len = rec.length();
            if len < lo || len > hi {
                return false;
            }
        }
        true
    }
}

/// The core's only dependency on a storage engine.
pub trait IndexStore {
    /// Every record, once, in an unspecified but stable order.
    fn iter_all(&self) -> Box<dyn Iterator<Item = SequenceRecord> + '_>;

    /// Records whose first `min(5, len(terms))` terms equal the same
    /// number of leading elements of `prefix` (spec section 4.1).
    fn iter_by_prefix5(&self, prefix: &[BigInt]) -> Box<dyn Iterator<Item = SequenceRecord> + '_>;

    /// Records whose stored invariants satisfy every present clause of
    /// `filter`.
    fn iter_filtered(&self, filter: &InvariantFilter) -> Box<dyn Iterator<Item = SequenceRecord> + '_>;
}

/// An in-memory `IndexStore`, the library's reference implementation.
///
/// Builds the secondary indices spec section 6 calls for (prefix5,
/// sign_pattern) as ordinary maps over a `Vec`; `iter_filtered` narrows by
/// `sign_pattern` first (the cheapest, most selective split available
/// without a real database) and applies the remaining clauses as a linear
/// scan over that bucket.
pub struct MemoryStore {
    records: Vec<SequenceRecord>,
    by_prefix: HashMap<Vec<BigInt>, Vec<usize>>,
    by_sign: HashMap<SignPattern, Vec<usize>>,
}

impl MemoryStore {
    pub fn new(records: Vec<SequenceRecord>) -> Self {
        let mut by_prefix: HashMap<Vec<BigInt>, Vec<usize>> = HashMap::new();
        let mut by_sign: HashMap<SignPattern, Vec<usize>> = HashMap::new();
        for (idx, rec) in records.iter().enumerate() {
            by_prefix
                .entry(rec.invariants.prefix5.clone())
                .or_default()
                .push(idx);
            by_sign
                .entry(rec.invariants.sign_pattern)
                .or_default()
                .push(idx);
        }
        MemoryStore { records, by_prefix, by_sign }
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn records(&self) -> &[SequenceRecord] {
        &self.records
    }
}

impl IndexStore for MemoryStore {
    fn iter_all(&self) -> Box<dyn Iterator<Item = SequenceRecord> + '_> {
        Box::new(self.records.iter().cloned())
    }

    fn iter_by_prefix5(&self, prefix: &[BigInt]) -> Box<dyn Iterator<Item = SequenceRecord> + '_> {
        let max_k = prefix.len().min(5);
        let mut indices: Vec<usize> = Vec::new();
        for k in 0..=max_k {
            if let Some(bucket) = self.by_prefix.get(&prefix[..k]) {
                indices.extend(bucket.iter().copied());
            }
        }
        indices.sort_unstable();
        indices.dedup();
        Box::new(indices.into_iter().map(move |i| self.records[i].clone()))
    }

    fn iter_filtered(&self, filter: &InvariantFilter) -> Box<dyn Iterator<Item = SequenceRecord> + '_> {
        let filter = filter.clone();
        match filter.sign_pattern {
            Some(sp) => {
                let bucket = self.by_sign.get(&sp).cloned().unwrap_or_default();
                Box::new(
                    bucket
                        .into_iter()
                        .map(move |i| self.records[i].clone())
                        .filter(move |r| filter.matches(r)),
                )
            }
            None => Box::new(self.records.iter().cloned().filter(move |r| filter.matches(r))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::SequenceRecord;

    fn rec(id: &str, terms: &[i64]) -> SequenceRecord {
        SequenceRecord::new(
            id.to_string(),
            terms.iter().map(|&v| BigInt::from(v)).collect(),
            None,
            None,
        )
    }

    #[test]
    fn prefix_lookup_respects_short_records() {
        let store = MemoryStore::new(vec![
            rec("A1", &[1, 2, 3, 4, 5, 6]),
            rec("A2", &[1, 2, 3]),
            rec("A3", &[9, 9, 9]),
        ]);
        let prefix: Vec<BigInt> = [1, 2, 3, 4, 5].iter().map(|&v| BigInt::from(v)).collect();
        let got: Vec<String> = store.iter_by_prefix5(&prefix).map(|r| r.id).collect();
        assert!(got.contains(&"A1".to_string()));
        assert!(got.contains(&"A2".to_string()));
        assert!(!got.contains(&"A3".to_string()));
    }

    #[test]
    fn filtered_iter_restartable() {
        let store = MemoryStore::new(vec![rec("A1", &[1, 2, 3])]);
        let filter = InvariantFilter { length_range: Some((1, 10)), ..Default::default() };
        assert_eq!(store.iter_filtered(&filter).count(), 1);
        assert_eq!(store.iter_filtered(&filter).count(), 1);
    }
}
