// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `analyze`: the pipeline orchestrator (spec section 4.7).
//!
//! Runs exact match (with its subsequence/full-scan fallback chain),
//! transform search, similarity ranking, and combination search in sequence,
//! against one shared candidate bucket, collecting per-stage timings and a
//! soft-deadline diagnostics flag rather than failing the whole request when
//! a work cap trips (spec section 5).

use crate::candidates::build_bucket;
use crate::combination::{self, CombinationMatch, CombinationSearchOptions};
use crate::matcher::{self, Match};
use crate::record::SequenceRecord;
use crate::similarity::{self, ScoredCandidate};
use crate::store::IndexStore;
use crate::term::Query;
use crate::transforms::{self, Transform};
use serde::{Deserialize, Serialize};
use std::time::Instant;

/// Per-stage wall-clock timings, collected independently of logging since
/// they are a *data* output of the result (spec section 4.7/6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct StageTimings {
    pub exact_ms: Option<u64>,
    pub transform_ms: Option<u64>,
    pub similarity_ms: Option<u64>,
    pub combination_ms: Option<u64>,
}

/// Soft-failure signals that never become a `MatcherError` (spec section 7).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Diagnostics {
    pub used_subsequence_fallback: bool,
    pub used_full_scan_fallback: bool,
    pub combination_budget_exceeded: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub exact: Vec<Match>,
    pub transform: Vec<Match>,
    pub similarity: Vec<SimilarityHit>,
    pub combinations: Vec<CombinationMatch>,
    pub timings: StageTimings,
    pub diagnostics: Diagnostics,
}

/// A `ScoredCandidate` flattened for serialization (the original borrows
/// nothing unusual, but we drop the full `SequenceRecord` down to its `id`
/// and `name` to keep the JSON result shape of spec section 6 lean).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimilarityHit {
    pub id: String,
    pub name: Option<String>,
    pub corr: f64,
    pub mse: f64,
    pub scale: f64,
    pub offset: f64,
}

impl From<ScoredCandidate> for SimilarityHit {
    fn from(c: ScoredCandidate) -> Self {
        SimilarityHit {
            id: c.record.id,
            name: c.record.name,
            corr: c.corr,
            mse: c.mse,
            scale: c.scale,
            offset: c.offset,
        }
    }
}

/// All tunable knobs for a single `analyze` call.
#[derive(Debug, Clone)]
pub struct PipelineOptions {
    pub exact_limit: Option<usize>,
    pub snippet_len: Option<usize>,
    pub fallback_subsequence: bool,
    pub fallback_full_scan: bool,
    pub transform_catalog: Vec<Transform>,
    pub transform_depth: u32,
    pub transform_limit: Option<usize>,
    pub similarity_top_k: usize,
    pub combos: bool,
    pub triples: bool,
    pub candidate_max_records: usize,
    pub use_prefix_index: bool,
    pub combination_pairs: CombinationSearchOptions,
    pub combination_triples: CombinationSearchOptions,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        PipelineOptions {
            exact_limit: Some(20),
            snippet_len: Some(10),
            fallback_subsequence: true,
            fallback_full_scan: true,
            transform_catalog: transforms::default_catalog(),
            transform_depth: 2,
            transform_limit: Some(20),
            similarity_top_k: 10,
            combos: true,
            triples: false,
            candidate_max_records: 200,
            use_prefix_index: true,
            combination_pairs: CombinationSearchOptions::default(),
            combination_triples: CombinationSearchOptions::default_for_triples(),
        }
    }
}

fn elapsed_ms(start: Instant) -> u64 {
    start.elapsed().as_millis() as u64
}

/// Run the full pipeline against `query` (spec section 4.7).
pub fn analyze(query: &Query, store: &dyn IndexStore, opts: &PipelineOptions) -> AnalysisResult {
    let mut diagnostics = Diagnostics::default();
    let mut timings = StageTimings::default();

    // --- stage 1: exact match, with subsequence / full-scan fallback ---
    let exact_start = Instant::now();
    let base_pool: Vec<SequenceRecord> = crate::candidates::candidates(query, store, opts.use_prefix_index, false).collect();
    let mut exact = matcher::match_exact(query, base_pool.iter().cloned(), opts.exact_limit, opts.snippet_len);

    let mut effective_query = query.clone();
    if exact.is_empty() && !query.allow_subsequence && opts.fallback_subsequence {
        effective_query = Query::new(query.terms.clone(), query.min_match_length, true);
        let pool: Vec<SequenceRecord> = crate::candidates::candidates(&effective_query, store, opts.use_prefix_index, false).collect();
        exact = matcher::match_exact(&effective_query, pool, opts.exact_limit, opts.snippet_len);
        diagnostics.used_subsequence_fallback = !exact.is_empty();
    }
    if exact.is_empty() && opts.fallback_full_scan {
        exact = matcher::match_exact(&effective_query, store.iter_all(), opts.exact_limit, opts.snippet_len);
        diagnostics.used_full_scan_fallback = !exact.is_empty();
    }
    timings.exact_ms = Some(elapsed_ms(exact_start));

    // Shared candidate bucket for transform, similarity, and combination
    // stages, built once against the original query.
    let bucket = build_bucket(query, store, opts.candidate_max_records, opts.similarity_top_k.max(1), true).records;

    let concrete_terms = query.as_concrete_terms();

    // --- stage 2: transform search ---
    //
    // A chain is applied to each *candidate's* terms (not the query): the
    // transform that relates query to candidate is discovered by asking
    // whether some `chain(candidate.terms)` has the query as a prefix or
    // subsequence (spec section 4.5's worked example: `Scale(2)` applied to
    // `A1` produces a sequence the query is a prefix of).
    let transform_start = Instant::now();
    let mut transform_matches = Vec::new();
    if concrete_terms.is_some() {
        for candidate in &bucket {
            let chain_results = transforms::search_chains(&opts.transform_catalog, opts.transform_depth, &candidate.terms, query.min_match_length);
            for result in &chain_results {
                let synthetic = SequenceRecord::new(candidate.id.clone(), result.output.clone(), candidate.name.clone(), candidate.keywords.clone());
                let mut matches = matcher::match_exact(query, std::iter::once(synthetic), Some(1), opts.snippet_len);
                for m in &mut matches {
                    m.transform_chain = Some(transforms::describe_chain(&result.chain));
                    // spec section 4.5: score is keyed on the *matched* length
                    // (the query prefix/subsequence length), not the full
                    // transformed candidate's length — those differ whenever
                    // the candidate outruns the query.
                    m.score = m.length as f64 / (1.0 + result.complexity);
                }
                transform_matches.extend(matches);
            }
        }
        transform_matches.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        dedup_by_id_and_kind(&mut transform_matches);
        if let Some(limit) = opts.transform_limit {
            transform_matches.truncate(limit);
        }
    }
    timings.transform_ms = Some(elapsed_ms(transform_start));

    // --- stage 3: similarity ranking ---
    let similarity_start = Instant::now();
    let similarity: Vec<SimilarityHit> = if opts.similarity_top_k > 0 {
        similarity::rank_candidates(query, bucket.iter().cloned(), opts.similarity_top_k)
            .into_iter()
            .map(SimilarityHit::from)
            .collect()
    } else {
        Vec::new()
    };
    timings.similarity_ms = Some(elapsed_ms(similarity_start));

    // --- stage 4: combination search ---
    let combination_start = Instant::now();
    let mut combinations = Vec::new();
    if let Some(q_terms) = &concrete_terms {
        if opts.combos {
            let (mut pairs, capped) = combination::search_pairs(q_terms, query.min_match_length, &bucket, &opts.combination_pairs);
            diagnostics.combination_budget_exceeded |= capped;
            combinations.append(&mut pairs);
        }
        if opts.triples {
            let (mut triples, capped) = combination::search_triples(q_terms, query.min_match_length, &bucket, &opts.combination_triples);
            diagnostics.combination_budget_exceeded |= capped;
            combinations.append(&mut triples);
        }
        combinations.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then(a.complexity.partial_cmp(&b.complexity).unwrap_or(std::cmp::Ordering::Equal))
                .then(b.length.cmp(&a.length))
                .then(a.ids.cmp(&b.ids))
        });
    }
    timings.combination_ms = Some(elapsed_ms(combination_start));

    AnalysisResult {
        exact,
        transform: transform_matches,
        similarity,
        combinations,
        timings,
        diagnostics,
    }
}

/// Keep only the best-scoring match per `(id, kind)` pair (spec section 8,
/// invariant 6).
fn dedup_by_id_and_kind(matches: &mut Vec<Match>) {
    let mut seen = std::collections::HashSet::new();
    matches.retain(|m| seen.insert((m.id.clone(), m.kind)));
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
    fn scenario_exact_prefix_match() {
        let store = MemoryStore::new(vec![rec("A0", &[0, 1, 1, 2, 3, 5, 8, 13])]);
        let query = parse_query("0,1,1,2,3,5", 3, false).unwrap();
        let result = analyze(&query, &store, &PipelineOptions::default());
        assert_eq!(result.exact.len(), 1);
        assert_eq!(result.exact[0].id, "A0");
        assert_eq!(result.exact[0].length, 6);
    }

    #[test]
    fn scenario_transform_match_via_scale() {
        let store = MemoryStore::new(vec![rec("A1", &[1, 2, 3, 4, 5, 6])]);
        let query = parse_query("2,4,6,8,10", 3, false).unwrap();
        let mut opts = PipelineOptions::default();
        opts.transform_catalog = vec![Transform::Scale(2)];
        opts.transform_depth = 1;
        let result = analyze(&query, &store, &opts);
        assert!(result.transform.iter().any(|m| m.id == "A1"));
    }

    #[test]
    fn scenario_combination_pair() {
        let store = MemoryStore::new(vec![
            rec("A1", &[1, 2, 3, 4, 5, 6]),
            rec("A2", &[1, 1, 1, 1, 1, 1]),
        ]);
        let query = parse_query("3,5,7,9,11", 3, false).unwrap();
        let mut opts = PipelineOptions::default();
        opts.combination_pairs.coeffs = vec![1, 2];
        opts.combination_pairs.max_shift = 1;
        opts.combination_pairs.max_shift_back = 0;
        opts.combination_pairs.component_transforms = vec![crate::combination::ComponentTransform::Id];
        let result = analyze(&query, &store, &opts);
        assert!(result.combinations.iter().any(|m| m.ids == vec!["A1".to_string(), "A2".to_string()]));
    }

    #[test]
    fn scenario_wildcard_prefix_match() {
        let store = MemoryStore::new(vec![
            rec("A_odd", &[1, 3, 5, 7, 9]),
            rec("A_prime", &[2, 3, 5, 7, 11]),
        ]);
        let query = parse_query("1,?,5", 3, false).unwrap();
        let result = analyze(&query, &store, &PipelineOptions::default());
        assert_eq!(result.exact.len(), 1);
        assert_eq!(result.exact[0].id, "A_odd");
    }

    #[test]
    fn subsequence_fallback_only_fires_when_prefix_fails() {
        let store = MemoryStore::new(vec![rec("A1", &[9, 9, 3, 5, 7])]);
        let query = parse_query("3,5,7", 3, false).unwrap();
        let result = analyze(&query, &store, &PipelineOptions::default());
        assert!(result.diagnostics.used_subsequence_fallback);
        assert_eq!(result.exact[0].kind, matcher::MatchKind::Subsequence);
    }
}
