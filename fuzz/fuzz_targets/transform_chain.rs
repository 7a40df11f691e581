// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for transform chain application.
//!
//! Generates an arbitrary term list and a small catalog subset, then drives
//! `search_chains` over it: every `Transform` is documented as total (never
//! panics, shrinks or empties its input instead), so this must hold for any
//! input shape, including empty, single-element, and all-zero sequences.

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use num_bigint::BigInt;
use oeis_matcher::transforms::{apply_chain, default_catalog, search_chains, Transform};

#[derive(Debug, Arbitrary)]
struct Input {
    terms: Vec<i64>,
    depth: u8,
    catalog_indices: Vec<u8>,
}

fuzz_target!(|input: Input| {
    let terms: Vec<BigInt> = input.terms.iter().take(20).map(|&v| BigInt::from(v)).collect();
    let depth = (input.depth % 3) as u32 + 1;

    let full_catalog = default_catalog();
    let catalog: Vec<Transform> = input
        .catalog_indices
        .iter()
        .take(8)
        .map(|&i| full_catalog[i as usize % full_catalog.len()].clone())
        .collect();
    if catalog.is_empty() {
        return;
    }

    // INVARIANT 1: search_chains never panics, regardless of term shape.
    let results = search_chains(&catalog, depth, &terms, 1);

    for result in &results {
        // INVARIANT 2: a result's output is never empty (search_chains
        // filters those out).
        assert!(!result.output.is_empty());

        // INVARIANT 3: replaying the same chain against the same input
        // reproduces the same output exactly (transforms are pure).
        let replay = apply_chain(&result.chain, &terms);
        assert_eq!(replay, result.output);

        // INVARIANT 4: complexity is never negative.
        assert!(result.complexity >= 0.0);
    }

    // INVARIANT 5: every individual transform in the catalog is total on
    // an empty input (never panics, returns something, possibly empty).
    for t in &catalog {
        let _ = t.apply(&[]);
    }
});
