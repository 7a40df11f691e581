// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Fuzz target for the query text parser.
//!
//! Throws arbitrary byte sequences at `parse_query` to verify it never
//! panics and that every `Query` it produces upholds the wildcard caps the
//! parser itself is responsible for enforcing.

#![no_main]

use libfuzzer_sys::fuzz_target;
use oeis_matcher::query::parse_query;

fuzz_target!(|data: &[u8]| {
    let text = match std::str::from_utf8(data) {
        Ok(s) => s,
        Err(_) => return,
    };
    // Cap input length to avoid pathological allocation on huge inputs.
    let text = &text[..text.len().min(2_000)];

    for (min_match_length, allow_subsequence) in [(1usize, false), (3, false), (5, true)] {
        // INVARIANT 1: parse_query never panics on arbitrary text.
        let parsed = parse_query(text, min_match_length, allow_subsequence);

        if let Ok(query) = parsed {
            // INVARIANT 2: wildcard count never exceeds the parser's own cap.
            assert!(query.wildcard_count() <= 3, "wildcard cap violated: {}", query.wildcard_count());

            // INVARIANT 3: wildcard ratio never exceeds 50% once there's at
            // least one term.
            if !query.is_empty() {
                assert!(
                    query.wildcard_count() * 2 <= query.len(),
                    "wildcard ratio cap violated: {}/{}",
                    query.wildcard_count(),
                    query.len()
                );
            }

            // INVARIANT 4: min_match_length is always at least 1 (Query::new
            // floors it).
            assert!(query.min_match_length >= 1);

            // INVARIANT 5: re-parsing the same text with the same options is
            // deterministic.
            let again = parse_query(text, min_match_length, allow_subsequence).unwrap();
            assert_eq!(query, again);
        }
    }
});
