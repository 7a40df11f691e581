// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The `QueryParser` collaborator boundary (spec section 6).
//!
//! Input is comma- or whitespace-separated tokens. `?` and `*` become
//! wildcards; tokens that parse as an integer (arbitrary precision, possibly
//! negative) become concrete terms; anything else is silently dropped. The
//! parser is the single place wildcard caps are enforced — `Query` itself
//! trusts its caller (spec section 3: "Parser enforces this").

use crate::error::MatcherError;
use crate::term::{Query, Term};
use num_bigint::BigInt;

const MAX_WILDCARDS: usize = 3;

/// Parse free-form query text into a normalized `Query`.
///
/// `min_match_length` and `allow_subsequence` are caller-supplied matching
/// options, not parsed from the text (spec section 6 describes only the
/// token grammar).
pub fn parse_query(
    text: &str,
    min_match_length: usize,
    allow_subsequence: bool,
) -> Result<Query, MatcherError> {
    let mut terms = Vec::new();
    for tok in text.split(|c: char| c == ',' || c.is_whitespace()) {
        if tok.is_empty() {
            continue;
        }
        if tok == "?" || tok == "*" {
            terms.push(Term::Any);
            continue;
        }
        if let Ok(v) = tok.parse::<BigInt>() {
            terms.push(Term::Concrete(v));
        }
        // Anything else (identifiers, punctuation, etc.) is silently dropped.
    }

    let total = terms.len();
    let wildcards = terms.iter().filter(|t| t.is_wildcard()).count();
    if wildcards > MAX_WILDCARDS {
        return Err(MatcherError::QueryParseError {
            reason: format!(
                "too many wildcards: {wildcards} (max {MAX_WILDCARDS})"
            ),
        });
    }
    if total > 0 && wildcards * 2 > total {
        return Err(MatcherError::QueryParseError {
            reason: format!(
                "wildcard ratio too high: {wildcards}/{total} exceeds 50%"
            ),
        });
    }

    Ok(Query::new(terms, min_match_length, allow_subsequence))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_and_whitespace() {
        let q = parse_query("1, 2 3,4", 3, false).unwrap();
        assert_eq!(q.terms.len(), 4);
    }

    #[test]
    fn wildcards_become_any() {
        let q = parse_query("1, ?, 3, *", 3, false).unwrap();
        assert_eq!(q.wildcard_count(), 2);
    }

    #[test]
    fn drops_unparseable_tokens() {
        let q = parse_query("1, foo, 2", 3, false).unwrap();
        assert_eq!(q.terms.len(), 2);
    }

    #[test]
    fn negative_integers_parse() {
        let q = parse_query("-1, -2, 3", 3, false).unwrap();
        assert_eq!(q.as_concrete_terms().unwrap(), vec![
            BigInt::from(-1), BigInt::from(-2), BigInt::from(3)
        ]);
    }

    #[test]
    fn rejects_too_many_wildcards() {
        assert!(parse_query("?,?,?,?,1", 3, false).is_err());
    }

    #[test]
    fn rejects_high_wildcard_ratio() {
        assert!(parse_query("?,?,1", 3, false).is_err());
    }

    #[test]
    fn allows_exactly_half_wildcards() {
        let q = parse_query("?,1", 3, false).unwrap();
        assert_eq!(q.wildcard_count(), 1);
    }

    #[test]
    fn big_integers_beyond_i64() {
        let q = parse_query("123456789012345678901234567890", 1, false).unwrap();
        assert_eq!(q.terms.len(), 1);
    }
}
