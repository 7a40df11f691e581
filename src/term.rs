// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! The integer model: arbitrary-precision terms, with a wildcard case.
//!
//! OEIS terms routinely exceed 64 bits (factorial-like and combinatorial
//! sequences especially), so every concrete term is a `BigInt`. `Term::Any`
//! is only ever legal inside a `Query` — stored sequences are fully concrete.

use num_bigint::BigInt;
use std::fmt;

/// A single position in a query: a concrete integer, or a wildcard.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Term {
    Concrete(BigInt),
    Any,
}

impl Term {
    pub fn is_wildcard(&self) -> bool {
        matches!(self, Term::Any)
    }

    pub fn as_concrete(&self) -> Option<&BigInt> {
        match self {
            Term::Concrete(v) => Some(v),
            Term::Any => None,
        }
    }

    /// Wildcard-aware equality: `Any` matches anything.
    pub fn matches(&self, other: &BigInt) -> bool {
        match self {
            Term::Concrete(v) => v == other,
            Term::Any => true,
        }
    }
}

impl fmt::Display for Term {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Term::Concrete(v) => write!(f, "{v}"),
            Term::Any => write!(f, "?"),
        }
    }
}

impl From<i64> for Term {
    fn from(v: i64) -> Self {
        Term::Concrete(BigInt::from(v))
    }
}

/// A normalized query: an ordered sequence of terms plus matching options.
///
/// Invariant (enforced by the parser, `query::parse_query`, not here): at
/// most 3 `Any` terms, and wildcards no more than 50% of `terms.len()`.
/// `Query` itself does not re-validate — it is produced exactly once, by the
/// parser, and is immutable thereafter (spec section 3, Lifecycle).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Query {
    pub terms: Vec<Term>,
    pub min_match_length: usize,
    pub allow_subsequence: bool,
}

impl Query {
    pub fn new(terms: Vec<Term>, min_match_length: usize, allow_subsequence: bool) -> Self {
        Query {
            terms,
            min_match_length: min_match_length.max(1),
            allow_subsequence,
        }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    pub fn wildcard_count(&self) -> usize {
        self.terms.iter().filter(|t| t.is_wildcard()).count()
    }

    pub fn has_wildcards(&self) -> bool {
        self.terms.iter().any(Term::is_wildcard)
    }

    /// Concrete terms only, usable when the caller has already established
    /// (e.g. via `has_wildcards`) that none are wildcards. Returns `None`
    /// if any term is `Any`.
    pub fn as_concrete_terms(&self) -> Option<Vec<BigInt>> {
        self.terms
            .iter()
            .map(|t| t.as_concrete().cloned())
            .collect()
    }
}
