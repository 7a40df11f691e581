// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Error kinds for the matcher, ordered (per design) from recoverable to fatal.
//!
//! Only the conditions that must stop the caller before or during pipeline
//! setup become a `MatcherError`. Overflow during similarity scoring is
//! recovered locally by skipping the offending candidate, and a tripped work
//! budget is not an error at all — it is a `diagnostics` flag on an otherwise
//! normal (partial) result. See `pipeline` and `similarity` for those paths.

use std::path::PathBuf;

/// Everything that can stop the matcher before it produces an answer.
#[derive(Debug, thiserror::Error)]
pub enum MatcherError {
    /// The query text could not be parsed into a well-formed `Query`.
    #[error("invalid query: {reason}")]
    QueryParseError { reason: String },

    /// The `IndexStore` could not be opened at all.
    #[error("index not available at {path}")]
    IndexMissing { path: PathBuf },

    /// A stored record could not be parsed. Streaming callers (`iter_*`)
    /// catch this themselves and skip the record; it only escapes as an
    /// error from store-opening code that reads metadata eagerly.
    #[error("malformed record {id}: {reason}")]
    MalformedRecord { id: String, reason: String },
}

pub type Result<T> = std::result::Result<T, MatcherError>;
