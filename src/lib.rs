// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `oeis-matcher`: an offline matcher against a local index of OEIS-style
//! integer sequences.
//!
//! The crate is organized around the pipeline described in the design
//! notes, one module per stage:
//!
//! - [`term`] / [`query`]: the query model and its parser.
//! - [`record`]: stored sequences and the invariants derived from them.
//! - [`store`]: the `IndexStore` boundary, an in-memory implementation, and
//!   the on-disk container format.
//! - [`candidates`]: narrowing the full corpus down to a bounded pool worth
//!   matching against.
//! - [`matcher`]: exact prefix/subsequence matching, with wildcard support.
//! - [`transforms`]: the unary transform catalog and chain search.
//! - [`similarity`]: correlation/least-squares ranking for near-misses.
//! - [`combination`]: 2- and 3-sequence linear combination search.
//! - [`pipeline`]: `analyze`, wiring every stage together against one
//!   shared candidate bucket.
//! - [`config`]: layered configuration (defaults, file, environment).
//! - [`error`]: the crate's error type.
//!
//! Every concrete sequence term is an arbitrary-precision [`num_bigint::BigInt`]
//! throughout; OEIS terms routinely exceed 64 bits.

pub mod candidates;
pub mod combination;
pub mod config;
pub mod error;
pub mod matcher;
pub mod pipeline;
pub mod query;
pub mod record;
pub mod similarity;
pub mod store;
pub mod term;
pub mod transforms;

pub use error::{MatcherError, Result};
pub use pipeline::{analyze, AnalysisResult, PipelineOptions};
pub use query::parse_query;
pub use record::SequenceRecord;
pub use store::{IndexStore, MemoryStore};
pub use term::Query;
