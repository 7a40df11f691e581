// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! Layered configuration: built-in defaults, an optional TOML file, then
//! `OEIS_MATCHER_*` environment overrides (spec section A.3).
//!
//! Consumed only by the CLI binary — core pipeline functions take explicit
//! option structs (`PipelineOptions`, `CombinationSearchOptions`) so the
//! algorithms stay pure and independently testable (spec section 5).

use serde::Deserialize;
use std::path::{Path, PathBuf};

/// Non-core knobs: storage paths, truncation cap, and the default pipeline
/// budgets a freshly-started CLI invocation should use absent any `--flag`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    pub store_path: PathBuf,
    pub max_terms: usize,
    pub exact_limit: usize,
    pub transform_depth: u32,
    pub transform_limit: usize,
    pub similarity_top_k: usize,
    pub candidate_max_records: usize,
    pub combination_max_checks: u64,
    pub combination_max_time_secs: u64,
    pub combination_max_combinations: usize,
    pub enable_triples: bool,
}

impl Default for Config {
    fn default() -> Self {
        Config {
            store_path: PathBuf::from("oeis.oeismatch"),
            max_terms: 40,
            exact_limit: 20,
            transform_depth: 2,
            transform_limit: 20,
            similarity_top_k: 10,
            candidate_max_records: 200,
            combination_max_checks: 200_000,
            combination_max_time_secs: 2,
            combination_max_combinations: 50,
            enable_triples: false,
        }
    }
}

impl Config {
    /// Load defaults, then overlay `path` (if it exists) as TOML, then
    /// overlay `OEIS_MATCHER_*` environment variables. Never fails on a
    /// missing file — an absent config file is simply "use defaults",
    /// mirroring the original's layered `config.py` (spec section A.3).
    pub fn load(path: Option<&Path>) -> Self {
        let mut config = Config::default();

        if let Some(path) = path {
            if let Ok(text) = std::fs::read_to_string(path) {
                match toml::from_str::<Config>(&text) {
                    Ok(from_file) => config = from_file,
                    Err(err) => {
                        tracing::warn!(path = %path.display(), error = %err, "ignoring malformed config file");
                    }
                }
            }
        }

        config.apply_env_overrides();
        config
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(v) = std::env::var("OEIS_MATCHER_STORE_PATH") {
            self.store_path = PathBuf::from(v);
        }
        env_usize("OEIS_MATCHER_MAX_TERMS", &mut self.max_terms);
        env_usize("OEIS_MATCHER_EXACT_LIMIT", &mut self.exact_limit);
        env_u32("OEIS_MATCHER_TRANSFORM_DEPTH", &mut self.transform_depth);
        env_usize("OEIS_MATCHER_TRANSFORM_LIMIT", &mut self.transform_limit);
        env_usize("OEIS_MATCHER_SIMILARITY_TOP_K", &mut self.similarity_top_k);
        env_usize("OEIS_MATCHER_CANDIDATE_MAX_RECORDS", &mut self.candidate_max_records);
        env_u64("OEIS_MATCHER_COMBINATION_MAX_CHECKS", &mut self.combination_max_checks);
        env_u64("OEIS_MATCHER_COMBINATION_MAX_TIME_SECS", &mut self.combination_max_time_secs);
        env_usize("OEIS_MATCHER_COMBINATION_MAX_COMBINATIONS", &mut self.combination_max_combinations);
        if let Ok(v) = std::env::var("OEIS_MATCHER_ENABLE_TRIPLES") {
            self.enable_triples = matches!(v.as_str(), "1" | "true" | "yes");
        }
    }
}

fn env_usize(key: &str, slot: &mut usize) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *slot = parsed;
        }
    }
}

fn env_u32(key: &str, slot: &mut u32) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *slot = parsed;
        }
    }
}

fn env_u64(key: &str, slot: &mut u64) {
    if let Ok(v) = std::env::var(key) {
        if let Ok(parsed) = v.parse() {
            *slot = parsed;
        }
    }
}
