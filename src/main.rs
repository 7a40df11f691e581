// Copyright 2025-present Harīṣh Tummalachērla
// SPDX-License-Identifier: Apache-2.0

//! `oeis-matcher` CLI: build, inspect, and query `.oeismatch` indexes.
//!
//! ```bash
//! # Build an index from a simple id,name,term,term,... text corpus
//! oeis-matcher build --input corpus.txt --output oeis.oeismatch
//!
//! # Inspect a store's record count and length distribution
//! oeis-matcher inspect oeis.oeismatch
//!
//! # Query it
//! oeis-matcher query oeis.oeismatch "1,2,3,5,8,13" --json
//! ```

use clap::{Parser, Subcommand};
use oeis_matcher::combination::CombinationSearchOptions;
use oeis_matcher::config::Config;
use oeis_matcher::record::SequenceRecord;
use oeis_matcher::store::file::{open_store, write_store};
use oeis_matcher::store::MemoryStore;
use oeis_matcher::{analyze, parse_query, PipelineOptions};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "oeis-matcher", about = "Offline matcher against a local OEIS-style sequence index", version)]
struct Cli {
    /// Path to a TOML config file layered under built-in defaults
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Increase log verbosity (-v, -vv); overridden by RUST_LOG if set
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build a `.oeismatch` store from a simple text corpus
    Build {
        /// Input corpus: one `id,name,term,term,...` record per line
        #[arg(short, long)]
        input: PathBuf,

        /// Output store path
        #[arg(short, long)]
        output: PathBuf,

        /// Truncate each sequence's stored terms to at most this many
        #[arg(long)]
        max_terms: Option<usize>,
    },

    /// Print store stats: record count and a length histogram summary
    Inspect {
        /// Path to a `.oeismatch` store
        store: PathBuf,
    },

    /// Parse a query and run the full matching pipeline against a store
    Query {
        /// Path to a `.oeismatch` store
        store: PathBuf,

        /// Query text: comma/whitespace separated terms; `?`/`*` for wildcards
        text: String,

        /// Minimum number of terms a match must cover
        #[arg(long, default_value_t = 3)]
        min_match_length: usize,

        /// Treat the query as a subsequence, not just a prefix
        #[arg(long)]
        subsequence: bool,

        /// Also run 3-sequence combination search (slower)
        #[arg(long)]
        triples: bool,

        /// Print results as JSON instead of formatted text
        #[arg(long)]
        json: bool,
    },
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "oeis_matcher=info",
        1 => "oeis_matcher=debug",
        _ => "oeis_matcher=trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);
    let config = Config::load(cli.config.as_deref());

    let result = match cli.command {
        Commands::Build { input, output, max_terms } => run_build(&input, &output, max_terms.unwrap_or(config.max_terms)),
        Commands::Inspect { store } => run_inspect(&store),
        Commands::Query { store, text, min_match_length, subsequence, triples, json } => {
            run_query(&store, &text, min_match_length, subsequence, triples, json, &config)
        }
    };

    if let Err(err) = result {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

/// Parse a `id,name,term,term,...` text corpus into `SequenceRecord`s.
///
/// Malformed lines (no id, or no parseable terms) are skipped with a
/// warning, matching the "skip, don't fail the whole build" policy spec
/// section 7 applies to individual records.
fn parse_corpus(text: &str, max_terms: usize) -> Vec<SequenceRecord> {
    let mut records = Vec::new();
    for (line_no, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }
        let mut parts = line.split(',');
        let Some(id) = parts.next().map(str::trim).filter(|s| !s.is_empty()) else {
            tracing::warn!(line_no, "skipping corpus line: missing id");
            continue;
        };
        let name = parts.next().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        let terms: Vec<num_bigint::BigInt> = parts.filter_map(|tok| tok.trim().parse().ok()).collect();
        if terms.is_empty() {
            tracing::warn!(line_no, id, "skipping corpus line: no parseable terms");
            continue;
        }
        let record = SequenceRecord::new(id.to_string(), terms, name, None).truncated(max_terms);
        records.push(record);
    }
    records
}

fn run_build(input: &std::path::Path, output: &std::path::Path, max_terms: usize) -> Result<(), oeis_matcher::MatcherError> {
    let text = std::fs::read_to_string(input).map_err(|_| oeis_matcher::MatcherError::IndexMissing { path: input.to_path_buf() })?;
    let records = parse_corpus(&text, max_terms);
    tracing::info!(count = records.len(), "parsed corpus");
    write_store(output, &records).map_err(|_| oeis_matcher::MatcherError::IndexMissing { path: output.to_path_buf() })?;
    println!("wrote {} records to {}", records.len(), output.display());
    Ok(())
}

fn run_inspect(store_path: &std::path::Path) -> Result<(), oeis_matcher::MatcherError> {
    let store = open_store(store_path)?;
    println!("records: {}", store.len());
    if store.is_empty() {
        return Ok(());
    }
    let mut lengths: Vec<usize> = store.records().iter().map(SequenceRecord::length).collect();
    lengths.sort_unstable();
    let min = lengths.first().copied().unwrap_or(0);
    let max = lengths.last().copied().unwrap_or(0);
    let median = lengths[lengths.len() / 2];
    println!("length: min={min} median={median} max={max}");
    Ok(())
}

#[allow(clippy::too_many_arguments)]
fn run_query(
    store_path: &std::path::Path,
    text: &str,
    min_match_length: usize,
    subsequence: bool,
    triples: bool,
    json: bool,
    config: &Config,
) -> Result<(), oeis_matcher::MatcherError> {
    let store = open_store(store_path)?;
    let query = parse_query(text, min_match_length, subsequence)?;

    let mut opts = PipelineOptions {
        exact_limit: Some(config.exact_limit),
        transform_depth: config.transform_depth,
        transform_limit: Some(config.transform_limit),
        similarity_top_k: config.similarity_top_k,
        candidate_max_records: config.candidate_max_records,
        triples: triples || config.enable_triples,
        ..PipelineOptions::default()
    };
    opts.combination_pairs = CombinationSearchOptions {
        max_checks: config.combination_max_checks,
        max_time: std::time::Duration::from_secs(config.combination_max_time_secs),
        max_combinations: config.combination_max_combinations,
        ..CombinationSearchOptions::default()
    };

    let result = analyze(&query, &store, &opts);

    if json {
        println!("{}", serde_json::to_string_pretty(&result).unwrap());
    } else {
        print_result_text(&result);
    }
    Ok(())
}

fn print_result_text(result: &oeis_matcher::AnalysisResult) {
    println!("exact matches: {}", result.exact.len());
    for m in &result.exact {
        println!("  {:>12} {:?} offset={} length={} score={:.2}", m.id, m.kind, m.offset, m.length, m.score);
    }
    println!("transform matches: {}", result.transform.len());
    for m in &result.transform {
        println!("  {:>12} {} score={:.2}", m.id, m.transform_chain.as_deref().unwrap_or("?"), m.score);
    }
    println!("similarity hits: {}", result.similarity.len());
    for hit in &result.similarity {
        println!("  {:>12} corr={:.3} mse={:.3} scale={:.3} offset={:.3}", hit.id, hit.corr, hit.mse, hit.scale, hit.offset);
    }
    println!("combinations: {}", result.combinations.len());
    for c in &result.combinations {
        println!("  {} (score={:.2} complexity={:.2})", c.expression, c.score, c.complexity);
    }
    if result.diagnostics.combination_budget_exceeded {
        println!("note: combination search hit a work budget before exhausting the search space");
    }
}
