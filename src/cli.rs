// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// clap is a popular Rust library for parsing command-line arguments.
// We use the "derive" API which lets us define the CLI structure using
// Rust structs and attributes (the #[...] things).
//
// Rust concepts:
// - Structs: Custom data types that group related data
// - Enums: Types that can be one of several variants
// - Derive macros: Automatically generate code for our types
// =============================================================================

use crate::checker::BatchConfig;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

// This struct represents our entire CLI application
//
// #[derive(Parser)] tells clap to automatically generate parsing code
// The #[command(...)] attributes configure how the CLI behaves
#[derive(Parser, Debug)]
#[command(
    name = "ref-warden",
    version = "0.1.0",
    about = "A CLI tool to triage dead citation links and their archived snapshots",
    long_about = "ref-warden probes the external links cited in a document, separating \
                  genuinely dead links from bot-blocking and transient failures, and pairs \
                  each original link with any archived snapshot that supersedes it."
)]
pub struct Cli {
    // The #[command(subcommand)] attribute tells clap that this field
    // will hold one of the subcommands defined in the Commands enum
    #[command(subcommand)]
    pub command: Commands,
}

// This enum defines our subcommands (html, urls)
//
// Each variant represents a different subcommand the user can run
// The fields inside each variant become the arguments for that subcommand
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Triage the citation links found in a saved HTML document
    ///
    /// Example: ref-warden html article.html --concurrency 10
    Html {
        /// Path to the saved document HTML
        ///
        /// This is a positional argument (required, no flag needed)
        html_file: PathBuf,

        /// Output results in JSON format instead of a table
        ///
        /// This is an optional flag: --json
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        tuning: Tuning,
    },

    /// Check a flat list of URLs, one per line
    ///
    /// Example: ref-warden urls links.txt --timeout 10
    Urls {
        /// Path to a text file with one URL per line
        ///
        /// Lines starting with '#' are skipped
        url_file: PathBuf,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,

        #[command(flatten)]
        tuning: Tuning,
    },
}

// Batch tuning knobs shared by both subcommands
//
// #[command(flatten)] splices these flags into each subcommand, so we
// define them once instead of repeating five fields per variant
#[derive(Args, Debug)]
pub struct Tuning {
    /// Per-request timeout in seconds
    #[arg(long, default_value_t = 5)]
    pub timeout: u64,

    /// How many probes may run concurrently within a chunk
    #[arg(long, default_value_t = 20)]
    pub concurrency: usize,

    /// How many URLs to process per chunk
    #[arg(long, default_value_t = 100)]
    pub chunk_size: usize,

    /// Retry attempts for dead verdicts that look like false positives
    #[arg(long, default_value_t = 1)]
    pub max_retries: usize,

    /// Skip the secondary validation pass over dead results
    #[arg(long)]
    pub no_secondary: bool,
}

impl Tuning {
    /// Converts the CLI flags into the batch runner's configuration
    pub fn to_batch_config(&self) -> BatchConfig {
        BatchConfig {
            concurrency: self.concurrency,
            chunk_size: self.chunk_size,
            timeout: Duration::from_secs(self.timeout),
            max_retries: self.max_retries,
            secondary_validation: !self.no_secondary,
        }
    }
}
