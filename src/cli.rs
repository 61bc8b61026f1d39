// src/cli.rs
// =============================================================================
// This file defines our command-line interface using the `clap` crate.
//
// Subcommands:
// - crawl:  stream a crawl for some domains and show results as they arrive
// - submit: send the URLs of an earlier crawl (saved as JSON) to Sinbyte
// - run:    crawl, then submit what was collected
// - export: write the URLs of an earlier crawl as CSV or plain text
//
// Secrets and endpoints can come from flags or from the environment (and a
// local .env file), so the API key never has to appear in shell history.
// =============================================================================

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::export::ExportFormat;

#[derive(Parser, Debug)]
#[command(
    name = "sitemap-relay",
    version = "0.1.0",
    about = "Stream sitemap crawl results and relay the collected URLs to Sinbyte",
    long_about = "sitemap-relay asks a sitemap crawl backend to crawl a batch of domains, shows each \
                  result as soon as it is ready, and forwards the URLs it found to the Sinbyte \
                  indexing service, one domain at a time."
)]
pub struct Cli {
    /// Base URL of the crawl backend
    #[arg(
        long,
        global = true,
        env = "RELAY_API_BASE",
        default_value = "http://localhost:8000"
    )]
    pub api_base: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Crawl the sitemaps of one or more domains
    ///
    /// Example: sitemap-relay crawl example.com rust-lang.org --output results.json
    Crawl {
        /// Domains to crawl (separate words or comma-separated)
        #[arg(required = true, num_args = 1..)]
        domains: Vec<String>,

        /// Save the collected results to this JSON file
        #[arg(long, short)]
        output: Option<PathBuf>,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Submit the URLs of a saved crawl to Sinbyte
    ///
    /// Example: sitemap-relay submit results.json
    Submit {
        /// JSON file written by `crawl --output`
        results: PathBuf,

        #[command(flatten)]
        submit: SubmitArgs,

        /// Output results in JSON format instead of a table
        #[arg(long)]
        json: bool,
    },

    /// Crawl some domains, then submit everything that was found
    Run {
        /// Domains to crawl (separate words or comma-separated)
        #[arg(required = true, num_args = 1..)]
        domains: Vec<String>,

        /// Also save the collected results to this JSON file
        #[arg(long, short)]
        output: Option<PathBuf>,

        #[command(flatten)]
        submit: SubmitArgs,

        /// Output results in JSON format instead of tables
        #[arg(long)]
        json: bool,
    },

    /// Export the unique URLs of a saved crawl
    Export {
        /// JSON file written by `crawl --output`
        results: PathBuf,

        /// File format
        #[arg(long, value_enum, default_value_t = ExportFormat::Csv)]
        format: ExportFormat,

        /// Write to this file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
}

/// Flags shared by every command that talks to the submission endpoint.
#[derive(Args, Debug, Clone)]
pub struct SubmitArgs {
    /// Sinbyte API key
    #[arg(long, env = "SINBYTE_API_KEY", hide_env_values = true)]
    pub api_key: Option<String>,

    /// Submission endpoint (default: the backend proxy at <api-base>/api/sinbyte/submit).
    /// Use https://app.sinbyte.com/api/indexing/ to skip the proxy.
    #[arg(long, env = "RELAY_SUBMIT_URL")]
    pub submit_url: Option<String>,

    /// Pause between two submissions, in milliseconds
    #[arg(long, default_value_t = 500)]
    pub delay_ms: u64,

    /// Dripfeed value forwarded to Sinbyte as-is
    #[arg(long, default_value_t = 1)]
    pub dripfeed: u32,

    /// Timeout for each submission call, in seconds
    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,
}

// -----------------------------------------------------------------------------
// NOTES:
//
// 1. Why `global = true` on --api-base?
//    - It can be written before or after the subcommand name
//    - `sitemap-relay --api-base http://x crawl a.com` and
//      `sitemap-relay crawl a.com --api-base http://x` both work
//
// 2. What does `env = "..."` do?
//    - If the flag is missing, clap reads the environment variable instead
//    - hide_env_values keeps the API key out of --help output
//
// 3. What is #[command(flatten)]?
//    - Inlines the fields of another Args struct into this subcommand
//    - `submit` and `run` share SubmitArgs without repeating them
// -----------------------------------------------------------------------------
