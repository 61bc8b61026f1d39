// src/main.rs
// =============================================================================
// This is the entry point of our CLI application.
//
// What happens here:
// 1. Load .env, set up logging, parse command-line arguments
// 2. Dispatch to the appropriate subcommand handler
// 3. Print results as they arrive, then a final table (or JSON)
// 4. Exit with proper code (0 = all good, 1 = some domain or submission
//    failed, 2 = error)
//
// Ctrl-C is wired to the close/cancel handles of the stream consumer and the
// batch dispatcher, so an interrupted run stops cleanly instead of dying
// mid-request.
// =============================================================================

mod cli;
mod config;
mod error;
mod export;
mod format;
mod model;
mod report;
mod results;
mod stream;
mod submit;

use anyhow::{Context, Result};
use clap::Parser;
use std::path::{Path, PathBuf};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};
use url::Url;

use cli::{Cli, Commands, SubmitArgs};
use config::RelayConfig;
use error::ValidationError;
use export::ExportFormat;
use model::SiteCrawlResult;
use report::{ConsoleBatchObserver, ConsoleCrawlObserver};
use results::ResultStore;
use stream::{CloseHandle, CrawlClient, StreamOutcome};
use submit::{BatchDispatcher, CancelHandle, SinbyteClient};

#[tokio::main]
async fn main() {
    // A missing .env file is fine
    let _ = dotenvy::dotenv();
    init_tracing();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            eprintln!("Error: {:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

// Diagnostics go to stderr; stdout is reserved for results
fn init_tracing() {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitemap_relay=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let api_base = config::parse_api_base(&cli.api_base)?;

    match cli.command {
        Commands::Crawl { domains, output, json } => {
            let domains = config::normalize_domains(&domains);
            match crawl(&api_base, domains, json).await? {
                Some(store) => {
                    save_if_requested(&store, output.as_deref())?;
                    print_crawl(&store, json)?;
                    Ok(crawl_exit_code(store.snapshot()))
                }
                None => Ok(2),
            }
        }
        Commands::Submit { results, submit, json } => {
            let store = ResultStore::load(&results)?;
            let config = RelayConfig::from_args(&api_base, &submit)?;
            submit_results(store.snapshot(), &config, json).await
        }
        Commands::Run {
            domains,
            output,
            submit,
            json,
        } => handle_run(&api_base, domains, output, &submit, json).await,
        Commands::Export {
            results,
            format,
            output,
        } => handle_export(&results, format, output.as_deref()),
    }
}

// Crawls, then submits. The API key is checked up front so a long crawl is
// not wasted on a run that could never submit.
async fn handle_run(
    api_base: &Url,
    domains: Vec<String>,
    output: Option<PathBuf>,
    submit: &SubmitArgs,
    json: bool,
) -> Result<i32> {
    let config = RelayConfig::from_args(api_base, submit)?;
    if config.api_key.trim().is_empty() {
        return Err(ValidationError::MissingCredential.into());
    }

    let domains = config::normalize_domains(&domains);
    let store = match crawl(api_base, domains, json).await? {
        Some(store) => store,
        None => return Ok(2),
    };
    save_if_requested(&store, output.as_deref())?;
    if !json {
        print_crawl(&store, false)?;
        println!();
    }

    let submit_code = submit_results(store.snapshot(), &config, json).await?;
    Ok(submit_code.max(crawl_exit_code(store.snapshot())))
}

// Runs one stream to a terminal state. Returns the results only when the
// stream completed; failures have already been reported by the observer.
async fn crawl(api_base: &Url, domains: Vec<String>, json: bool) -> Result<Option<ResultStore>> {
    let client = CrawlClient::new(api_base)?;

    if !json && !domains.is_empty() {
        println!("🔍 Crawling {} domain(s) via {}\n", domains.len(), api_base);
    }

    // Ctrl-C closes the stream instead of killing the process
    let close = CloseHandle::new();
    let interrupt = {
        let close = close.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                close.close();
            }
        })
    };

    let mut observer = ConsoleCrawlObserver::new(json);
    let run = stream::start_stream(&client, domains, &close, &mut observer).await;
    interrupt.abort();
    let run = run?;

    match run.outcome {
        StreamOutcome::Completed => Ok(Some(run.results)),
        StreamOutcome::Failed(_) => Ok(None),
        StreamOutcome::Closed => {
            eprintln!(
                "⚠️  Crawl stopped after {}/{} result(s)",
                run.progress.current, run.progress.total
            );
            Ok(None)
        }
    }
}

async fn submit_results(results: &[SiteCrawlResult], config: &RelayConfig, json: bool) -> Result<i32> {
    let client = SinbyteClient::new(config.endpoint.clone(), config.timeout, config.dripfeed)?;
    let dispatcher = BatchDispatcher::new(client).with_pacing(config.pacing);

    // Ctrl-C stops the batch before its next call; this run only
    let cancel = CancelHandle::new();
    let interrupt = {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                cancel.cancel();
            }
        })
    };

    if !json {
        println!("📤 Submitting to {}\n", config.endpoint);
    }

    let mut observer = ConsoleBatchObserver::new(json);
    let report = dispatcher
        .submit_batch(&config.api_key, results, &cancel, &mut observer)
        .await;
    interrupt.abort();
    let report = report?;

    if json {
        report::print_json(&report)?;
    } else {
        report::print_batch_table(&report);
    }

    if report.summary.fail_count > 0 {
        Ok(1)
    } else {
        Ok(0)
    }
}

fn handle_export(results: &Path, format: ExportFormat, output: Option<&Path>) -> Result<i32> {
    let store = ResultStore::load(results)?;
    let urls = store.unique_urls();

    match output {
        Some(path) => {
            let mut file = std::fs::File::create(path)
                .with_context(|| format!("creating {}", path.display()))?;
            export::write_urls(&mut file, &urls, format)?;
            eprintln!("💾 Exported {} URL(s) to {}", urls.len(), path.display());
        }
        None => {
            let stdout = std::io::stdout();
            export::write_urls(&mut stdout.lock(), &urls, format)?;
        }
    }
    Ok(0)
}

fn save_if_requested(store: &ResultStore, output: Option<&Path>) -> Result<()> {
    if let Some(path) = output {
        store.save(path)?;
        eprintln!("💾 Saved {} result(s) to {}", store.len(), path.display());
    }
    Ok(())
}

fn print_crawl(store: &ResultStore, json: bool) -> Result<()> {
    if json {
        report::print_json(store.snapshot())
    } else {
        report::print_crawl_table(store.snapshot());
        Ok(())
    }
}

fn crawl_exit_code(results: &[SiteCrawlResult]) -> i32 {
    if results.iter().all(|r| r.is_success()) {
        0
    } else {
        1
    }
}
