// src/report.rs
// =============================================================================
// Everything the user sees in the terminal.
//
// - ConsoleCrawlObserver / ConsoleBatchObserver print one line per event
//   while a run is going (nothing in --json mode, where stdout must stay a
//   single JSON document)
// - print_* functions render the final tables or JSON
// =============================================================================

use anyhow::Result;
use serde::Serialize;

use crate::error::StreamError;
use crate::format::{format_duration, truncate_domain};
use crate::model::{BatchItemOutcome, BatchSummary, ItemStatus, Progress, SiteCrawlResult};
use crate::stream::CrawlObserver;
use crate::submit::{BatchReport, DispatchObserver};

const DOMAIN_WIDTH: usize = 35;

pub struct ConsoleCrawlObserver {
    quiet: bool,
}

impl ConsoleCrawlObserver {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl CrawlObserver for ConsoleCrawlObserver {
    fn on_result(&mut self, result: &SiteCrawlResult, progress: Progress) {
        if self.quiet {
            return;
        }
        let duration = result.duration.map(format_duration).unwrap_or_default();
        if result.is_success() {
            println!(
                "  [{}/{}] ✅ {} - {} URLs in {} sitemap(s) {}",
                progress.current,
                progress.total,
                result.domain,
                result.collapsed_urls().len(),
                result.sitemaps.len(),
                duration
            );
        } else {
            println!(
                "  [{}/{}] ❌ {} - {} {}",
                progress.current,
                progress.total,
                result.domain,
                result.error.as_deref().unwrap_or("unknown error"),
                duration
            );
        }
    }

    fn on_complete(&mut self, results: &[SiteCrawlResult]) {
        if self.quiet {
            return;
        }
        let succeeded = results.iter().filter(|r| r.is_success()).count();
        println!("\n🏁 Crawl complete: {}/{} succeeded\n", succeeded, results.len());
    }

    fn on_error(&mut self, error: &StreamError) {
        eprintln!("❌ Connection error: {}. Please try again.", error);
    }
}

pub struct ConsoleBatchObserver {
    quiet: bool,
}

impl ConsoleBatchObserver {
    pub fn new(quiet: bool) -> Self {
        Self { quiet }
    }
}

impl DispatchObserver for ConsoleBatchObserver {
    fn on_progress(&mut self, progress: Progress, outcomes: &[BatchItemOutcome]) {
        if self.quiet {
            return;
        }
        if let Some(latest) = outcomes.last() {
            println!(
                "  [{}/{}] {}",
                progress.current,
                progress.total,
                describe_outcome(latest)
            );
        }
    }

    fn on_summary(&mut self, summary: &BatchSummary) {
        if self.quiet || summary.success_count == 0 {
            return;
        }
        println!(
            "\n🏁 Done! {} succeeded, {} failed\n",
            summary.success_count, summary.fail_count
        );
    }
}

fn describe_outcome(outcome: &BatchItemOutcome) -> String {
    match &outcome.status {
        ItemStatus::Success { url_count } => format!("✓ {}: {} URLs", outcome.domain, url_count),
        ItemStatus::Failed { error } => format!("✗ {}: {}", outcome.domain, error),
        ItemStatus::Skipped { message } => format!("- {}: {}", outcome.domain, message),
    }
}

pub fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub fn print_crawl_table(results: &[SiteCrawlResult]) {
    println!(
        "{:<40} {:<10} {:>8} {:>9} {:>10}",
        "DOMAIN", "STATUS", "URLS", "SITEMAPS", "DURATION"
    );
    println!("{}", "=".repeat(81));

    for result in results {
        let status = if result.is_success() { "✅ OK" } else { "❌ FAILED" };
        let duration = result.duration.map(format_duration).unwrap_or_else(|| "-".to_string());
        println!(
            "{:<40} {:<10} {:>8} {:>9} {:>10}",
            truncate_domain(&result.domain, DOMAIN_WIDTH),
            status,
            result.collapsed_urls().len(),
            result.sitemaps.len(),
            duration
        );
        if let Some(error) = &result.error {
            println!("    ↳ {}", error);
        }
    }

    println!();

    let ok_count = results.iter().filter(|r| r.is_success()).count();
    println!("📊 Summary:");
    println!("   ✅ Crawled: {}", ok_count);
    println!("   ❌ Failed: {}", results.len() - ok_count);
    println!("   📋 Total: {}", results.len());
}

pub fn print_batch_table(report: &BatchReport) {
    println!("{:<40} {:<12} {:<40}", "DOMAIN", "STATUS", "DETAIL");
    println!("{}", "=".repeat(92));

    for outcome in &report.outcomes {
        let (status, detail) = match &outcome.status {
            ItemStatus::Success { url_count } => ("✅ SENT", format!("{} URLs", url_count)),
            ItemStatus::Failed { error } => ("❌ FAILED", error.clone()),
            ItemStatus::Skipped { message } => ("⏭️  SKIPPED", message.clone()),
        };
        println!(
            "{:<40} {:<12} {:<40}",
            truncate_domain(&outcome.domain, DOMAIN_WIDTH),
            status,
            detail
        );
    }

    println!();

    let summary = &report.summary;
    println!("📊 Summary:");
    println!("   ✅ Submitted: {}", summary.success_count);
    println!("   ❌ Failed: {}", summary.fail_count);
    println!("   ⏭️  Skipped: {}", summary.skipped_count());
    println!("   📋 Total: {}", summary.total);
}
