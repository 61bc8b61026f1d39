// src/model.rs
// =============================================================================
// Data shared by both halves of the pipeline.
//
// SiteCrawlResult and SitemapResult come from the crawl engine verbatim (one
// JSON object per stream message). BatchItemOutcome, BatchSummary and Progress
// are produced here.
//
// Rust concepts:
// - serde attributes: map the engine's JSON onto our structs, tolerate
//   missing optional fields, ignore unknown ones
// - Tagged enums: one outcome type with a variant per status
// =============================================================================

use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// Outcome of crawling one domain, as reported by the crawl engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CrawlStatus {
    Success,
    Failed,
}

/// One sitemap discovered for a domain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SitemapResult {
    /// URL of the sitemap document
    pub sitemap: String,
    #[serde(default)]
    pub urls: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub count: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SitemapResult {
    /// URLs that count for this sitemap. A sitemap carrying an error
    /// contributes nothing, whatever its `urls` field holds.
    pub fn effective_urls(&self) -> &[String] {
        if self.error.is_some() {
            &[]
        } else {
            &self.urls
        }
    }
}

/// Per-domain result delivered on the crawl stream.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SiteCrawlResult {
    pub domain: String,
    pub status: CrawlStatus,
    #[serde(default)]
    pub sitemaps: Vec<SitemapResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Seconds spent crawling this domain
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total_urls: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub session_id: Option<i64>,
}

impl SiteCrawlResult {
    pub fn is_success(&self) -> bool {
        self.status == CrawlStatus::Success
    }

    /// True when the batch dispatcher should consider this result at all:
    /// a successful crawl that found at least one sitemap.
    pub fn is_submittable(&self) -> bool {
        self.is_success() && !self.sitemaps.is_empty()
    }

    /// All URLs across every sitemap, duplicates collapsed, first-seen order.
    pub fn collapsed_urls(&self) -> Vec<String> {
        let mut seen = HashSet::new();
        self.sitemaps
            .iter()
            .flat_map(|sitemap| sitemap.effective_urls())
            .filter(|url| seen.insert(*url))
            .cloned()
            .collect()
    }
}

/// `{current, total}` counter exposed by both the consumer and the dispatcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Progress {
    pub current: usize,
    pub total: usize,
}

impl Progress {
    pub fn new(total: usize) -> Self {
        Self { current: 0, total }
    }
}

/// What happened to one domain during a dispatch run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ItemStatus {
    /// The URLs were accepted by the submission endpoint
    Success { url_count: usize },
    /// The submission call failed; holds the best error message available
    Failed { error: String },
    /// Nothing to send (the domain produced zero URLs)
    Skipped { message: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BatchItemOutcome {
    pub domain: String,
    #[serde(flatten)]
    pub status: ItemStatus,
}

impl BatchItemOutcome {
    pub fn success(domain: &str, url_count: usize) -> Self {
        Self {
            domain: domain.to_string(),
            status: ItemStatus::Success { url_count },
        }
    }

    pub fn failed(domain: &str, error: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            status: ItemStatus::Failed { error: error.into() },
        }
    }

    pub fn skipped(domain: &str, message: impl Into<String>) -> Self {
        Self {
            domain: domain.to_string(),
            status: ItemStatus::Skipped { message: message.into() },
        }
    }
}

/// Counts of a finished dispatch run. Skipped items only count toward `total`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct BatchSummary {
    pub success_count: usize,
    pub fail_count: usize,
    pub total: usize,
}
