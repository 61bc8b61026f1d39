// src/results.rs
// =============================================================================
// The crawl result store: the ordered list of per-domain results for one run.
//
// The stream consumer appends to it in arrival order. Everyone else only ever
// sees a borrowed slice, so nothing downstream can reorder or edit results.
// It can also be saved to / loaded from a JSON file, which is how the
// `submit` and `export` commands get hold of an earlier crawl.
// =============================================================================

use crate::model::SiteCrawlResult;
use anyhow::{Context, Result};
use std::path::Path;

#[derive(Debug, Clone, Default)]
pub struct ResultStore {
    results: Vec<SiteCrawlResult>,
}

impl ResultStore {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            results: Vec::with_capacity(capacity),
        }
    }

    pub(crate) fn push(&mut self, result: SiteCrawlResult) {
        self.results.push(result);
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    /// Read-only view of everything collected so far, in arrival order.
    pub fn snapshot(&self) -> &[SiteCrawlResult] {
        &self.results
    }

    pub fn success_count(&self) -> usize {
        self.results.iter().filter(|r| r.is_success()).count()
    }

    /// Unique URLs across every successful domain, first-seen order.
    pub fn unique_urls(&self) -> Vec<String> {
        let mut seen = std::collections::HashSet::new();
        self.results
            .iter()
            .filter(|r| r.is_success())
            .flat_map(|r| r.collapsed_urls())
            .filter(|url| seen.insert(url.clone()))
            .collect()
    }

    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("reading results from {}", path.display()))?;
        let results: Vec<SiteCrawlResult> = serde_json::from_str(&raw)
            .with_context(|| format!("parsing results in {}", path.display()))?;
        Ok(Self::from(results))
    }

    pub fn save(&self, path: &Path) -> Result<()> {
        let json = serde_json::to_string_pretty(&self.results)?;
        std::fs::write(path, json)
            .with_context(|| format!("writing results to {}", path.display()))?;
        Ok(())
    }
}

impl From<Vec<SiteCrawlResult>> for ResultStore {
    fn from(results: Vec<SiteCrawlResult>) -> Self {
        Self { results }
    }
}
