// src/submit/dispatcher.rs
// =============================================================================
// The batch dispatcher: sends each successful crawl's URLs to the submission
// endpoint, one domain at a time.
//
// How it works:
// 1. Check preconditions (API key, some results, some successful crawls).
//    Any miss is a ValidationError and nothing is sent.
// 2. Keep the results that succeeded with at least one sitemap, in order.
// 3. For each of them, collapse the URLs of all its sitemaps into one list.
//    An empty list is recorded as skipped without a call.
// 4. Otherwise make exactly one call and record success or failure. A failed
//    item never stops the batch.
// 5. Report progress after every item, then the summary at the end.
//
// Pacing:
// - Calls are strictly sequential: the next call is only issued once the
//   previous one has answered.
// - A fixed delay separates two consecutive calls. Skipped items neither wait
//   nor cause a wait, and nothing waits after the last item.
// =============================================================================

use serde::Serialize;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::client::Submitter;
use crate::error::ValidationError;
use crate::model::{BatchItemOutcome, BatchSummary, Progress, SiteCrawlResult};

/// Pause between two consecutive submission calls.
pub const DEFAULT_PACING: Duration = Duration::from_millis(500);

const NO_URLS_MESSAGE: &str = "No URLs found";

/// Callbacks fired while a batch runs. Both default to doing nothing.
pub trait DispatchObserver {
    /// After every item; `outcomes` holds everything recorded so far.
    fn on_progress(&mut self, _progress: Progress, _outcomes: &[BatchItemOutcome]) {}

    /// Once, when the batch is over.
    fn on_summary(&mut self, _summary: &BatchSummary) {}
}

impl DispatchObserver for () {}

/// Stops one batch run before its next call. Items already sent stay sent.
///
/// Each run gets its own handle, so a cancelled run never affects the next.
#[derive(Debug, Clone, Default)]
pub struct CancelHandle(CancellationToken);

impl CancelHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.cancel();
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.is_cancelled()
    }

    /// Resolves once `cancel` has been called.
    pub async fn cancelled(&self) {
        self.0.cancelled().await
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct BatchReport {
    pub outcomes: Vec<BatchItemOutcome>,
    pub summary: BatchSummary,
}

pub struct BatchDispatcher<S> {
    submitter: S,
    pacing: Duration,
}

impl<S: Submitter> BatchDispatcher<S> {
    pub fn new(submitter: S) -> Self {
        Self {
            submitter,
            pacing: DEFAULT_PACING,
        }
    }

    pub fn with_pacing(mut self, pacing: Duration) -> Self {
        self.pacing = pacing;
        self
    }

    /// Runs one batch over `results` and reports what happened to each domain.
    ///
    /// `results` is only read. The credential is used for this call and not
    /// kept anywhere. `cancel` stops the run before its next call; whatever
    /// was recorded until then is still summarised.
    pub async fn submit_batch(
        &self,
        credential: &str,
        results: &[SiteCrawlResult],
        cancel: &CancelHandle,
        observer: &mut impl DispatchObserver,
    ) -> Result<BatchReport, ValidationError> {
        // Preconditions, in order. Nothing is sent when one fails.
        if credential.trim().is_empty() {
            return Err(ValidationError::MissingCredential);
        }
        if results.is_empty() {
            return Err(ValidationError::NoResults);
        }

        // Only successful crawls with at least one sitemap, order preserved
        let eligible: Vec<&SiteCrawlResult> =
            results.iter().filter(|r| r.is_submittable()).collect();
        if eligible.is_empty() {
            return Err(ValidationError::NoSuccessfulCrawls);
        }

        let total = eligible.len();
        info!(total, of = results.len(), "starting batch submission");

        // Fresh for every run
        let mut outcomes = Vec::with_capacity(total);
        let mut made_a_call = false;

        for (index, crawl) in eligible.into_iter().enumerate() {
            // Cooperative cancel, checked before every item
            if cancel.is_cancelled() {
                warn!(remaining = total - index, "batch cancelled");
                break;
            }

            // One deduplicated URL list per domain, across all its sitemaps
            let urls = crawl.collapsed_urls();
            let outcome = if urls.is_empty() {
                // Nothing to send: no call and no pause
                info!(domain = %crawl.domain, "skipping domain without urls");
                BatchItemOutcome::skipped(&crawl.domain, NO_URLS_MESSAGE)
            } else {
                // Pause only between two real calls. A cancel during the
                // pause means this call is never sent.
                if made_a_call {
                    let cancelled = tokio::select! {
                        biased;
                        _ = cancel.cancelled() => true,
                        _ = tokio::time::sleep(self.pacing) => false,
                    };
                    if cancelled {
                        warn!(remaining = total - index, "batch cancelled during pacing");
                        break;
                    }
                }
                made_a_call = true;

                // Awaited in place, so the next call waits for this answer
                self.submit_one(credential, crawl, &urls).await
            };

            // Report after every item, skips included
            outcomes.push(outcome);
            observer.on_progress(
                Progress {
                    current: index + 1,
                    total,
                },
                &outcomes,
            );
        }

        let summary = BatchSummary::from_outcomes(&outcomes);
        info!(
            succeeded = summary.success_count,
            failed = summary.fail_count,
            total = summary.total,
            "batch submission finished"
        );
        observer.on_summary(&summary);

        Ok(BatchReport { outcomes, summary })
    }

    // A failure becomes data for this item only; the batch goes on
    async fn submit_one(
        &self,
        credential: &str,
        crawl: &SiteCrawlResult,
        urls: &[String],
    ) -> BatchItemOutcome {
        let name = display_name(&crawl.domain);
        match self.submitter.submit(credential, &name, urls).await {
            Ok(_) => {
                info!(domain = %crawl.domain, urls = urls.len(), "submitted");
                BatchItemOutcome::success(&crawl.domain, urls.len())
            }
            Err(error) => {
                warn!(domain = %crawl.domain, %error, "submission failed");
                BatchItemOutcome::failed(&crawl.domain, error.to_string())
            }
        }
    }
}

/// Name shown for a submission in the indexing service.
pub fn display_name(domain: &str) -> String {
    format!("Crawl {}", domain)
}
