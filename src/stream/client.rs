// src/stream/client.rs
// =============================================================================
// Opens the incremental crawl-result channel on the crawl backend.
//
// One GET to `{api_base}/api/crawl-stream?domains=a.com,b.com` per run. The
// response stays open and delivers one SSE event per finished domain; there
// is no end-of-stream marker, so the consumer decides when it is done.
// =============================================================================

use reqwest::Client;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use super::sse::EventStream;
use crate::error::StreamError;

#[derive(Debug, Clone)]
pub struct CrawlClient {
    http: Client,
    base: Url,
}

impl CrawlClient {
    /// Builds a client for the backend at `api_base`.
    ///
    /// Only a connect timeout is set: the stream itself stays open for as long
    /// as the crawl takes.
    pub fn new(api_base: &Url) -> Result<Self, StreamError> {
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base: with_trailing_slash(api_base),
        })
    }

    pub fn stream_url(&self) -> Result<Url, StreamError> {
        Ok(self.base.join("api/crawl-stream")?)
    }

    /// Opens the channel for `domains` (sent as a single comma-joined value).
    pub async fn open(&self, domains: &[String]) -> Result<EventStream, StreamError> {
        let url = self.stream_url()?;
        let joined = domains.join(",");
        info!(%url, domains = domains.len(), "opening crawl stream");

        let response = self
            .http
            .get(url)
            .query(&[("domains", joined.as_str())])
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StreamError::Status {
                status: status.as_u16(),
                body,
            });
        }

        debug!(status = status.as_u16(), "crawl stream connected");
        Ok(EventStream::new(response.bytes_stream()))
    }
}

/// `Url::join` replaces the last path segment unless the base ends in '/'.
pub(crate) fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}
