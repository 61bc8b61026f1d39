// src/stream/mod.rs
// =============================================================================
// Consuming the incremental crawl-result stream.
//
// Submodules:
// - sse: decodes a `text/event-stream` body into data payloads
// - client: opens the `crawl-stream` channel on the crawl backend
// - consumer: the per-run state machine (progress, completion, close)
// =============================================================================

mod client;
mod consumer;
mod sse;

pub(crate) use client::with_trailing_slash;
pub use client::CrawlClient;
pub use consumer::{CloseHandle, CrawlObserver, StreamOutcome, StreamRun};

use crate::error::ValidationError;
use consumer::StreamConsumer;

/// Validates `domains`, opens one channel for them and consumes it until the
/// run reaches a terminal state. `close` ends the run early from anywhere.
pub async fn start_stream(
    client: &CrawlClient,
    domains: Vec<String>,
    close: &CloseHandle,
    observer: &mut impl CrawlObserver,
) -> Result<StreamRun, ValidationError> {
    let consumer = StreamConsumer::new(domains)?.closed_by(close.clone());
    Ok(consumer.run(client, observer).await)
}

/// A real `reqwest::Error`, built without touching the network.
#[cfg(test)]
pub(crate) fn request_error() -> reqwest::Error {
    reqwest::Client::new().get("not a url").build().unwrap_err()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::StreamError;
    use url::Url;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_start_stream_rejects_empty_list_without_io() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CrawlClient::new(&Url::parse(&server.uri()).unwrap()).unwrap();
        let err = start_stream(&client, vec![], &CloseHandle::new(), &mut ()).await.err().unwrap();
        assert_eq!(err, ValidationError::NoDomains);
    }

    #[tokio::test]
    async fn test_start_stream_end_to_end() {
        let body = concat!(
            "data: {\"domain\":\"a.com\",\"status\":\"success\",\"sitemaps\":[{\"sitemap\":\"s1\",\"urls\":[\"https://a.com/1\",\"https://a.com/2\"]}]}\n\n",
            "data: {\"domain\":\"b.com\",\"status\":\"failed\",\"error\":\"timeout\"}\n\n",
        );
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/crawl-stream"))
            .and(query_param("domains", "a.com,b.com"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/event-stream")
                    .set_body_string(body),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = CrawlClient::new(&Url::parse(&server.uri()).unwrap()).unwrap();
        let domains = vec!["a.com".to_string(), "b.com".to_string()];
        let run = start_stream(&client, domains, &CloseHandle::new(), &mut ()).await.unwrap();

        assert!(matches!(run.outcome, StreamOutcome::Completed));
        assert_eq!(run.progress.current, 2);
        assert_eq!(run.progress.total, 2);
        assert_eq!(run.results.snapshot()[0].domain, "a.com");
        assert_eq!(run.results.snapshot()[1].domain, "b.com");
    }

    #[tokio::test]
    async fn test_start_stream_connection_refused_fails() {
        // Nothing listens on port 9 (discard) on test machines
        let client = CrawlClient::new(&Url::parse("http://127.0.0.1:9").unwrap()).unwrap();
        let run = start_stream(&client, vec!["a.com".to_string()], &CloseHandle::new(), &mut ())
            .await
            .unwrap();

        assert!(matches!(run.outcome, StreamOutcome::Failed(StreamError::Connect(_))));
        assert_eq!(run.results.len(), 0);
    }

    #[tokio::test]
    async fn test_start_stream_closed_handle_makes_no_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let client = CrawlClient::new(&Url::parse(&server.uri()).unwrap()).unwrap();
        let close = CloseHandle::new();
        close.close();
        let run = start_stream(&client, vec!["a.com".to_string()], &close, &mut ())
            .await
            .unwrap();

        assert!(matches!(run.outcome, StreamOutcome::Closed));
    }
}
