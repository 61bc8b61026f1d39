// src/submit/client.rs
// =============================================================================
// The outbound submission call.
//
// The dispatcher only knows about the `Submitter` trait: one call, one list
// of URLs, one answer. `SinbyteClient` is the real implementation: a JSON
// POST of `{apikey, name, dripfeed, urls}` either to the crawl backend's
// proxy (`/api/sinbyte/submit`, the default) or straight to the indexing
// service.
//
// Error messages are taken from the response body when the server provides
// one (`message`, then `error`), otherwise we fall back to a generic text.
// =============================================================================

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::SubmissionError;

/// One outbound submission. Implementations must not retry on their own:
/// a failure is reported back and the batch moves on.
#[async_trait]
pub trait Submitter: Send + Sync {
    async fn submit(
        &self,
        credential: &str,
        name: &str,
        urls: &[String],
    ) -> Result<Value, SubmissionError>;
}

/// Wire format of the submission endpoint.
#[derive(Debug, Serialize)]
struct SubmissionRequest<'a> {
    apikey: &'a str,
    name: &'a str,
    dripfeed: u32,
    urls: &'a [String],
}

#[derive(Debug, Clone)]
pub struct SinbyteClient {
    http: Client,
    endpoint: Url,
    dripfeed: u32,
}

impl SinbyteClient {
    pub fn new(endpoint: Url, timeout: Duration, dripfeed: u32) -> Result<Self, SubmissionError> {
        let http = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            dripfeed,
        })
    }
}

#[async_trait]
impl Submitter for SinbyteClient {
    async fn submit(
        &self,
        credential: &str,
        name: &str,
        urls: &[String],
    ) -> Result<Value, SubmissionError> {
        let request = SubmissionRequest {
            apikey: credential,
            name,
            dripfeed: self.dripfeed,
            urls,
        };
        info!(endpoint = %self.endpoint, %name, urls = urls.len(), "submitting urls");

        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;
        // Non-JSON bodies are kept as plain strings
        let body = serde_json::from_str::<Value>(&text).unwrap_or(Value::String(text));
        debug!(status = status.as_u16(), %body, "submission response");

        if status.is_success() {
            return Ok(body);
        }

        let message = server_message(&body).unwrap_or_else(|| format!("HTTP {}", status.as_u16()));
        Err(SubmissionError::Rejected {
            status: status.as_u16(),
            message,
        })
    }
}

/// Best error text the server put in its answer, if any.
fn server_message(body: &Value) -> Option<String> {
    let from_field = |field: &str| {
        body.get(field)
            .and_then(Value::as_str)
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
    };
    from_field("message").or_else(|| from_field("error"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SinbyteClient {
        let endpoint = Url::parse(&format!("{}/api/sinbyte/submit", server.uri())).unwrap();
        SinbyteClient::new(endpoint, Duration::from_secs(5), 1).unwrap()
    }

    #[test]
    fn test_server_message_prefers_message_field() {
        let body = json!({"message": "Invalid API key", "error": "bad request"});
        assert_eq!(server_message(&body).as_deref(), Some("Invalid API key"));
    }

    #[test]
    fn test_server_message_falls_back_to_error_field() {
        let body = json!({"error": "Missing URLs"});
        assert_eq!(server_message(&body).as_deref(), Some("Missing URLs"));
        assert_eq!(server_message(&json!("oops")), None);
    }

    #[tokio::test]
    async fn test_posts_expected_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/sinbyte/submit"))
            .and(body_json(json!({
                "apikey": "secret",
                "name": "Crawl a.com",
                "dripfeed": 1,
                "urls": ["https://a.com/1", "https://a.com/2"]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let urls = vec!["https://a.com/1".to_string(), "https://a.com/2".to_string()];
        let body = client.submit("secret", "Crawl a.com", &urls).await.unwrap();
        assert_eq!(body["status"], "ok");
    }

    #[tokio::test]
    async fn test_error_payload_message_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({"message": "Invalid API key"})))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .submit("wrong", "Crawl a.com", &["https://a.com/".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Invalid API key");
        assert!(matches!(err, SubmissionError::Rejected { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_error_without_message_uses_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502).set_body_string("Bad Gateway"))
            .mount(&server)
            .await;

        let client = client_for(&server).await;
        let err = client
            .submit("key", "Crawl a.com", &["https://a.com/".to_string()])
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "HTTP 502");
    }
}
