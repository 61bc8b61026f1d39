// src/error.rs
// =============================================================================
// Error types for the relay pipeline.
//
// There are three kinds of failure and they are handled very differently:
// - ValidationError: a precondition was not met, nothing was sent anywhere
// - StreamError: the crawl channel broke, the whole stream run is over
// - SubmissionError: one batch item failed, recorded and the batch moves on
//
// Messages that fail to parse on the stream are not errors at this level:
// they are dropped and logged by the consumer.
// =============================================================================

use thiserror::Error;

/// Precondition failures. Returned before any I/O happens.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("no domains to crawl")]
    NoDomains,

    #[error("domain at position {0} is empty")]
    EmptyDomain(usize),

    #[error("missing API key")]
    MissingCredential,

    #[error("no crawl results to submit")]
    NoResults,

    #[error("no domain was crawled successfully")]
    NoSuccessfulCrawls,
}

/// Transport failures on the incremental crawl channel.
#[derive(Debug, Error)]
pub enum StreamError {
    #[error("connection error: {0}")]
    Connect(#[from] reqwest::Error),

    #[error("crawl stream returned HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("invalid API base URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    #[error("connection closed after {received} of {expected} results")]
    Disconnected { received: usize, expected: usize },
}

/// Failure of a single outbound submission call.
///
/// The dispatcher turns this into a `failed` outcome for that item only.
#[derive(Debug, Error)]
pub enum SubmissionError {
    /// The endpoint answered, but with an error payload or status.
    #[error("{message}")]
    Rejected { status: u16, message: String },

    /// The request never got an answer (connect, timeout, body decode).
    #[error("{0}")]
    Transport(String),
}

impl From<reqwest::Error> for SubmissionError {
    fn from(error: reqwest::Error) -> Self {
        if error.is_timeout() {
            SubmissionError::Transport("Request timed out".to_string())
        } else if error.is_connect() {
            SubmissionError::Transport("Connection failed".to_string())
        } else {
            SubmissionError::Transport(error.to_string())
        }
    }
}
