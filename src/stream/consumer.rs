// src/stream/consumer.rs
// =============================================================================
// The stream consumer: drives one crawl-stream run from start to finish.
//
// Lifecycle:
//   Idle -> Connecting -> Streaming -> Completed | Failed
//   (any non-terminal state) -> Closed, when the owner calls close()
//
// How a run ends:
// - Completed: the completion policy says we have everything (by default,
//   one parsed result per requested domain). We drop the channel ourselves,
//   since the backend never says "done".
// - Failed: the transport broke, or the backend hung up before we had every
//   result. No completion callback fires; the caller starts a new run.
// - Closed: the owner cancelled. No completion callback fires either.
//
// A message that does not parse as a SiteCrawlResult is logged and dropped.
// It does not move progress forward and does not end the run.
//
// Rust concepts:
// - Consuming `self` in run(): a finished consumer cannot be restarted, a new
//   run always needs a new StreamConsumer
// - tokio::select! with `biased`: a pending close always wins over the next
//   message
// - CancellationToken: a cloneable "closed" flag that can also be awaited
// =============================================================================

use futures::stream::{Stream, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::client::CrawlClient;
use crate::error::{StreamError, ValidationError};
use crate::model::{Progress, SiteCrawlResult};
use crate::results::ResultStore;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StreamState {
    Idle,
    Connecting,
    Streaming,
    Completed,
    Failed,
    Closed,
}

impl StreamState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, StreamState::Completed | StreamState::Failed | StreamState::Closed)
    }
}

/// Decides when a stream run has everything it asked for.
///
/// The backend has no end-of-stream signal today; if it grows one, a new
/// policy can replace the count match without touching the consumer.
pub trait CompletionPolicy {
    fn is_complete(&self, received: usize, expected: usize) -> bool;
}

/// Complete once one result per requested domain has been parsed.
#[derive(Debug, Clone, Copy, Default)]
pub struct CountMatch;

impl CompletionPolicy for CountMatch {
    fn is_complete(&self, received: usize, expected: usize) -> bool {
        received == expected
    }
}

/// Callbacks fired while a stream run progresses. All methods default to
/// doing nothing.
pub trait CrawlObserver {
    fn on_result(&mut self, _result: &SiteCrawlResult, _progress: Progress) {}

    fn on_parse_error(&mut self, _payload: &str, _error: &serde_json::Error) {}

    /// Fires at most once per run, only on the Completed transition.
    fn on_complete(&mut self, _results: &[SiteCrawlResult]) {}

    /// Fires at most once per run, only on the Failed transition.
    fn on_error(&mut self, _error: &StreamError) {}
}

impl CrawlObserver for () {}

#[derive(Debug)]
pub enum StreamOutcome {
    Completed,
    Failed(StreamError),
    Closed,
}

/// Everything left over once a run reaches a terminal state.
#[derive(Debug)]
pub struct StreamRun {
    pub outcome: StreamOutcome,
    pub progress: Progress,
    pub results: ResultStore,
}

/// Cancels a stream run from outside (teardown, Ctrl-C). Closing twice is
/// the same as closing once.
#[derive(Debug, Clone, Default)]
pub struct CloseHandle {
    token: CancellationToken,
}

impl CloseHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn close(&self) {
        self.token.cancel();
    }

    pub fn is_closed(&self) -> bool {
        self.token.is_cancelled()
    }

    /// Resolves once `close` has been called, right away if it already was.
    pub async fn closed(&self) {
        self.token.cancelled().await
    }
}

pub struct StreamConsumer<P = CountMatch> {
    domains: Vec<String>,
    state: StreamState,
    progress: Progress,
    store: ResultStore,
    policy: P,
    close: CloseHandle,
}

impl StreamConsumer<CountMatch> {
    /// Validates the domain list. Nothing is opened until `run`.
    pub fn new(domains: Vec<String>) -> Result<Self, ValidationError> {
        Self::with_policy(domains, CountMatch)
    }
}

impl<P: CompletionPolicy> StreamConsumer<P> {
    pub fn with_policy(domains: Vec<String>, policy: P) -> Result<Self, ValidationError> {
        // Reject bad input before any connection exists
        if domains.is_empty() {
            return Err(ValidationError::NoDomains);
        }
        if let Some(index) = domains.iter().position(|d| d.trim().is_empty()) {
            return Err(ValidationError::EmptyDomain(index));
        }

        // One result expected per requested domain, duplicates included
        let total = domains.len();
        Ok(Self {
            domains,
            state: StreamState::Idle,
            progress: Progress::new(total),
            store: ResultStore::with_capacity(total),
            policy,
            close: CloseHandle::new(),
        })
    }

    /// Lets the owner close this run through a handle it already holds.
    pub fn closed_by(mut self, close: CloseHandle) -> Self {
        self.close = close;
        self
    }

    /// Opens the crawl channel through `client` and consumes it to the end.
    pub async fn run(mut self, client: &CrawlClient, observer: &mut impl CrawlObserver) -> StreamRun {
        // Closed before we started: never touch the network
        if self.close.is_closed() {
            return self.close_now();
        }
        self.transition(StreamState::Connecting);

        // Race the connect against a close, close first
        let close = self.close.clone();
        let opened = tokio::select! {
            biased;
            _ = close.closed() => None,
            opened = client.open(&self.domains) => Some(opened),
        };

        match opened {
            None => self.close_now(),
            Some(Err(error)) => self.fail(error, observer),
            Some(Ok(events)) => self.consume(events, observer).await,
        }
    }

    /// Consumes an already-open channel of raw message payloads.
    pub async fn consume<S>(mut self, mut messages: S, observer: &mut impl CrawlObserver) -> StreamRun
    where
        S: Stream<Item = Result<String, StreamError>> + Unpin,
    {
        // A channel handed in directly skips the connect step
        if self.state == StreamState::Idle {
            self.transition(StreamState::Connecting);
        }
        self.transition(StreamState::Streaming);

        let close = self.close.clone();
        loop {
            // The observer may have closed us during the last message
            if close.is_closed() {
                return self.close_now();
            }

            // Wait for the next message unless the owner closes first
            let next = tokio::select! {
                biased;
                _ = close.closed() => None,
                next = messages.next() => Some(next),
            };

            match next {
                None => return self.close_now(),
                Some(Some(Ok(payload))) => {
                    if self.accept(&payload, observer) {
                        // Dropping the stream closes the connection
                        drop(messages);
                        return self.complete(observer);
                    }
                }
                Some(Some(Err(error))) => return self.fail(error, observer),
                // The backend never ends a healthy run, so EOF here means
                // we lost it before every result arrived
                Some(None) => {
                    let error = StreamError::Disconnected {
                        received: self.progress.current,
                        expected: self.progress.total,
                    };
                    return self.fail(error, observer);
                }
            }
        }
    }

    /// Handles one payload. Returns true when the run should complete.
    fn accept(&mut self, payload: &str, observer: &mut impl CrawlObserver) -> bool {
        // Anything that is not a site result is dropped, progress untouched
        let result: SiteCrawlResult = match serde_json::from_str(payload) {
            Ok(result) => result,
            Err(error) => {
                warn!(
                    %error,
                    payload = %truncate(payload, 200),
                    "dropping crawl message that is not a site result"
                );
                observer.on_parse_error(payload, &error);
                return false;
            }
        };

        // Count it and keep it, in arrival order
        self.progress.current += 1;
        info!(
            domain = %result.domain,
            status = ?result.status,
            current = self.progress.current,
            total = self.progress.total,
            "crawl result received"
        );
        self.store.push(result);

        if let Some(latest) = self.store.snapshot().last() {
            observer.on_result(latest, self.progress);
        }

        // The observer may have closed us from inside on_result
        if self.close.is_closed() {
            return false;
        }

        self.policy
            .is_complete(self.progress.current, self.progress.total)
    }

    // Terminal states are final: later transitions are ignored
    fn transition(&mut self, next: StreamState) {
        if self.state.is_terminal() {
            return;
        }
        debug!(from = ?self.state, to = ?next, "stream state");
        self.state = next;
    }

    fn complete(mut self, observer: &mut impl CrawlObserver) -> StreamRun {
        self.transition(StreamState::Completed);
        info!(
            results = self.store.len(),
            succeeded = self.store.success_count(),
            "crawl stream complete"
        );
        observer.on_complete(self.store.snapshot());
        self.finish(StreamOutcome::Completed)
    }

    fn fail(mut self, error: StreamError, observer: &mut impl CrawlObserver) -> StreamRun {
        self.transition(StreamState::Failed);
        warn!(%error, received = self.progress.current, "crawl stream failed");
        observer.on_error(&error);
        self.finish(StreamOutcome::Failed(error))
    }

    fn close_now(mut self) -> StreamRun {
        self.transition(StreamState::Closed);
        info!(received = self.progress.current, "crawl stream closed by owner");
        self.finish(StreamOutcome::Closed)
    }

    fn finish(self, outcome: StreamOutcome) -> StreamRun {
        debug!(state = ?self.state, "stream run finished");
        StreamRun {
            outcome,
            progress: self.progress,
            results: self.store,
        }
    }
}

fn truncate(text: &str, max: usize) -> &str {
    match text.char_indices().nth(max) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stream::request_error;
    use futures::stream;
    use std::time::Duration;

    const A_COM: &str = r#"{"domain":"a.com","status":"success","sitemaps":[{"sitemap":"s1","urls":["https://a.com/1","https://a.com/2"]}]}"#;
    const B_COM: &str = r#"{"domain":"b.com","status":"failed","error":"timeout"}"#;

    #[derive(Default)]
    struct Recorder {
        seen: Vec<(String, Progress)>,
        parse_errors: usize,
        completions: Vec<Vec<String>>,
        errors: Vec<String>,
        close_on_first: Option<CloseHandle>,
    }

    impl CrawlObserver for Recorder {
        fn on_result(&mut self, result: &SiteCrawlResult, progress: Progress) {
            self.seen.push((result.domain.clone(), progress));
            if let Some(handle) = &self.close_on_first {
                handle.close();
            }
        }

        fn on_parse_error(&mut self, _payload: &str, _error: &serde_json::Error) {
            self.parse_errors += 1;
        }

        fn on_complete(&mut self, results: &[SiteCrawlResult]) {
            self.completions
                .push(results.iter().map(|r| r.domain.clone()).collect());
        }

        fn on_error(&mut self, error: &StreamError) {
            self.errors.push(error.to_string());
        }
    }

    fn domains(list: &[&str]) -> Vec<String> {
        list.iter().map(|d| d.to_string()).collect()
    }

    /// Messages followed by a channel that stays open forever, like the
    /// real backend after its last event.
    fn open_channel(
        messages: Vec<Result<String, StreamError>>,
    ) -> impl Stream<Item = Result<String, StreamError>> + Unpin {
        stream::iter(messages).chain(stream::pending())
    }

    fn ok(payload: &str) -> Result<String, StreamError> {
        Ok(payload.to_string())
    }

    #[test]
    fn test_rejects_empty_domain_list() {
        let err = StreamConsumer::new(vec![]).err().unwrap();
        assert_eq!(err, ValidationError::NoDomains);
    }

    #[test]
    fn test_rejects_blank_domain() {
        let err = StreamConsumer::new(domains(&["a.com", "  "])).err().unwrap();
        assert_eq!(err, ValidationError::EmptyDomain(1));
    }

    #[tokio::test]
    async fn test_completes_after_one_result_per_domain() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(open_channel(vec![ok(A_COM), ok(B_COM)]), &mut recorder)
            .await;

        assert!(matches!(run.outcome, StreamOutcome::Completed));
        assert_eq!(run.progress, Progress { current: 2, total: 2 });
        assert_eq!(recorder.completions, vec![vec!["a.com".to_string(), "b.com".to_string()]]);
        assert_eq!(run.results.snapshot()[1].error.as_deref(), Some("timeout"));
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn test_duplicate_domains_each_need_a_result() {
        let consumer = StreamConsumer::new(domains(&["a.com", "a.com"])).unwrap();

        let run = consumer
            .consume(open_channel(vec![ok(A_COM), ok(A_COM)]), &mut ())
            .await;

        assert!(matches!(run.outcome, StreamOutcome::Completed));
        assert_eq!(run.results.len(), 2);
    }

    #[tokio::test]
    async fn test_keeps_arrival_order_not_request_order() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(open_channel(vec![ok(B_COM), ok(A_COM)]), &mut recorder)
            .await;

        let order: Vec<_> = run.results.snapshot().iter().map(|r| r.domain.as_str()).collect();
        assert_eq!(order, vec!["b.com", "a.com"]);
    }

    #[tokio::test]
    async fn test_malformed_message_does_not_advance_progress() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(
                open_channel(vec![ok(A_COM), ok("{not json"), ok(r#"{"error":"boom"}"#), ok(B_COM)]),
                &mut recorder,
            )
            .await;

        assert!(matches!(run.outcome, StreamOutcome::Completed));
        assert_eq!(recorder.parse_errors, 2);
        let progress: Vec<_> = recorder.seen.iter().map(|(_, p)| p.current).collect();
        assert_eq!(progress, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_messages_past_expected_count_are_ignored() {
        let consumer = StreamConsumer::new(domains(&["a.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(open_channel(vec![ok(A_COM), ok(B_COM)]), &mut recorder)
            .await;

        assert_eq!(run.results.len(), 1);
        assert_eq!(recorder.completions.len(), 1);
        assert_eq!(recorder.seen.len(), 1);
    }

    #[tokio::test]
    async fn test_under_delivery_never_completes() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = tokio::time::timeout(
            Duration::from_millis(50),
            consumer.consume(open_channel(vec![ok(A_COM)]), &mut recorder),
        )
        .await;

        assert!(run.is_err());
        assert!(recorder.completions.is_empty());
    }

    #[tokio::test]
    async fn test_transport_error_fails_without_completion() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let messages = open_channel(vec![
            ok(A_COM),
            Err(StreamError::Connect(request_error())),
            ok(B_COM),
        ]);
        let run = consumer.consume(messages, &mut recorder).await;

        assert!(matches!(run.outcome, StreamOutcome::Failed(StreamError::Connect(_))));
        assert_eq!(recorder.errors.len(), 1);
        assert!(recorder.completions.is_empty());
        assert_eq!(run.progress.current, 1);
    }

    #[tokio::test]
    async fn test_early_hangup_is_a_transport_failure() {
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"])).unwrap();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(stream::iter(vec![ok(A_COM)]), &mut recorder)
            .await;

        assert!(matches!(
            run.outcome,
            StreamOutcome::Failed(StreamError::Disconnected { received: 1, expected: 2 })
        ));
        assert!(recorder.completions.is_empty());
    }

    #[tokio::test]
    async fn test_close_before_start_suppresses_everything() {
        let handle = CloseHandle::new();
        let consumer = StreamConsumer::new(domains(&["a.com"]))
            .unwrap()
            .closed_by(handle.clone());
        handle.close();
        handle.close();
        let mut recorder = Recorder::default();

        let run = consumer
            .consume(open_channel(vec![ok(A_COM)]), &mut recorder)
            .await;

        assert!(matches!(run.outcome, StreamOutcome::Closed));
        assert_eq!(run.results.len(), 0);
        assert!(recorder.completions.is_empty());
        assert!(recorder.errors.is_empty());
    }

    #[tokio::test]
    async fn test_close_from_observer_stops_processing() {
        let handle = CloseHandle::new();
        let consumer = StreamConsumer::new(domains(&["a.com"]))
            .unwrap()
            .closed_by(handle.clone());
        let mut recorder = Recorder {
            close_on_first: Some(handle),
            ..Recorder::default()
        };

        let run = consumer
            .consume(open_channel(vec![ok(A_COM), ok(B_COM)]), &mut recorder)
            .await;

        // a.com alone would have completed the run; the close wins
        assert!(matches!(run.outcome, StreamOutcome::Closed));
        assert!(recorder.completions.is_empty());
        assert_eq!(run.results.len(), 1);
    }

    #[tokio::test]
    async fn test_close_while_waiting_for_messages() {
        let handle = CloseHandle::new();
        let consumer = StreamConsumer::new(domains(&["a.com", "b.com"]))
            .unwrap()
            .closed_by(handle.clone());

        let task = tokio::spawn(async move {
            let mut recorder = Recorder::default();
            let run = consumer
                .consume(open_channel(vec![ok(A_COM)]), &mut recorder)
                .await;
            (run.outcome, recorder.completions.len())
        });

        tokio::time::sleep(Duration::from_millis(20)).await;
        handle.close();

        let (outcome, completions) = task.await.unwrap();
        assert!(matches!(outcome, StreamOutcome::Closed));
        assert_eq!(completions, 0);
    }

    struct FirstResultWins;

    impl CompletionPolicy for FirstResultWins {
        fn is_complete(&self, received: usize, _expected: usize) -> bool {
            received >= 1
        }
    }

    #[tokio::test]
    async fn test_completion_policy_is_pluggable() {
        let consumer =
            StreamConsumer::with_policy(domains(&["a.com", "b.com"]), FirstResultWins).unwrap();

        let run = consumer
            .consume(open_channel(vec![ok(A_COM)]), &mut ())
            .await;

        assert!(matches!(run.outcome, StreamOutcome::Completed));
    }

    #[test]
    fn test_terminal_states() {
        assert!(StreamState::Closed.is_terminal());
        assert!(!StreamState::Streaming.is_terminal());
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        assert_eq!(truncate("héllo", 2), "hé");
        assert_eq!(truncate("abc", 10), "abc");
    }
}
