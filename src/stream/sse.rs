// src/stream/sse.rs
// =============================================================================
// Server-sent events decoding.
//
// The crawl backend answers `crawl-stream` with `text/event-stream`: blocks of
// `field: value` lines separated by a blank line. We only care about `data`
// fields; each completed event yields its data payload (multiple data lines
// joined with '\n'). Comment lines (starting with ':') and other fields such
// as `event:`, `id:`, `retry:` are skipped.
//
// Network chunks do not line up with lines, so raw bytes are buffered until a
// full line is available. Buffering bytes (rather than text) keeps multi-byte
// UTF-8 characters intact when they are split across chunks.
// =============================================================================

use bytes::Bytes;
use futures::stream::Stream;
use std::pin::Pin;
use std::task::{Context, Poll};

use crate::error::StreamError;

/// Stream adapter turning a raw response body into SSE data payloads.
pub struct EventStream {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>,
    buffer: Vec<u8>,
    // data lines of the event currently being assembled
    data: Vec<String>,
    finished: bool,
}

impl EventStream {
    pub fn new(
        byte_stream: impl Stream<Item = Result<Bytes, reqwest::Error>> + Send + 'static,
    ) -> Self {
        Self {
            inner: Box::pin(byte_stream),
            buffer: Vec::new(),
            data: Vec::new(),
            finished: false,
        }
    }

    /// Pulls complete lines out of the buffer until an event is dispatched.
    /// Returns `None` when more bytes are needed.
    fn next_event(&mut self) -> Option<String> {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let mut raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            raw.pop();
            if raw.last() == Some(&b'\r') {
                raw.pop();
            }
            let line = String::from_utf8_lossy(&raw);

            // A blank line ends the event
            if line.is_empty() {
                if !self.data.is_empty() {
                    let payload = self.data.join("\n");
                    self.data.clear();
                    return Some(payload);
                }
                continue;
            }

            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (&*line, ""),
            };

            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        None
    }
}

impl Stream for EventStream {
    type Item = Result<String, StreamError>;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        let this = self.get_mut();

        loop {
            if let Some(payload) = this.next_event() {
                return Poll::Ready(Some(Ok(payload)));
            }

            // An event cut off by the end of the body is discarded
            if this.finished {
                return Poll::Ready(None);
            }

            match this.inner.as_mut().poll_next(cx) {
                Poll::Ready(Some(Ok(bytes))) => this.buffer.extend_from_slice(&bytes),
                Poll::Ready(Some(Err(e))) => {
                    this.finished = true;
                    this.buffer.clear();
                    this.data.clear();
                    return Poll::Ready(Some(Err(StreamError::Connect(e))));
                }
                Poll::Ready(None) => this.finished = true,
                Poll::Pending => return Poll::Pending,
            }
        }
    }
}
