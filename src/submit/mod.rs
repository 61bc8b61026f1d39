// src/submit/mod.rs
// =============================================================================
// Forwarding crawled URLs to the indexing service.
//
// Submodules:
// - client: the Submitter seam and the HTTP implementation
// - dispatcher: sequential, paced, failure-isolated batch submission
// - summary: folding per-item outcomes into a BatchSummary
// =============================================================================

mod client;
mod dispatcher;
mod summary;

pub use client::SinbyteClient;
pub use dispatcher::{BatchDispatcher, BatchReport, CancelHandle, DispatchObserver};
