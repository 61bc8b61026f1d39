// src/config.rs
// =============================================================================
// Turns raw command-line values into checked runtime settings.
//
// Everything the pipeline needs is resolved here once: parsed URLs, the
// submission endpoint (the backend proxy unless overridden), durations.
// Domain arguments are normalized the same way the backend splits its
// `domains` query value: comma-split, trimmed, blanks dropped.
// =============================================================================

use anyhow::{Context, Result};
use std::time::Duration;
use url::Url;

use crate::cli::SubmitArgs;
use crate::stream::with_trailing_slash;

const PROXY_SUBMIT_PATH: &str = "api/sinbyte/submit";

#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub endpoint: Url,
    /// Empty when no key was given; the dispatcher rejects it before any I/O
    pub api_key: String,
    pub pacing: Duration,
    pub dripfeed: u32,
    pub timeout: Duration,
}

pub fn parse_api_base(raw: &str) -> Result<Url> {
    Url::parse(raw).with_context(|| format!("invalid --api-base '{}'", raw))
}

impl RelayConfig {
    pub fn from_args(api_base: &Url, args: &SubmitArgs) -> Result<Self> {
        let endpoint = match &args.submit_url {
            Some(raw) => {
                Url::parse(raw).with_context(|| format!("invalid --submit-url '{}'", raw))?
            }
            None => with_trailing_slash(api_base).join(PROXY_SUBMIT_PATH)?,
        };

        Ok(Self {
            endpoint,
            api_key: args.api_key.clone().unwrap_or_default(),
            pacing: Duration::from_millis(args.delay_ms),
            dripfeed: args.dripfeed,
            timeout: Duration::from_secs(args.timeout_secs),
        })
    }
}

/// "a.com,b.com" "c.com" -> ["a.com", "b.com", "c.com"]
pub fn normalize_domains(args: &[String]) -> Vec<String> {
    args.iter()
        .flat_map(|arg| arg.split(','))
        .map(str::trim)
        .filter(|d| !d.is_empty())
        .map(str::to_string)
        .collect()
}
