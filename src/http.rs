// src/http.rs
//! Shared send path for outbound calls. Timeouts are set on the request; retry
//! is opt-in per client and only covers transport errors and 5xx answers.

use reqwest::{RequestBuilder, Response};
use std::time::Duration;

pub(crate) const USER_AGENT: &str = concat!("kap-buyback-notifier/", env!("CARGO_PKG_VERSION"));

/// Send `req`, retrying up to `attempts` total tries with exponential backoff.
/// Returns the last response whatever its status; callers decide what a non-2xx means.
pub(crate) async fn send_with_retry(
    req: RequestBuilder,
    attempts: u8,
    what: &str,
) -> Result<Response, reqwest::Error> {
    let attempts = attempts.max(1);
    let mut attempt: u8 = 0;
    loop {
        attempt += 1;
        // Streaming bodies cannot be cloned; those get exactly one try.
        let Some(this) = req.try_clone() else {
            return req.send().await;
        };
        let retryable = match this.send().await {
            Ok(rsp) if rsp.status().is_server_error() && attempt < attempts => {
                format!("HTTP {}", rsp.status())
            }
            Ok(rsp) => return Ok(rsp),
            Err(e) if attempt < attempts && !e.is_builder() => e.without_url().to_string(),
            Err(e) => return Err(e),
        };
        tracing::warn!(what, attempt, attempts, reason = %retryable, "retrying request");
        tokio::time::sleep(backoff(attempt)).await;
    }
}

fn backoff(attempt: u8) -> Duration {
    Duration::from_millis(500u64 << (attempt.saturating_sub(1)).min(6))
}
