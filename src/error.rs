// src/error.rs
//! Error taxonomy shared by the feed client, notifier, cursor store and scan driver.

use std::path::PathBuf;

/// Startup configuration problems. Always fatal, raised before any network call.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required setting {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },

    #[error("failed to load keywords from {path}: {reason}")]
    Keywords { path: PathBuf, reason: String },

    #[error("keyword list is empty")]
    NoKeywords,
}

/// A feed call failed: transport, non-2xx status, or a payload we could not decode.
#[derive(Debug, thiserror::Error)]
pub enum UpstreamError {
    #[error("{endpoint}: request failed: {source}")]
    Transport {
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{endpoint}: HTTP {status}: {body}")]
    Status {
        endpoint: String,
        status: u16,
        body: String,
    },

    #[error("{endpoint}: malformed payload: {reason}")]
    Decode { endpoint: String, reason: String },
}

/// A notification could not be delivered.
#[derive(Debug, thiserror::Error)]
pub enum DeliveryError {
    #[error("notification request failed: {0}")]
    Transport(#[source] reqwest::Error),

    #[error("notification rejected with HTTP {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// The cursor record could not be written.
#[derive(Debug, thiserror::Error)]
#[error("cursor write to {path} failed: {source}")]
pub struct PersistenceError {
    pub path: PathBuf,
    #[source]
    pub source: std::io::Error,
}

/// Fatal outcomes of one scan run. Per-item failures never surface here.
#[derive(Debug, thiserror::Error)]
pub enum ScanError {
    #[error("feed head unavailable: {0}")]
    Upstream(#[from] UpstreamError),

    #[error(transparent)]
    Persistence(#[from] PersistenceError),
}

/// Keep response bodies in error messages short.
pub(crate) fn snippet(body: &str) -> String {
    body.chars().take(200).collect()
}
