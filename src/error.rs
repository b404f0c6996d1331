//! Error types for the news pipeline.
//!
//! Per-item and per-source failures are absorbed at stage boundaries, so most
//! of these never reach the caller of [`crate::pipeline::NewsPipeline::run`].
//! They exist so the absorbing code can log a precise cause.

use thiserror::Error;

/// A single HTTP fetch failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request exceeded its per-request timeout.
    #[error("request to {url} timed out")]
    Timeout { url: String },

    /// Connection, TLS, redirect-limit or body-decoding failure.
    #[error("request to {url} failed: {message}")]
    Network { url: String, message: String },

    /// The server answered with a non-success status.
    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    /// The URL could not be parsed or is empty.
    #[error("invalid URL: {0:?}")]
    InvalidUrl(String),

    /// The HTTP client could not be constructed.
    #[error("HTTP client could not be built: {0}")]
    Client(String),
}

impl FetchError {
    /// Classify a `reqwest` failure for `url`.
    pub fn from_reqwest(url: &str, err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            FetchError::Timeout {
                url: url.to_string(),
            }
        } else if err.is_builder() {
            FetchError::InvalidUrl(url.to_string())
        } else {
            FetchError::Network {
                url: url.to_string(),
                message: err.to_string(),
            }
        }
    }

    /// Whether retrying the same request could plausibly succeed.
    pub fn is_transient(&self) -> bool {
        match self {
            FetchError::Timeout { .. } | FetchError::Network { .. } => true,
            FetchError::Status { status, .. } => *status >= 500 || *status == 429,
            FetchError::InvalidUrl(_) | FetchError::Client(_) => false,
        }
    }
}

/// Syndication XML could not be parsed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("malformed feed XML at byte {position}: {message}")]
    Malformed { position: u64, message: String },
}

/// Configuration could not be loaded or is out of range.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

/// A systemic failure that aborts a pipeline run.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Nothing to fetch; valid configuration never produces this.
    #[error("no sources configured")]
    NoSources,

    #[error(transparent)]
    Config(#[from] ConfigError),
}
