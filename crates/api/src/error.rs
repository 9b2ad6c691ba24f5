//! API client error types

use reqwest::StatusCode;
use thiserror::Error;

/// Result type for API client operations
pub type Result<T> = std::result::Result<T, ApiError>;

/// API client errors
#[derive(Debug, Error)]
pub enum ApiError {
    /// Reading a certificate or key file failed
    #[error("failed to read '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Certificates could not be turned into a TLS setup
    #[error("could not set up TLS: {0}")]
    Tls(#[source] reqwest::Error),

    /// The HTTP client could not be built
    #[error("could not build HTTP client: {0}")]
    Build(#[source] reqwest::Error),

    /// The request never produced a response
    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    /// The daemon answered with a non-2xx status
    #[error("HTTP {status}: {body}")]
    Status { status: StatusCode, body: String },

    /// The response body did not match the expected type
    #[error("could not decode response from {endpoint}: {source}")]
    Decode {
        endpoint: String,
        #[source]
        source: serde_json::Error,
    },
}

impl ApiError {
    /// HTTP status reported by the daemon, if any
    pub fn status_code(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport { source, .. } => source.status(),
            _ => None,
        }
    }
}
