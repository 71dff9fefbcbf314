//! Error types for talking to map services.

use thiserror::Error;

/// Result type alias using FetchError.
pub type FetchResult<T> = Result<T, FetchError>;

/// Failure to retrieve a document from a map service.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("Invalid service URL '{url}': {message}")]
    InvalidUrl { url: String, message: String },

    #[error("Request to {url} failed: {message}")]
    Transport { url: String, message: String },

    #[error("Service at {url} responded with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Service at {url} returned an empty response")]
    EmptyResponse { url: String },
}

impl FetchError {
    /// The URL the failed request was aimed at.
    pub fn url(&self) -> &str {
        match self {
            FetchError::InvalidUrl { url, .. }
            | FetchError::Transport { url, .. }
            | FetchError::Status { url, .. }
            | FetchError::EmptyResponse { url } => url,
        }
    }

    /// Whether the service answered at all (as opposed to a connection problem).
    pub fn is_http_status(&self) -> bool {
        matches!(self, FetchError::Status { .. })
    }
}
