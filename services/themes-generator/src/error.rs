//! Error types for theme generation.

use std::path::PathBuf;

use thiserror::Error;
use wms_common::FetchError;
use wms_protocol::CapabilityError;

/// Result type alias using ThemesError.
pub type ThemesResult<T> = Result<T, ThemesError>;

/// Errors raised while generating the themes document.
///
/// Only [`ThemesError::Config`] aborts a run. Everything else is caught at
/// the theme it belongs to and turned into an error stub.
#[derive(Debug, Error)]
pub enum ThemesError {
    #[error("Invalid themes configuration {path}: {message}")]
    Config { path: PathBuf, message: String },

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error("Invalid GetProjectSettings response: {0}")]
    Capability(#[from] CapabilityError),

    #[error("Thumbnail generation failed: {0}")]
    Thumbnail(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl ThemesError {
    pub fn config(path: impl Into<PathBuf>, message: impl ToString) -> Self {
        ThemesError::Config {
            path: path.into(),
            message: message.to_string(),
        }
    }

    /// Whether this error must stop the whole run.
    pub fn is_fatal(&self) -> bool {
        matches!(self, ThemesError::Config { .. })
    }
}
