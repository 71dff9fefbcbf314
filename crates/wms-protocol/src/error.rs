//! Errors raised while reading a capabilities document.

use thiserror::Error;

/// Result type alias using CapabilityError.
pub type CapabilityResult<T> = Result<T, CapabilityError>;

#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("XML parsing error at position {position}: {message}")]
    Xml { position: usize, message: String },

    #[error("Document contains no root element")]
    Empty,

    #[error("Expected WMS_Capabilities root element, found '{0}'")]
    UnexpectedRoot(String),

    #[error("Service exception: {0}")]
    ServiceException(String),

    #[error("Required element missing: {0}")]
    MissingElement(String),
}
