//! Backend error types.

use thiserror::Error;

/// Errors reported by a search backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// An index with this name already exists.
    #[error("index already exists: {0}")]
    IndexExists(String),

    /// The named index does not exist.
    #[error("index not found: {0}")]
    IndexNotFound(String),

    /// Index settings were rejected.
    #[error("invalid settings for index {index}: {reason}")]
    InvalidSettings {
        /// The index being created.
        index: String,
        /// Why the settings were rejected.
        reason: String,
    },

    /// The backend cannot evaluate the query.
    #[error("unsupported query: {0}")]
    UnsupportedQuery(String),

    /// The scroll cursor expired or was never opened.
    #[error("scroll expired: {0}")]
    ScrollExpired(String),

    /// Transport or request failure.
    #[error("request failed: {0}")]
    Request(String),
}

impl BackendError {
    /// Create a request error from any displayable message.
    pub fn request(message: impl Into<String>) -> Self {
        BackendError::Request(message.into())
    }
}
