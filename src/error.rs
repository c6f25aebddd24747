//! Centralized error types for refundscan.

use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the refundscan library.
#[derive(Error, Debug)]
pub enum RefundError {
    /// The identity provider could not hand out an access token.
    #[error("{0}")]
    Credential(String),

    /// The provider rejected the message listing query.
    #[error("Failed to list messages: {0}")]
    ListFailed(String),

    /// A single message could not be fetched. Never fatal for a scan.
    #[error("Failed to fetch message '{id}': {reason}")]
    MessageFailed { id: String, reason: String },

    /// Transport-level HTTP failure.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// The key-value store could not be read or written.
    #[error("Storage error for key '{key}': {reason}")]
    Storage { key: String, reason: String },

    /// I/O error with the associated file path.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    /// JSON (de)serialization failed.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Convenience alias for `Result<T, RefundError>`.
pub type Result<T> = std::result::Result<T, RefundError>;

impl RefundError {
    /// Create an `Io` variant from a path and an `io::Error`.
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Create a `Storage` variant for a key.
    pub fn storage(key: &str, reason: impl std::fmt::Display) -> Self {
        Self::Storage {
            key: key.to_string(),
            reason: reason.to_string(),
        }
    }
}
