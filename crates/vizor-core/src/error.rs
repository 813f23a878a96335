//! Error types for vizor.

use thiserror::Error;

/// Result type alias using vizor's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for vizor operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Provider unreachable or answered with a non-2xx status.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Provider payload did not have the expected shape.
    #[error("Malformed response: {0}")]
    MalformedResponse(String),

    /// Blob store read/write failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Transport(e.to_string())
    }
}
