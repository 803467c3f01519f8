//! Error types for quire.

use thiserror::Error;

/// Result type alias using quire's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for quire operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found or soft-deleted
    #[error("Not found: {0}")]
    NotFound(String),

    /// Note not found or soft-deleted
    #[error("Note not found: {0}")]
    NoteNotFound(uuid::Uuid),

    /// Chat session not found or soft-deleted
    #[error("Chat session not found: {0}")]
    SessionNotFound(uuid::Uuid),

    /// Embedding service call failed
    #[error("Embedding error: {0}")]
    Embedding(String),

    /// Generation service call failed
    #[error("Inference error: {0}")]
    Inference(String),

    /// Object storage operation failed
    #[error("Storage error: {0}")]
    Storage(String),

    /// Page text extraction failed
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input (malformed payloads, empty text, bad identifiers)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// HTTP/network request failed
    #[error("Request error: {0}")]
    Request(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether the failure refers to a missing or soft-deleted resource.
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            Error::NotFound(_) | Error::NoteNotFound(_) | Error::SessionNotFound(_)
        )
    }

    /// Whether retrying the same unit of work can succeed.
    ///
    /// Missing resources and malformed input fail the same way every time.
    pub fn is_permanent(&self) -> bool {
        self.is_not_found() || matches!(self, Error::InvalidInput(_) | Error::Config(_))
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        Error::Request(e.to_string())
    }
}
