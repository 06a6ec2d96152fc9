//! Errors - エラー型と分類
//!
//! None of these ever leave `enqueue` or `drain`. They exist so adapters can
//! report what went wrong and so the queue can log it with item context.

use thiserror::Error;

/// Durable storage failed.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("storage I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("queue serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("storage backend error: {0}")]
    Backend(String),
}

/// The connectivity check itself failed. Callers treat this as offline.
#[derive(Debug, Error)]
#[error("connectivity unknown: {0}")]
pub struct ConnectivityError(pub String);

/// A remote submission failed (RemoteSubmissionError).
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SubmitError {
    /// No response (DNS, refused connection, reset, ...).
    #[error("network error: {0}")]
    Network(String),

    #[error("request timed out")]
    Timeout,

    /// The backend answered with a non-success status.
    #[error("rejected with status {status}: {message}")]
    Rejected { status: u16, message: String },

    #[error("{0}")]
    Other(String),
}

/// Why a single item could not be dispatched.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DispatchError {
    #[error(transparent)]
    Remote(#[from] SubmitError),

    /// The stored kind tag is not one this build can submit.
    #[error("unknown sync kind '{0}'")]
    UnknownKind(String),
}

impl DispatchError {
    /// Retrying can never change the outcome.
    pub fn is_permanent(&self) -> bool {
        matches!(self, DispatchError::UnknownKind(_))
    }
}
