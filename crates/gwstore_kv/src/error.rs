//! Error types for key-value operations.

use thiserror::Error;

/// Result type for key-value operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur during key-value operations.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum KvError {
    /// The requested key does not exist.
    #[error("key not found: {key}")]
    NotFound {
        /// The key that was looked up.
        key: String,
    },

    /// The caller passed arguments the backend cannot serve.
    #[error("invalid argument: {message}")]
    InvalidArgument {
        /// Description of the problem.
        message: String,
    },

    /// The transaction was already committed or rolled back.
    #[error("transaction is closed")]
    TransactionClosed,

    /// The backend failed to serve the request.
    #[error("backend failure: {message}")]
    Backend {
        /// Description of the failure.
        message: String,
    },
}

impl KvError {
    /// Creates a not found error.
    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound { key: key.into() }
    }

    /// Creates an invalid argument error.
    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Creates a backend failure error.
    pub fn backend(message: impl Into<String>) -> Self {
        Self::Backend {
            message: message.into(),
        }
    }

    /// Returns true if this is a not found error.
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}
