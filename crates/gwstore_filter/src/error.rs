//! Error types for filter compilation and evaluation.

use thiserror::Error;

/// Result type for filter operations.
pub type FilterResult<T> = Result<T, FilterError>;

/// Errors produced while compiling or evaluating a filter expression.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum FilterError {
    /// The expression exceeds the maximum accepted length.
    #[error("length must be <= {max}, but got {actual}")]
    TooLong {
        /// Maximum accepted length, in characters.
        max: usize,
        /// Length of the rejected expression, in characters.
        actual: usize,
    },

    /// The expression failed to parse, type-check, or validate.
    #[error("{}", .messages.join("; "))]
    Invalid {
        /// One message per diagnostic, in the order they were reported.
        messages: Vec<String>,
    },

    /// A compiled filter could not be evaluated against a candidate.
    #[error("filter evaluation failed: {message}")]
    Evaluation {
        /// Description of the failure.
        message: String,
    },
}

impl FilterError {
    /// Creates an invalid expression error with a single message.
    pub fn invalid(message: impl Into<String>) -> Self {
        Self::Invalid {
            messages: vec![message.into()],
        }
    }

    /// Creates an evaluation error.
    pub fn evaluation(message: impl Into<String>) -> Self {
        Self::Evaluation {
            message: message.into(),
        }
    }

    /// Returns the individual diagnostic messages.
    #[must_use]
    pub fn messages(&self) -> Vec<String> {
        match self {
            Self::Invalid { messages } => messages.clone(),
            other => vec![other.to_string()],
        }
    }
}
