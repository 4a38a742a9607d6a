//! Error types for the KV backend crate.

use thiserror::Error;

/// Result type for backend operations.
pub type KvResult<T> = Result<T, KvError>;

/// Errors that can occur in a KV backend.
#[derive(Debug, Error)]
pub enum KvError {
    /// I/O error from the underlying store.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A sequence could not allocate its next value.
    #[error("sequence exhausted: {message}")]
    SequenceExhausted {
        /// Description of the exhaustion.
        message: String,
    },

    /// The backend rejected an operation in its current state.
    #[error("invalid operation: {message}")]
    InvalidOperation {
        /// Description of why the operation is invalid.
        message: String,
    },

    /// Error surfaced by application code running inside a transaction
    /// closure.
    #[error("{message}")]
    App {
        /// The application error rendered as a message.
        message: String,
    },
}

impl KvError {
    /// Creates a sequence exhausted error.
    pub fn sequence_exhausted(message: impl Into<String>) -> Self {
        Self::SequenceExhausted {
            message: message.into(),
        }
    }

    /// Creates an invalid operation error.
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Wraps an application-level error so it can cross a transaction
    /// closure boundary.
    pub fn app(message: impl Into<String>) -> Self {
        Self::App {
            message: message.into(),
        }
    }
}
