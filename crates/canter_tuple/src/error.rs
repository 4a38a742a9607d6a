//! Error types for the tuple crate.

use thiserror::Error;

/// Result type for tuple operations.
pub type TupleResult<T> = Result<T, TupleError>;

/// Errors that can occur while decoding a tuple encoding.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TupleError {
    /// Unexpected end of input.
    #[error("unexpected end of input")]
    UnexpectedEof,

    /// The type tag is not one this crate produces.
    #[error("unknown type tag: {tag:#04x}")]
    UnknownTag {
        /// The offending tag byte.
        tag: u8,
    },

    /// The payload following a valid tag is malformed.
    #[error("invalid payload: {message}")]
    InvalidPayload {
        /// Description of the malformation.
        message: String,
    },
}

impl TupleError {
    /// Creates an invalid payload error.
    pub fn invalid_payload(message: impl Into<String>) -> Self {
        Self::InvalidPayload {
            message: message.into(),
        }
    }
}
