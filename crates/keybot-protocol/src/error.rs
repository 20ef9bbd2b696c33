//! Error types for protocol operations

use thiserror::Error;

/// Result type for protocol operations
pub type Result<T> = std::result::Result<T, ProtocolError>;

/// Errors produced while encoding commands or decoding responses
///
/// Decoding is all-or-nothing: any of these errors means no partial result
/// was produced.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// A command could not be serialized
    #[error("Encode error: {0}")]
    Encode(String),

    /// A response was not valid JSON or did not have the expected shape
    #[error("Decode error: {0}")]
    Decode(String),

    /// A response parsed as JSON but lacked a required field
    #[error("Missing required field: {0}")]
    MissingField(String),

    /// The backend answered with an error envelope instead of a result
    #[error("Backend error {code}: {message}")]
    Backend {
        /// Error code reported by the backend
        code: i64,
        /// Human readable message reported by the backend
        message: String,
    },
}

impl From<serde_json::Error> for ProtocolError {
    fn from(err: serde_json::Error) -> Self {
        Self::Decode(err.to_string())
    }
}
