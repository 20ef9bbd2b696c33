//! Transport error types

use std::time::Duration;
use thiserror::Error;

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, TransportError>;

/// Errors that can occur during a round trip with the backend
#[derive(Debug, Error)]
pub enum TransportError {
    /// Writing, flushing or reading a pipe failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend closed its output stream, or the transport was shut down
    #[error("Connection closed: {0}")]
    Closed(String),

    /// The round trip did not complete within the call timeout
    #[error("Round trip timed out after {0:?}")]
    Timeout(Duration),

    /// An earlier round trip was abandoned while its request line was being
    /// written, so the backend's framing can no longer be trusted
    #[error("Transport desynchronized: an earlier request was abandoned mid-write")]
    Desynchronized,

    /// The request cannot be framed as a single line
    #[error("Invalid frame: {0}")]
    InvalidFrame(String),

    /// Spawning, signalling or reaping the backend process failed
    #[error("Process error: {0}")]
    Process(String),
}

impl TransportError {
    /// Whether no later call on the same transport can succeed
    ///
    /// Timeouts and I/O errors are not fatal by themselves. If one left a
    /// request line half written, it is the *next* call that reports
    /// `Desynchronized`.
    pub fn is_fatal(&self) -> bool {
        matches!(
            self,
            Self::Closed(_) | Self::Desynchronized | Self::Process(_)
        )
    }
}
