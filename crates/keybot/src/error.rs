//! Error types for the chat client
//!
//! Errors carry recovery guidance through [`ErrorRecovery`], which the
//! unread listener consults to decide between retrying and giving up.

use keybot_protocol::ProtocolError;
use keybot_transport::TransportError;
use thiserror::Error;

/// Result type for client operations
pub type Result<T> = std::result::Result<T, ChatError>;

/// Error recovery guidance
pub trait ErrorRecovery {
    /// Whether repeating the same operation could succeed
    fn is_retriable(&self) -> bool;

    /// Whether the client can no longer make any call
    fn is_fatal(&self) -> bool;

    /// User-facing action to take
    fn suggested_action(&self) -> &'static str;
}

/// Errors that can occur in client operations
#[derive(Debug, Error)]
pub enum ChatError {
    /// The round trip with the backend failed
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// A command could not be encoded, or a response could not be decoded
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// The listener task ended abnormally
    #[error("Listener stopped: {0}")]
    ListenerStopped(String),
}

impl ChatError {
    /// Whether a response arrived but could not be understood
    pub fn is_decode_failure(&self) -> bool {
        matches!(
            self,
            Self::Protocol(ProtocolError::Decode(_) | ProtocolError::MissingField(_))
        )
    }
}

impl ErrorRecovery for ChatError {
    fn is_retriable(&self) -> bool {
        match self {
            Self::Transport(err) => {
                !err.is_fatal() && !matches!(err, TransportError::InvalidFrame(_))
            }
            // The backend may send a well-formed reply next time; backend
            // errors such as an unknown conversation are often transient.
            Self::Protocol(ProtocolError::Encode(_)) => false,
            Self::Protocol(_) => true,
            Self::Config(_) => false,
            Self::ListenerStopped(_) => false,
        }
    }

    fn is_fatal(&self) -> bool {
        match self {
            Self::Transport(err) => err.is_fatal(),
            _ => false,
        }
    }

    fn suggested_action(&self) -> &'static str {
        match self {
            Self::Transport(TransportError::Timeout(_)) => {
                "Round trip timed out. The late response will be skipped; \
                retry, or raise the call timeout if the backend is slow."
            }
            Self::Transport(TransportError::Desynchronized) => {
                "An earlier request was abandoned mid-write. Shut the client \
                down and connect again."
            }
            Self::Transport(TransportError::Closed(_)) => {
                "The chat backend exited or was shut down. Check that it is \
                installed and logged in, then connect again."
            }
            Self::Transport(TransportError::Process(_)) => {
                "The chat backend could not be started or stopped. Check the \
                configured executable path."
            }
            Self::Transport(TransportError::InvalidFrame(_)) => {
                "The request could not be framed as a single line. \
                This is a bug in the caller."
            }
            Self::Transport(TransportError::Io(_)) => {
                "I/O error on the backend pipes. Check process logs for details."
            }
            Self::Protocol(ProtocolError::Backend { .. }) => {
                "The backend rejected the request. Check the conversation id \
                and that the account is logged in."
            }
            Self::Protocol(ProtocolError::Encode(_)) => {
                "The request could not be encoded. Check the message body."
            }
            Self::Protocol(_) => {
                "The backend sent a response that could not be understood. \
                Check the backend version."
            }
            Self::Config(_) => "Fix the configuration and connect again.",
            Self::ListenerStopped(_) => "Start a new listener.",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::time::Duration;

    #[rstest]
    #[case(TransportError::Closed("eof".into()), false, true)]
    #[case(TransportError::Desynchronized, false, true)]
    #[case(TransportError::Process("spawn".into()), false, true)]
    #[case(TransportError::Timeout(Duration::from_secs(1)), true, false)]
    #[case(TransportError::InvalidFrame("newline".into()), false, false)]
    #[case(std::io::Error::other("boom").into(), true, false)]
    fn test_transport_recovery(
        #[case] err: TransportError,
        #[case] retriable: bool,
        #[case] fatal: bool,
    ) {
        let err = ChatError::from(err);
        assert_eq!(err.is_retriable(), retriable, "{err}");
        assert_eq!(err.is_fatal(), fatal, "{err}");
        assert!(!err.suggested_action().is_empty());
    }

    #[test]
    fn test_decode_failures() {
        let decode = ChatError::from(ProtocolError::Decode("eof".into()));
        let missing = ChatError::from(ProtocolError::MissingField("result".into()));
        let backend = ChatError::from(ProtocolError::Backend {
            code: 2,
            message: "no such conversation".into(),
        });

        assert!(decode.is_decode_failure());
        assert!(missing.is_decode_failure());
        assert!(!backend.is_decode_failure());
        assert!(backend.is_retriable());
        assert!(!backend.is_fatal());
    }

    #[test]
    fn test_config_error_not_retriable() {
        let err = ChatError::Config("bad timeout".into());
        assert!(!err.is_retriable());
        assert_eq!(err.to_string(), "Configuration error: bad timeout");
    }
}
