//! Chat bot client for a line-delimited JSON chat backend
//!
//! `keybot` drives a chat backend running as a child process (by default
//! `keybase chat api`): it sends text messages, lists conversations with
//! unread messages, reads them, and runs a background listener that turns
//! the unread queue into a stream of messages.
//!
//! # Architecture
//!
//! 1. **Protocol Layer** (`keybot-protocol`): request encoding and response decoding
//! 2. **Transport Layer** (`keybot-transport`): serialized round trips over the
//!    backend's standard streams
//! 3. **Client Layer** (this crate): [`ChatClient`] and the unread listener
//!
//! # Usage Example
//!
//! ```no_run
//! use keybot::ChatClient;
//!
//! #[tokio::main]
//! async fn main() -> keybot::Result<()> {
//!     let client = ChatClient::from_env().await?;
//!     let mut messages = client.listen();
//!
//!     while let Some(message) = messages.recv().await {
//!         client.send(message.conversation(), message.body()).await?;
//!     }
//!
//!     messages.join().await?;
//!     client.shutdown().await
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod client;
pub mod config;
pub mod error;
pub mod listener;
pub mod testing;

// Re-export commonly used types
pub use client::ChatClient;
pub use config::{ClientConfig, ListenerConfig};
pub use error::{ChatError, ErrorRecovery, Result};
pub use listener::MessageStream;

pub use keybot_core::retry::{BackoffStrategy, ConstantBackoff, ExponentialBackoff};
pub use keybot_protocol::{ConversationId, Message};
pub use keybot_transport::{CliTransport, ProcessConfig, Transport, TransportError};
pub use tokio_util::sync::CancellationToken;
