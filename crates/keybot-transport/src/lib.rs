//! Request/response transport for the chat backend
//!
//! Performs strictly serialized round trips (write one line, flush, read one
//! line) against a backend that answers requests in arrival order.
//!
//! # Architecture
//!
//! - **Transport trait**: the `call(request) -> response` seam used by the client
//! - **Pipe transport**: line framing, mutual exclusion, call timeout and
//!   recovery from abandoned round trips, generic over any async streams
//! - **Subprocess transport**: spawns the backend and owns its lifecycle
//! - **Error handling**: [`TransportError`] distinguishes transient from fatal failures
//!
//! # Usage
//!
//! ```no_run
//! use keybot_transport::{CliTransport, ProcessConfig, Transport};
//!
//! # async fn example() -> keybot_transport::Result<()> {
//! let transport = CliTransport::spawn(ProcessConfig::default())?;
//! let response = transport
//!     .call(br#"{"method":"list","params":{"options":{"unread_only":true}}}"#)
//!     .await?;
//! transport.close().await?;
//! # Ok(())
//! # }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod error;
pub mod pipe;
pub mod subprocess;
pub mod traits;

// Re-export commonly used types
pub use error::{Result, TransportError};
pub use pipe::PipeTransport;
pub use subprocess::{CliTransport, ProcessConfig, ProcessHandle};
pub use traits::Transport;
