//! Wire types and codec for the chat backend protocol
//!
//! The backend speaks one JSON value per line over its standard streams.
//! This crate translates between domain calls and those lines and nothing
//! else: it performs no I/O and keeps no state.
//!
//! # Type Organization
//!
//! - **Commands**: [`command`] - `send`, `list` and `read` request envelopes
//! - **Responses**: [`response`] - conversation and message list decoding
//! - **Domain types**: [`Message`], [`ConversationId`]
//! - **Error types**: [`error`] - encode, decode and backend errors

#![deny(unsafe_code)]
#![warn(missing_docs)]
//!
//! # Usage
//!
//! ```
//! use keybot_protocol::{ConversationId, decode_messages, encode_read};
//!
//! let conversation = ConversationId::from("0000f00d");
//! let request = encode_read(&conversation, true)?;
//! assert!(request.starts_with(br#"{"method":"read""#));
//!
//! let response = br#"{"result":{"messages":[
//!     {"msg":{"id":2,"sent_at":20,"content":{"text":{"body":"second"}},"sender":{"username":"a","device_name":"d"}}},
//!     {"msg":{"id":1,"sent_at":10,"content":{"text":{"body":"first"}},"sender":{"username":"a","device_name":"d"}}}
//! ]}}"#;
//! let messages = decode_messages(&conversation, response)?;
//! assert_eq!(messages[0].body(), "first");
//! # Ok::<(), keybot_protocol::ProtocolError>(())
//! ```

pub mod command;
pub mod error;
pub mod message;
pub mod response;
pub mod types;


// Re-export commonly used types at crate level
pub use command::{LIST_UNREAD_REQUEST, Method, encode_list_unread, encode_read, encode_send};
pub use error::{ProtocolError, Result};
pub use message::Message;
pub use response::{decode_conversations, decode_messages};
pub use types::ConversationId;
