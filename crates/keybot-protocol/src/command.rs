//! Outbound command envelopes
//!
//! Every command has the shape `{"method": .., "params": {"options": ..}}`.
//! Field names must match the backend verbatim.

use crate::error::{ProtocolError, Result};
use crate::types::ConversationId;
use serde::Serialize;
use std::fmt;

/// The fixed request listing conversations that have unread messages
pub const LIST_UNREAD_REQUEST: &str = r#"{"method":"list","params":{"options":{"unread_only":true}}}"#;

/// Backend method names
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Method {
    /// Post a message to a conversation
    Send,
    /// List conversations
    List,
    /// Read messages from a conversation
    Read,
}

impl Method {
    /// Wire name of the method
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Send => "send",
            Self::List => "list",
            Self::Read => "read",
        }
    }
}

impl fmt::Display for Method {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Serialize)]
struct Command<O> {
    method: Method,
    params: Params<O>,
}

#[derive(Serialize)]
struct Params<O> {
    options: O,
}

#[derive(Serialize)]
struct SendOptions<'a> {
    conversation_id: &'a str,
    message: MessageBody<'a>,
}

#[derive(Serialize)]
struct MessageBody<'a> {
    body: &'a str,
}

#[derive(Serialize)]
struct ReadOptions<'a> {
    conversation_id: &'a str,
    unread_only: bool,
    peek: bool,
}

fn encode<O: Serialize>(method: Method, options: O) -> Result<Vec<u8>> {
    let command = Command {
        method,
        params: Params { options },
    };
    serde_json::to_vec(&command).map_err(|e| ProtocolError::Encode(e.to_string()))
}

/// Build a `send` command posting `body` to `conversation`
pub fn encode_send(conversation: &ConversationId, body: &str) -> Result<Vec<u8>> {
    encode(
        Method::Send,
        SendOptions {
            conversation_id: conversation.as_str(),
            message: MessageBody { body },
        },
    )
}

/// Build the `list` command restricted to conversations with unread messages
pub fn encode_list_unread() -> Vec<u8> {
    LIST_UNREAD_REQUEST.as_bytes().to_vec()
}

/// Build a `read` command for the unread messages of `conversation`
///
/// With `peek` set the backend leaves the messages unread; without it,
/// reading marks them read as a side effect.
pub fn encode_read(conversation: &ConversationId, peek: bool) -> Result<Vec<u8>> {
    encode(
        Method::Read,
        ReadOptions {
            conversation_id: conversation.as_str(),
            unread_only: true,
            peek,
        },
    )
}
