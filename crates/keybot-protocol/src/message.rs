//! Chat message domain type

use crate::types::ConversationId;
use serde::Serialize;

/// A text message read from a conversation
///
/// Only produced by [`decode_messages`](crate::response::decode_messages), so
/// every instance has a non-empty body and carries the conversation it was
/// read from. Fields are read-only once constructed.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct Message {
    conversation: ConversationId,
    id: u64,
    time: i64,
    body: String,
    username: String,
    device: String,
}

impl Message {
    pub(crate) fn new(
        conversation: ConversationId,
        id: u64,
        time: i64,
        body: String,
        username: String,
        device: String,
    ) -> Self {
        Self {
            conversation,
            id,
            time,
            body,
            username,
            device,
        }
    }

    /// Conversation the message was read from
    pub fn conversation(&self) -> &ConversationId {
        &self.conversation
    }

    /// Backend message id, increasing within a conversation
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Send time as reported by the backend (`sent_at`, seconds since epoch)
    pub fn time(&self) -> i64 {
        self.time
    }

    /// Text body, never empty
    pub fn body(&self) -> &str {
        &self.body
    }

    /// Sender's username
    pub fn username(&self) -> &str {
        &self.username
    }

    /// Name of the device the message was sent from
    pub fn device(&self) -> &str {
        &self.device
    }
}
