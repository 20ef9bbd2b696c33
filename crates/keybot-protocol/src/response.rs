//! Inbound response envelopes
//!
//! Responses have the shape `{"result": {..}}`, or `{"error": {..}}` when the
//! backend rejected the command. Only the fields the client needs are
//! modelled; everything else in the payload is ignored.

use crate::error::{ProtocolError, Result};
use crate::message::Message;
use crate::types::ConversationId;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::warn;

#[derive(Deserialize)]
struct Envelope<T> {
    result: Option<T>,
    error: Option<BackendError>,
}

#[derive(Deserialize)]
struct BackendError {
    #[serde(default)]
    code: i64,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
struct ConversationList {
    #[serde(default)]
    conversations: Option<Vec<ConversationEntry>>,
}

#[derive(Deserialize)]
struct ConversationEntry {
    id: String,
}

// Entries are decoded one at a time so a bad one cannot sink the batch.
#[derive(Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Option<Vec<Value>>,
}

#[derive(Deserialize)]
struct MessageEntry {
    msg: MessageSummary,
}

#[derive(Deserialize)]
struct MessageSummary {
    id: u64,
    sent_at: i64,
    #[serde(default)]
    content: Content,
    #[serde(default)]
    sender: Option<Sender>,
}

// Non-text events (edits, reactions, joins) carry no `text` member.
#[derive(Deserialize, Default)]
struct Content {
    #[serde(default)]
    text: Option<Text>,
}

#[derive(Deserialize)]
struct Text {
    #[serde(default)]
    body: String,
}

#[derive(Deserialize, Default)]
struct Sender {
    #[serde(default)]
    username: String,
    #[serde(default)]
    device_name: String,
}

fn open<T: DeserializeOwned>(bytes: &[u8]) -> Result<T> {
    let envelope: Envelope<T> = serde_json::from_slice(bytes)?;
    if let Some(error) = envelope.error {
        return Err(ProtocolError::Backend {
            code: error.code,
            message: error.message,
        });
    }
    envelope
        .result
        .ok_or_else(|| ProtocolError::MissingField("result".to_string()))
}

/// Extract `result.conversations[].id` in backend order
///
/// A missing or `null` conversation list decodes as an empty list.
pub fn decode_conversations(bytes: &[u8]) -> Result<Vec<ConversationId>> {
    let list: ConversationList = open(bytes)?;
    Ok(list
        .conversations
        .unwrap_or_default()
        .into_iter()
        .map(|entry| ConversationId::from(entry.id))
        .collect())
}

/// Extract the text messages of a `read` response, oldest first
///
/// The backend lists messages newest first; the result is reversed. Entries
/// with an empty body are dropped, and so are entries that are not a
/// message at all (an entry the backend failed to unbox carries `error`
/// instead of `msg`). The batch has already been marked read, so losing one
/// entry is better than losing all of them. A missing sender decodes as
/// empty names. Every message is stamped with `conversation`, which the
/// payload itself does not carry.
pub fn decode_messages(conversation: &ConversationId, bytes: &[u8]) -> Result<Vec<Message>> {
    let list: MessageList = open(bytes)?;
    let entries = list.messages.unwrap_or_default();

    let mut messages = Vec::with_capacity(entries.len());
    for (index, entry) in entries.into_iter().enumerate().rev() {
        let msg = match serde_json::from_value::<MessageEntry>(entry) {
            Ok(entry) => entry.msg,
            Err(err) => {
                warn!(%conversation, index, error = %err, "skipping undecodable message entry");
                continue;
            }
        };
        let body = msg.content.text.map(|text| text.body).unwrap_or_default();
        if body.is_empty() {
            continue;
        }
        let sender = msg.sender.unwrap_or_default();
        messages.push(Message::new(
            conversation.clone(),
            msg.id,
            msg.sent_at,
            body,
            sender.username,
            sender.device_name,
        ));
    }
    Ok(messages)
}
