//! Shared fixtures for the integration tests

#![allow(dead_code)]

use async_trait::async_trait;
use keybot::Transport;
use keybot::testing::{
    MockTransport, conversation_of, conversations_response, error_response, messages_response,
    method_of,
};
use keybot_transport::Result as TransportResult;
use serde_json::{Value, json};
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory inbox behaving like the backend's unread queue
///
/// `list` reports conversations that still have unread messages, `read`
/// returns them newest first and, unless peeking, marks them read.
#[derive(Clone, Default)]
pub struct Inbox {
    unread: Arc<Mutex<Vec<(String, Vec<Value>)>>>,
    sent: Arc<Mutex<Vec<(String, String)>>>,
}

impl Inbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue `entries` (newest first) as unread in `conversation`
    pub fn deliver(&self, conversation: &str, entries: Vec<Value>) {
        let mut unread = self.unread.lock().unwrap();
        match unread.iter_mut().find(|(id, _)| id == conversation) {
            Some((_, queued)) => {
                let mut merged = entries;
                merged.append(queued);
                *queued = merged;
            }
            None => unread.push((conversation.to_string(), entries)),
        }
    }

    /// Messages posted through `send`, as `(conversation, body)`
    pub fn sent(&self) -> Vec<(String, String)> {
        self.sent.lock().unwrap().clone()
    }

    pub fn answer(&self, request: &Value) -> Value {
        match method_of(request) {
            Some("list") => {
                let unread = self.unread.lock().unwrap();
                let ids: Vec<&str> = unread
                    .iter()
                    .filter(|(_, entries)| !entries.is_empty())
                    .map(|(id, _)| id.as_str())
                    .collect();
                conversations_response(&ids)
            }
            Some("read") => {
                let conversation = conversation_of(request).unwrap_or_default();
                let peek = request
                    .pointer("/params/options/peek")
                    .and_then(Value::as_bool)
                    .unwrap_or(false);
                let mut unread = self.unread.lock().unwrap();
                let entries = unread
                    .iter_mut()
                    .find(|(id, _)| id == conversation)
                    .map(|(_, entries)| {
                        if peek {
                            entries.clone()
                        } else {
                            std::mem::take(entries)
                        }
                    })
                    .unwrap_or_default();
                messages_response(entries)
            }
            Some("send") => {
                let conversation = conversation_of(request).unwrap_or_default().to_string();
                let body = request
                    .pointer("/params/options/message/body")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                self.sent.lock().unwrap().push((conversation, body));
                json!({"result": {"message": "message sent"}})
            }
            _ => error_response(1, "unknown method"),
        }
    }

    /// A mock transport backed by this inbox
    pub fn transport(&self) -> MockTransport {
        let inbox = self.clone();
        MockTransport::new(move |request| Ok(inbox.answer(request)))
    }
}

/// Transport wrapper that records every request with the response it got
pub struct Recorder<T> {
    inner: T,
    pairs: Mutex<Vec<(Vec<u8>, Vec<u8>)>>,
}

impl<T: Transport> Recorder<T> {
    pub fn new(inner: T) -> Self {
        Self {
            inner,
            pairs: Mutex::new(Vec::new()),
        }
    }

    /// `(request, response)` in completion order
    pub fn pairs(&self) -> Vec<(Vec<u8>, Vec<u8>)> {
        self.pairs.lock().unwrap().clone()
    }
}

#[async_trait]
impl<T: Transport> Transport for Recorder<T> {
    async fn call(&self, request: &[u8]) -> TransportResult<Vec<u8>> {
        let response = self.inner.call(request).await?;
        self.pairs
            .lock()
            .unwrap()
            .push((request.to_vec(), response.clone()));
        Ok(response)
    }

    async fn is_connected(&self) -> bool {
        self.inner.is_connected().await
    }

    async fn close(&self) -> TransportResult<()> {
        self.inner.close().await
    }
}

/// Await `future`, failing the test if it takes longer than a few seconds
pub async fn within<F: Future>(future: F) -> F::Output {
    tokio::time::timeout(Duration::from_secs(5), future)
        .await
        .expect("test timed out")
}
