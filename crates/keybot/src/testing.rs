//! Testing utilities
//!
//! Fake backends for exercising [`ChatClient`](crate::ChatClient) and the
//! unread listener without a real chat backend process:
//!
//! - [`MockTransport`] answers each request through a closure and records it
//! - [`duplex_backend`] runs a real [`PipeTransport`] against an in-memory
//!   backend task that answers one line at a time, and
//!   [`slow_duplex_backend`] lets that task take its time
//!
//! The response builders produce the JSON shapes the backend emits.

use async_trait::async_trait;
use keybot_transport::{PipeTransport, Result as TransportResult, Transport, TransportError};
use serde_json::{Value, json};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, duplex};
use tokio::sync::Mutex;

type Handler = dyn Fn(&Value) -> TransportResult<Value> + Send + Sync;

/// Transport that routes every request through a closure
///
/// Requests are parsed as JSON before they reach the handler and recorded in
/// arrival order. Round trips are serialized like a real transport's.
pub struct MockTransport {
    handler: Box<Handler>,
    requests: Mutex<Vec<Value>>,
    calls: AtomicUsize,
    connected: AtomicBool,
    response_delay: Option<Duration>,
}

impl MockTransport {
    /// Create a mock answering with `handler`
    pub fn new<F>(handler: F) -> Self
    where
        F: Fn(&Value) -> TransportResult<Value> + Send + Sync + 'static,
    {
        Self {
            handler: Box::new(handler),
            requests: Mutex::new(Vec::new()),
            calls: AtomicUsize::new(0),
            connected: AtomicBool::new(true),
            response_delay: None,
        }
    }

    /// Delay every response, simulating a slow backend
    pub fn with_response_delay(mut self, delay: Duration) -> Self {
        self.response_delay = Some(delay);
        self
    }

    /// All requests received so far
    pub async fn requests(&self) -> Vec<Value> {
        self.requests.lock().await.clone()
    }

    /// Requests received so far for one method
    pub async fn requests_for(&self, method: &str) -> Vec<Value> {
        self.requests
            .lock()
            .await
            .iter()
            .filter(|request| method_of(request) == Some(method))
            .cloned()
            .collect()
    }

    /// Number of round trips attempted, including failed ones
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn call(&self, request: &[u8]) -> TransportResult<Vec<u8>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.connected.load(Ordering::SeqCst) {
            return Err(TransportError::Closed("mock transport closed".to_string()));
        }

        let request: Value = serde_json::from_slice(request)
            .map_err(|e| TransportError::InvalidFrame(format!("request is not JSON: {e}")))?;

        // Held for the whole round trip, like the pipe lock
        let mut requests = self.requests.lock().await;
        requests.push(request.clone());

        if let Some(delay) = self.response_delay {
            tokio::time::sleep(delay).await;
        }

        let response = (self.handler)(&request)?;
        serde_json::to_vec(&response)
            .map_err(|e| TransportError::InvalidFrame(format!("response is not JSON: {e}")))
    }

    async fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    async fn close(&self) -> TransportResult<()> {
        self.connected.store(false, Ordering::SeqCst);
        Ok(())
    }
}

/// Start an in-memory backend and return a transport connected to it
///
/// The backend task reads one request line at a time and writes
/// `handler(line)` back as the response line. It exits when the transport
/// closes its request stream.
pub fn duplex_backend<F>(mut handler: F) -> PipeTransport<DuplexStream, DuplexStream>
where
    F: FnMut(&[u8]) -> Vec<u8> + Send + 'static,
{
    slow_duplex_backend(move |line| (Duration::ZERO, handler(line)))
}

/// Like [`duplex_backend`], but the handler also says how long the backend
/// takes before it writes each response
///
/// The backend stays strictly in order: a slow response holds up every
/// request behind it.
pub fn slow_duplex_backend<F>(mut handler: F) -> PipeTransport<DuplexStream, DuplexStream>
where
    F: FnMut(&[u8]) -> (Duration, Vec<u8>) + Send + 'static,
{
    let (client_out, backend_in) = duplex(8 * 1024);
    let (mut backend_out, client_in) = duplex(8 * 1024);

    tokio::spawn(async move {
        let mut reader = BufReader::new(backend_in);
        let mut line = Vec::new();
        loop {
            line.clear();
            match reader.read_until(b'\n', &mut line).await {
                Ok(0) | Err(_) => break,
                Ok(_) => {}
            }
            if line.last() == Some(&b'\n') {
                line.pop();
            }
            let (delay, mut response) = handler(&line);
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            response.push(b'\n');
            if backend_out.write_all(&response).await.is_err() {
                break;
            }
        }
    });

    PipeTransport::new(client_out, client_in)
}

/// The `method` of a recorded request
pub fn method_of(request: &Value) -> Option<&str> {
    request.get("method").and_then(Value::as_str)
}

/// The `conversation_id` option of a recorded request
pub fn conversation_of(request: &Value) -> Option<&str> {
    request
        .pointer("/params/options/conversation_id")
        .and_then(Value::as_str)
}

/// Response to an unread `list` call
pub fn conversations_response(ids: &[&str]) -> Value {
    let conversations: Vec<Value> = ids.iter().map(|id| json!({"id": id})).collect();
    json!({"result": {"conversations": conversations}})
}

/// Response to a `read` call; `entries` are given newest first, as the
/// backend sends them
pub fn messages_response(entries: Vec<Value>) -> Value {
    json!({"result": {"messages": entries}})
}

/// One text message entry of a `read` response
pub fn text_message(id: u64, body: &str, username: &str) -> Value {
    json!({
        "msg": {
            "id": id,
            "sent_at": 1_600_000_000 + id as i64,
            "content": {"type": "text", "text": {"body": body}},
            "sender": {"username": username, "device_name": "phone"}
        }
    })
}

/// Response carrying a backend error instead of a result
pub fn error_response(code: i64, message: &str) -> Value {
    json!({"error": {"code": code, "message": message}})
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_transport_records_requests() {
        let mock = MockTransport::new(|request| {
            Ok(json!({"echo": method_of(request)}))
        });

        let response = mock.call(br#"{"method":"list"}"#).await.unwrap();
        assert_eq!(response, br#"{"echo":"list"}"#);
        mock.call(br#"{"method":"read"}"#).await.unwrap();

        assert_eq!(mock.call_count(), 2);
        assert_eq!(mock.requests().await.len(), 2);
        assert_eq!(mock.requests_for("read").await, vec![json!({"method": "read"})]);
    }

    #[tokio::test]
    async fn test_mock_transport_rejects_non_json() {
        let mock = MockTransport::new(|_| Ok(Value::Null));
        let err = mock.call(b"not json").await.unwrap_err();
        assert!(matches!(err, TransportError::InvalidFrame(_)));
    }

    #[tokio::test]
    async fn test_mock_transport_close() {
        let mock = MockTransport::new(|_| Ok(Value::Null));
        mock.close().await.unwrap();
        assert!(!mock.is_connected().await);
        assert!(matches!(
            mock.call(b"{}").await,
            Err(TransportError::Closed(_))
        ));
    }

    #[tokio::test]
    async fn test_duplex_backend_round_trip() {
        let transport = duplex_backend(|line| {
            let mut reply = b"re:".to_vec();
            reply.extend_from_slice(line);
            reply
        });
        assert_eq!(transport.call(b"one").await.unwrap(), b"re:one");
        assert_eq!(transport.call(b"two").await.unwrap(), b"re:two");
    }

    #[test]
    fn test_request_accessors() {
        let request = json!({
            "method": "read",
            "params": {"options": {"conversation_id": "c9"}}
        });
        assert_eq!(method_of(&request), Some("read"));
        assert_eq!(conversation_of(&request), Some("c9"));
        assert_eq!(conversation_of(&json!({})), None);
    }
}
