//! Integration tests for ChatClient request/response behaviour

mod common;

use common::{Inbox, Recorder, within};
use keybot::testing::{
    duplex_backend, messages_response, method_of, slow_duplex_backend, text_message,
};
use keybot::{ChatClient, ChatError, ConversationId, TransportError};
use keybot_protocol::ProtocolError;
use serde_json::Value;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn test_send_posts_body_to_conversation() {
    let inbox = Inbox::new();
    let client = ChatClient::new(inbox.transport());

    client
        .send(&ConversationId::from("team.general"), "hello, world")
        .await
        .unwrap();

    assert_eq!(
        inbox.sent(),
        vec![("team.general".to_string(), "hello, world".to_string())]
    );
}

#[tokio::test]
async fn test_body_with_quotes_and_newlines_survives() {
    let inbox = Inbox::new();
    let client = ChatClient::new(inbox.transport());
    let body = "line one\nline \"two\"\ttab";

    client.send(&ConversationId::from("c"), body).await.unwrap();

    assert_eq!(inbox.sent()[0].1, body);
}

#[tokio::test]
async fn test_peek_leaves_messages_unread() {
    let inbox = Inbox::new();
    inbox.deliver(
        "c1",
        vec![text_message(2, "second", "bob"), text_message(1, "first", "alice")],
    );
    let client = ChatClient::new(inbox.transport());
    let conversation = ConversationId::from("c1");

    let peeked = client.get_messages(&conversation, true).await.unwrap();
    let peeked_again = client.get_messages(&conversation, true).await.unwrap();
    assert_eq!(peeked, peeked_again);
    assert_eq!(
        peeked.iter().map(|m| m.body()).collect::<Vec<_>>(),
        vec!["first", "second"]
    );
    assert_eq!(client.get_conversations().await.unwrap(), vec!["c1"]);

    let read = client.get_messages(&conversation, false).await.unwrap();
    assert_eq!(read, peeked);
    assert!(client.get_conversations().await.unwrap().is_empty());
    assert!(client.get_messages(&conversation, false).await.unwrap().is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_calls_get_their_own_responses() {
    // Each read is answered with a message whose body names the conversation
    let transport = duplex_backend(|line| {
        let request: Value = serde_json::from_slice(line).unwrap_or(Value::Null);
        let conversation = request
            .pointer("/params/options/conversation_id")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        serde_json::to_vec(&messages_response(vec![text_message(1, &conversation, "bot")]))
            .unwrap_or_default()
    });
    let client = ChatClient::new(transport);

    let mut tasks = Vec::new();
    for i in 0..100 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let conversation = ConversationId::new(format!("conv-{i}"));
            let messages = client.get_messages(&conversation, true).await?;
            Ok::<_, ChatError>((conversation, messages))
        }));
    }

    for task in tasks {
        let (conversation, messages) = within(task).await.unwrap().unwrap();
        assert_eq!(messages.len(), 1);
        assert_eq!(messages[0].body(), conversation.as_str());
        assert_eq!(messages[0].conversation(), &conversation);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_sends_get_their_own_responses() {
    // Echo every request, lingering on some so that callers queue up
    let mut seen = 0u32;
    let echo = slow_duplex_backend(move |line| {
        seen += 1;
        let delay = if seen % 3 == 0 {
            Duration::from_millis(1)
        } else {
            Duration::ZERO
        };
        (delay, line.to_vec())
    });
    let transport = Arc::new(Recorder::new(echo));
    let client = ChatClient::from_arc(Arc::clone(&transport));

    let mut tasks = Vec::new();
    for i in 0..50 {
        let client = client.clone();
        tasks.push(tokio::spawn(async move {
            let conversation = ConversationId::new(format!("conv-{i}"));
            client.send(&conversation, &format!("body {i}")).await
        }));
    }
    for task in tasks {
        within(task).await.unwrap().unwrap();
    }

    let pairs = transport.pairs();
    assert_eq!(pairs.len(), 50);
    let mut bodies = HashSet::new();
    for (request, response) in &pairs {
        assert_eq!(request, response);
        let request: Value = serde_json::from_slice(request).unwrap();
        assert_eq!(method_of(&request), Some("send"));
        let body = request
            .pointer("/params/options/message/body")
            .and_then(Value::as_str)
            .unwrap();
        bodies.insert(body.to_string());
    }
    assert_eq!(bodies.len(), 50);
}

#[tokio::test]
async fn test_malformed_response_keeps_transport_usable() {
    let transport = duplex_backend(|line| {
        if line.windows(4).any(|w| w == b"list") {
            b"{not json".to_vec()
        } else {
            br#"{"result":{"messages":[]}}"#.to_vec()
        }
    });
    let client = ChatClient::new(transport);

    let err = client.get_conversations().await.unwrap_err();
    assert!(err.is_decode_failure(), "unexpected error: {err}");

    // The bad line was consumed, so pairing is intact
    assert!(client.is_connected().await);
    let messages = client
        .get_messages(&ConversationId::from("c"), false)
        .await
        .unwrap();
    assert!(messages.is_empty());
}

#[tokio::test]
async fn test_shutdown_fails_later_calls() {
    let client = ChatClient::new(duplex_backend(|_| br#"{"result":{}}"#.to_vec()));
    let shared = client.clone();

    client.shutdown().await.unwrap();

    let err = shared
        .send(&ConversationId::from("c"), "too late")
        .await
        .unwrap_err();
    assert!(matches!(
        err,
        ChatError::Transport(TransportError::Closed(_))
    ));
}

#[tokio::test]
async fn test_client_over_shared_transport() {
    let inbox = Inbox::new();
    inbox.deliver("c", vec![text_message(1, "hi", "alice")]);
    let transport = Arc::new(inbox.transport());

    let client = ChatClient::from_arc(Arc::clone(&transport));
    client.get_conversations().await.unwrap();
    client.get_messages(&ConversationId::from("c"), false).await.unwrap();

    assert_eq!(transport.call_count(), 2);
    assert_eq!(transport.requests_for("read").await.len(), 1);
}

#[cfg(unix)]
mod subprocess {
    use super::*;
    use keybot::{ClientConfig, ProcessConfig};

    #[tokio::test]
    async fn test_connect_spawns_backend() {
        // `cat` echoes the request, which carries neither result nor error
        let config = ClientConfig::from(
            ProcessConfig::new("cat").with_shutdown_timeout(Duration::from_secs(2)),
        );
        let client = ChatClient::connect(config).await.unwrap();

        let err = client.get_conversations().await.unwrap_err();
        assert!(matches!(
            err,
            ChatError::Protocol(ProtocolError::MissingField(_))
        ));
        assert!(client.is_connected().await);

        client.shutdown().await.unwrap();
        assert!(!client.is_connected().await);
        assert!(!client.transport().is_alive().await);
    }

    #[tokio::test]
    async fn test_connect_to_missing_backend() {
        let config = ClientConfig::new().with_cli_path("/nonexistent/keybot-backend");
        let err = ChatClient::connect(config).await.err().unwrap();
        assert!(matches!(
            err,
            ChatError::Transport(TransportError::Process(_))
        ));
    }
}
