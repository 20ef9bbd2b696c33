//! Chat client
//!
//! [`ChatClient`] turns domain calls into protocol lines and runs them over a
//! [`Transport`]. The client is cheap to clone; clones share one transport,
//! so their calls are serialized against each other.

use crate::config::{ClientConfig, ListenerConfig};
use crate::error::Result;
use crate::listener::{self, MessageStream};
use keybot_core::resource::Resource;
use keybot_core::retry::{BackoffStrategy, ExponentialBackoff};
use keybot_protocol::{
    ConversationId, Message, Method, decode_conversations, decode_messages, encode_list_unread,
    encode_read, encode_send,
};
use keybot_transport::{CliTransport, Transport};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Client for the chat backend
///
/// # Example
///
/// ```no_run
/// use keybot::{ChatClient, ClientConfig};
///
/// # async fn example() -> keybot::Result<()> {
/// let client = ChatClient::connect(ClientConfig::default()).await?;
/// for conversation in client.get_conversations().await? {
///     client.send(&conversation, "hello").await?;
/// }
/// client.shutdown().await?;
/// # Ok(())
/// # }
/// ```
pub struct ChatClient<T: Transport = CliTransport> {
    transport: Arc<T>,
}

impl<T: Transport> Clone for ChatClient<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
        }
    }
}

impl ChatClient<CliTransport> {
    /// Spawn the backend process and connect to it
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let transport = CliTransport::initialize(config.process).await?;
        Ok(Self::new(transport))
    }

    /// Connect using [`ClientConfig::from_env`]
    pub async fn from_env() -> Result<Self> {
        Self::connect(ClientConfig::from_env()?).await
    }
}

impl<T: Transport + 'static> ChatClient<T> {
    /// Wrap an existing transport
    pub fn new(transport: T) -> Self {
        Self::from_arc(Arc::new(transport))
    }

    /// Wrap a shared transport
    pub fn from_arc(transport: Arc<T>) -> Self {
        Self { transport }
    }

    /// Get the underlying transport
    pub fn transport(&self) -> &T {
        &self.transport
    }

    async fn round_trip(&self, method: Method, request: &[u8]) -> Result<Vec<u8>> {
        debug!(%method, request_bytes = request.len(), "calling backend");
        let response = self.transport.call(request).await?;
        debug!(%method, response_bytes = response.len(), "backend answered");
        Ok(response)
    }

    /// Post a text message to a conversation
    ///
    /// The backend's reply is not inspected; only encoding and transport
    /// failures are reported.
    pub async fn send(&self, conversation: &ConversationId, body: &str) -> Result<()> {
        let request = encode_send(conversation, body)?;
        self.round_trip(Method::Send, &request).await?;
        Ok(())
    }

    /// List the conversations that have unread messages
    pub async fn get_conversations(&self) -> Result<Vec<ConversationId>> {
        let response = self.round_trip(Method::List, &encode_list_unread()).await?;
        Ok(decode_conversations(&response)?)
    }

    /// Fetch the unread messages of a conversation, oldest first
    ///
    /// Unless `peek` is set, the backend marks the returned messages as read.
    /// Messages without a text body are left out.
    pub async fn get_messages(
        &self,
        conversation: &ConversationId,
        peek: bool,
    ) -> Result<Vec<Message>> {
        let request = encode_read(conversation, peek)?;
        let response = self.round_trip(Method::Read, &request).await?;
        Ok(decode_messages(conversation, &response)?)
    }

    /// Check whether the transport can still carry calls
    pub async fn is_connected(&self) -> bool {
        self.transport.is_connected().await
    }

    /// Release the transport
    ///
    /// For a spawned backend this stops the process. Every clone of the
    /// client is affected; later calls fail with a closed transport error.
    pub async fn shutdown(&self) -> Result<()> {
        self.transport.close().await?;
        Ok(())
    }

    /// Start the unread listener with default settings
    ///
    /// Uses [`ListenerConfig::default`], an unbounded
    /// [`ExponentialBackoff`] and a fresh cancellation token.
    pub fn listen(&self) -> MessageStream {
        self.listen_with(
            ListenerConfig::default(),
            ExponentialBackoff::default(),
            CancellationToken::new(),
        )
    }

    /// Start the unread listener
    ///
    /// The listener polls for unread conversations, reads each one (marking
    /// its messages read) and yields the messages in order. Cancelling
    /// `cancel` or dropping the returned stream stops it.
    pub fn listen_with<B>(
        &self,
        config: ListenerConfig,
        backoff: B,
        cancel: CancellationToken,
    ) -> MessageStream
    where
        B: BackoffStrategy + 'static,
    {
        listener::spawn(self.clone(), config, Arc::new(backoff), cancel)
    }
}
