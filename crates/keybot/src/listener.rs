//! Unread message listener
//!
//! A background task polls the backend for conversations with unread
//! messages, reads each of them (which marks the messages read) and hands the
//! messages to the consumer through a bounded channel. Messages of one
//! conversation are delivered oldest first; conversations are visited in the
//! order the backend lists them.
//!
//! The task stops when its [`CancellationToken`] fires, when the consumer
//! drops the [`MessageStream`], or when it decides an error is not worth
//! retrying. A failed listing is retried according to the configured
//! [`BackoffStrategy`]; a failed read skips that conversation for the cycle.

use crate::client::ChatClient;
use crate::config::ListenerConfig;
use crate::error::{ChatError, ErrorRecovery, Result};
use futures::Stream;
use keybot_core::retry::BackoffStrategy;
use keybot_protocol::Message;
use keybot_transport::Transport;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

/// Stream of unread messages produced by [`ChatClient::listen`]
///
/// Yields `None` once the listener has stopped; [`join`](Self::join) then
/// tells why. Dropping the stream cancels the listener.
pub struct MessageStream {
    rx: mpsc::Receiver<Message>,
    cancel: CancellationToken,
    task: Option<JoinHandle<Result<()>>>,
}

impl MessageStream {
    /// Receive the next message, `None` once the listener has stopped
    pub async fn recv(&mut self) -> Option<Message> {
        self.rx.recv().await
    }

    /// Ask the listener to stop
    ///
    /// Messages already buffered can still be received.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// The token that stops this listener
    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    /// Whether the listener task has finished
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().is_none_or(JoinHandle::is_finished)
    }

    /// Stop consuming and wait for the listener to finish
    ///
    /// Returns `Ok(())` if the listener was cancelled or outlived its
    /// consumer, and the error that made it give up otherwise. Buffered
    /// messages are discarded.
    pub async fn join(mut self) -> Result<()> {
        self.rx.close();
        let Some(task) = self.task.take() else {
            return Ok(());
        };
        task.await
            .map_err(|e| ChatError::ListenerStopped(e.to_string()))?
    }
}

impl Stream for MessageStream {
    type Item = Message;

    fn poll_next(self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Message>> {
        self.get_mut().rx.poll_recv(cx)
    }
}

impl Drop for MessageStream {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

pub(crate) fn spawn<T: Transport + 'static>(
    client: ChatClient<T>,
    config: ListenerConfig,
    backoff: Arc<dyn BackoffStrategy>,
    cancel: CancellationToken,
) -> MessageStream {
    let (tx, rx) = mpsc::channel(config.channel_capacity.max(1));
    let poller = Poller {
        client,
        config,
        backoff,
        cancel: cancel.clone(),
        tx,
    };
    let task = tokio::spawn(poller.run());
    MessageStream {
        rx,
        cancel,
        task: Some(task),
    }
}

struct Poller<T: Transport> {
    client: ChatClient<T>,
    config: ListenerConfig,
    backoff: Arc<dyn BackoffStrategy>,
    cancel: CancellationToken,
    tx: mpsc::Sender<Message>,
}

/// Why the poll loop ended without an error
enum Stop {
    Cancelled,
    ConsumerGone,
}

type Flow = std::result::Result<(), Stop>;

impl<T: Transport + 'static> Poller<T> {
    async fn run(self) -> Result<()> {
        info!("unread listener started");
        let outcome = self.poll().await;
        match &outcome {
            Ok(Stop::Cancelled) => info!("unread listener cancelled"),
            Ok(Stop::ConsumerGone) => info!("unread listener stopped: consumer went away"),
            Err(err) => error!(
                error = %err,
                action = err.suggested_action(),
                "unread listener gave up"
            ),
        }
        outcome.map(|_| ())
    }

    async fn poll(&self) -> Result<Stop> {
        let mut failed_listings: u32 = 0;
        let mut decode_failures: u32 = 0;

        loop {
            if self.cancel.is_cancelled() {
                return Ok(Stop::Cancelled);
            }

            let Some(listing) = self.guarded(self.client.get_conversations()).await else {
                return Ok(Stop::Cancelled);
            };
            let conversations = match listing {
                Ok(conversations) => conversations,
                Err(err) => {
                    if self.gives_up(&err, &mut decode_failures)
                        || !self.backoff.should_retry(&err, failed_listings)
                    {
                        return Err(err);
                    }
                    let delay = self.backoff.next_delay(failed_listings);
                    warn!(
                        error = %err,
                        attempt = failed_listings,
                        ?delay,
                        "listing unread conversations failed; retrying"
                    );
                    failed_listings = failed_listings.saturating_add(1);
                    if let Some(delay) = delay
                        && let Err(stop) = self.pause(delay).await
                    {
                        return Ok(stop);
                    }
                    continue;
                }
            };
            failed_listings = 0;
            decode_failures = 0;

            if conversations.is_empty() {
                if let Err(stop) = self.pause(self.config.idle_interval).await {
                    return Ok(stop);
                }
                continue;
            }
            debug!(count = conversations.len(), "unread conversations");

            for conversation in &conversations {
                if self.cancel.is_cancelled() {
                    return Ok(Stop::Cancelled);
                }
                let Some(read) = self.guarded(self.client.get_messages(conversation, false)).await
                else {
                    return Ok(Stop::Cancelled);
                };
                let messages = match read {
                    Ok(messages) => {
                        decode_failures = 0;
                        messages
                    }
                    Err(err) => {
                        if self.gives_up(&err, &mut decode_failures) {
                            return Err(err);
                        }
                        warn!(
                            error = %err,
                            %conversation,
                            "reading conversation failed; skipping it this cycle"
                        );
                        continue;
                    }
                };
                if let Err(stop) = self.deliver(messages).await {
                    return Ok(stop);
                }
            }
        }
    }

    /// Decide whether `err` ends the listener
    fn gives_up(&self, err: &ChatError, decode_failures: &mut u32) -> bool {
        if err.is_fatal() || !err.is_retriable() {
            return true;
        }
        if err.is_decode_failure() {
            *decode_failures = decode_failures.saturating_add(1);
            if let Some(limit) = self.config.max_consecutive_decode_failures {
                return *decode_failures > limit;
            }
        }
        false
    }

    /// Run a backend call, racing it against cancellation
    ///
    /// After cancellation the call gets `drain_timeout` to finish. `None`
    /// means it was abandoned; the transport skips its late response.
    async fn guarded<F: Future>(&self, call: F) -> Option<F::Output> {
        tokio::pin!(call);
        tokio::select! {
            biased;
            output = &mut call => Some(output),
            _ = self.cancel.cancelled() => {
                debug!(timeout = ?self.config.drain_timeout, "cancelled mid round trip; draining");
                match tokio::time::timeout(self.config.drain_timeout, &mut call).await {
                    Ok(output) => Some(output),
                    Err(_) => {
                        warn!("abandoning in-flight round trip after drain timeout");
                        None
                    }
                }
            }
        }
    }

    /// Hand a fetched batch to the consumer
    ///
    /// The batch is already marked read, so cancellation does not cut it
    /// short; after cancellation each message gets `drain_timeout` to find
    /// room in the channel.
    async fn deliver(&self, messages: Vec<Message>) -> Flow {
        let total = messages.len();
        for (delivered, message) in messages.into_iter().enumerate() {
            let permit = tokio::select! {
                biased;
                permit = self.tx.reserve() => permit,
                _ = self.cancel.cancelled() => {
                    match tokio::time::timeout(self.config.drain_timeout, self.tx.reserve()).await {
                        Ok(permit) => permit,
                        Err(_) => {
                            warn!(
                                undelivered = total - delivered,
                                "consumer stopped receiving after cancel; dropping read messages"
                            );
                            return Err(Stop::Cancelled);
                        }
                    }
                }
            };
            match permit {
                Ok(permit) => permit.send(message),
                Err(_) => return Err(Stop::ConsumerGone),
            }
        }
        Ok(())
    }

    async fn pause(&self, delay: Duration) -> Flow {
        tokio::select! {
            _ = tokio::time::sleep(delay) => Ok(()),
            _ = self.cancel.cancelled() => Err(Stop::Cancelled),
            _ = self.tx.closed() => Err(Stop::ConsumerGone),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{MockTransport, conversations_response};
    use keybot_core::retry::ConstantBackoff;
    use tokio_test::{assert_pending, assert_ready_eq, task};

    #[tokio::test]
    async fn test_stream_pending_until_cancelled() {
        let client = ChatClient::new(MockTransport::new(|_| Ok(conversations_response(&[]))));
        let config = ListenerConfig::default().with_idle_interval(Duration::from_millis(5));
        let stream = client.listen_with(config, ConstantBackoff::immediate(), CancellationToken::new());

        let mut stream = task::spawn(stream);
        assert_pending!(stream.poll_next());
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_pending!(stream.poll_next());

        stream.cancel();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(stream.is_woken());
        assert_ready_eq!(stream.poll_next(), None);
    }

    #[tokio::test]
    async fn test_zero_capacity_is_clamped() {
        let client = ChatClient::new(MockTransport::new(|_| Ok(conversations_response(&[]))));
        let config = ListenerConfig::default().with_channel_capacity(0);
        let stream = client.listen_with(config, ConstantBackoff::immediate(), CancellationToken::new());

        stream.cancel();
        stream.join().await.unwrap();
    }
}
