//! Transport trait
//!
//! The single seam between the chat client and whatever carries its bytes:
//! a real backend process, an in-memory pipe, or a scripted fake in tests.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;

/// One request in, one response out
///
/// Implementations must serialize round trips: while a `call` is in flight no
/// other `call` may touch the underlying stream, so the response returned is
/// always the one matching the request written.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Perform one round trip
    ///
    /// `request` is a single JSON value without a line terminator; the
    /// returned bytes are the response line, terminator stripped.
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>>;

    /// Check whether the transport can still carry round trips
    async fn is_connected(&self) -> bool;

    /// Release the transport
    ///
    /// Later calls fail with [`TransportError::Closed`](crate::TransportError::Closed).
    /// Closing twice is not an error.
    async fn close(&self) -> Result<()>;
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Arc<T> {
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>> {
        (**self).call(request).await
    }

    async fn is_connected(&self) -> bool {
        (**self).is_connected().await
    }

    async fn close(&self) -> Result<()> {
        (**self).close().await
    }
}
