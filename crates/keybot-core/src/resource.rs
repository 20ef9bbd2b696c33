//! Scoped resource lifecycle.
//!
//! A [`Resource`] is acquired from a configuration, can report its health,
//! and is released through an explicit async [`cleanup`](Resource::cleanup)
//! instead of relying on process-exit cleanup. The chat backend process is
//! the canonical example: it is spawned when a client is built and
//! terminated when the client shuts down.

use async_trait::async_trait;

/// A resource with an explicit acquire / health-check / release lifecycle.
///
/// # Examples
///
/// ```rust
/// use keybot_core::resource::Resource;
/// use async_trait::async_trait;
///
/// struct Session {
///     open: bool,
/// }
///
/// #[async_trait]
/// impl Resource for Session {
///     type Config = ();
///     type Error = std::io::Error;
///
///     async fn initialize(_config: ()) -> Result<Self, Self::Error> {
///         Ok(Self { open: true })
///     }
///
///     async fn is_healthy(&self) -> bool {
///         self.open
///     }
///
///     async fn cleanup(&self) -> Result<(), Self::Error> {
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Resource: Send + Sync + Sized {
    /// Configuration required to acquire this resource.
    type Config: Clone + Send + Sync;

    /// Error type for acquisition and release failures.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Acquire the resource.
    async fn initialize(config: Self::Config) -> Result<Self, Self::Error>;

    /// Check whether the resource is still usable.
    ///
    /// Default implementation always returns `true`.
    async fn is_healthy(&self) -> bool {
        true
    }

    /// Release the resource.
    ///
    /// Takes `&self` so a resource shared behind an `Arc` can be released by
    /// whichever owner shuts down first; implementations must tolerate being
    /// called more than once. Default implementation does nothing.
    async fn cleanup(&self) -> Result<(), Self::Error> {
        Ok(())
    }
}
