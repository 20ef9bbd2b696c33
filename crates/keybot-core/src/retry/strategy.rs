//! The retry policy trait.

use std::error::Error;
use std::time::Duration;

/// A policy deciding whether and when a failed operation is attempted again.
///
/// The trait is object safe, so long-lived loops can hold an
/// `Arc<dyn BackoffStrategy>` and tests can inject a deterministic policy.
///
/// `attempt` is the number of consecutive failures seen so far minus one:
/// after the first failure the caller asks about attempt `0`.
///
/// # Examples
///
/// ```rust
/// use keybot_core::retry::BackoffStrategy;
/// use std::error::Error;
/// use std::time::Duration;
///
/// /// Retries I/O-looking errors only, once per second.
/// struct IoOnly;
///
/// impl BackoffStrategy for IoOnly {
///     fn should_retry(&self, error: &dyn Error, _attempt: u32) -> bool {
///         error.to_string().contains("I/O")
///     }
///
///     fn next_delay(&self, _attempt: u32) -> Option<Duration> {
///         Some(Duration::from_secs(1))
///     }
/// }
///
/// let err = std::io::Error::other("decode failed");
/// assert!(!IoOnly.should_retry(&err, 0));
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Decide whether the operation should be attempted again.
    ///
    /// The default implementation retries every error until
    /// [`max_retries`](Self::max_retries) consecutive failures have been
    /// seen, and forever when there is no limit.
    fn should_retry(&self, error: &dyn Error, attempt: u32) -> bool {
        let _ = error;
        self.max_retries().is_none_or(|max| attempt < max)
    }

    /// Delay to wait before the next attempt.
    ///
    /// `None` means "retry immediately".
    fn next_delay(&self, attempt: u32) -> Option<Duration>;

    /// Maximum number of consecutive retries, `None` for no limit.
    fn max_retries(&self) -> Option<u32> {
        None
    }
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for std::sync::Arc<S> {
    fn should_retry(&self, error: &dyn Error, attempt: u32) -> bool {
        (**self).should_retry(error, attempt)
    }

    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        (**self).next_delay(attempt)
    }

    fn max_retries(&self) -> Option<u32> {
        (**self).max_retries()
    }
}
