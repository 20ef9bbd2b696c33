//! Exponential backoff with jitter.

use super::strategy::BackoffStrategy;
use std::time::Duration;

/// Exponential backoff with configurable jitter and a delay cap.
///
/// For attempt `n` (0 after the first failure):
///
/// ```text
/// base_delay   = initial_delay * multiplier^n
/// jittered     = base_delay * (1 + jitter * random(-1.0, +1.0))
/// final_delay  = min(jittered, max_delay)
/// ```
///
/// Unlike a request-level retry helper, the default policy never gives up
/// (`max_retries() == None`): it is tuned for a polling loop that must keep
/// running against a backend that fails intermittently.
///
/// # Examples
///
/// ```rust
/// use keybot_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// // 100ms, 200ms, 400ms, ... capped at 30s, 10% jitter, unbounded
/// let backoff = ExponentialBackoff::default();
/// assert_eq!(backoff.max_retries(), None);
///
/// let bounded = ExponentialBackoff::builder()
///     .max_retries(5)
///     .max_delay(Duration::from_secs(2))
///     .build();
/// assert_eq!(bounded.max_retries(), Some(5));
/// ```
#[derive(Debug, Clone)]
pub struct ExponentialBackoff {
    max_retries: Option<u32>,
    initial_delay: Duration,
    max_delay: Duration,
    multiplier: f64,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }
}

impl Default for ExponentialBackoff {
    /// Defaults: unbounded retries, 100ms initial delay, 30s cap,
    /// multiplier 2.0, 10% jitter.
    fn default() -> Self {
        ExponentialBackoffBuilder::default().build()
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Option<Duration> {
        // Beyond 64 doublings every sane configuration is already capped.
        let exponent = attempt.min(64) as i32;
        let base_delay = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);

        let jittered = if self.jitter > 0.0 {
            let spread = (rand::random::<f64>() - 0.5) * 2.0;
            base_delay + base_delay * self.jitter * spread
        } else {
            base_delay
        };

        let capped = jittered.min(self.max_delay.as_secs_f64()).max(0.0);
        Some(Duration::try_from_secs_f64(capped).unwrap_or(self.max_delay))
    }

    fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }
}

/// Builder for [`ExponentialBackoff`].
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    max_retries: Option<u32>,
    initial_delay: Option<Duration>,
    max_delay: Option<Duration>,
    multiplier: Option<f64>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Give up after this many consecutive failures.
    ///
    /// Default: unbounded
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }

    /// Set the delay before the first retry.
    ///
    /// Default: 100ms
    pub fn initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = Some(delay);
        self
    }

    /// Set the upper bound for any single delay.
    ///
    /// Default: 30s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the growth factor between consecutive delays.
    ///
    /// Default: 2.0. Values below 1.0 are raised to 1.0.
    pub fn multiplier(mut self, multiplier: f64) -> Self {
        self.multiplier = Some(multiplier.max(1.0));
        self
    }

    /// Set the jitter factor, clamped to `0.0..=1.0`.
    ///
    /// A jitter of 0.1 lets each delay vary by ±10%.
    ///
    /// Default: 0.1
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the [`ExponentialBackoff`], filling unset values with defaults.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_retries: self.max_retries,
            initial_delay: self.initial_delay.unwrap_or(Duration::from_millis(100)),
            max_delay: self.max_delay.unwrap_or(Duration::from_secs(30)),
            multiplier: self.multiplier.unwrap_or(2.0),
            jitter: self.jitter.unwrap_or(0.1),
        }
    }
}
