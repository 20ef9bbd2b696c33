//! Fixed-delay backoff.

use super::strategy::BackoffStrategy;
use std::time::Duration;

/// Waits the same delay after every failure.
///
/// [`ConstantBackoff::immediate`] reproduces a bare "skip and try again"
/// loop, which is what tests usually want when simulating failure storms.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConstantBackoff {
    delay: Duration,
    max_retries: Option<u32>,
}

impl ConstantBackoff {
    /// Retry forever, waiting `delay` between attempts.
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            max_retries: None,
        }
    }

    /// Retry forever without waiting.
    pub fn immediate() -> Self {
        Self::new(Duration::ZERO)
    }

    /// Give up after `max_retries` consecutive failures.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries);
        self
    }
}

impl BackoffStrategy for ConstantBackoff {
    fn next_delay(&self, _attempt: u32) -> Option<Duration> {
        if self.delay.is_zero() {
            None
        } else {
            Some(self.delay)
        }
    }

    fn max_retries(&self) -> Option<u32> {
        self.max_retries
    }
}
