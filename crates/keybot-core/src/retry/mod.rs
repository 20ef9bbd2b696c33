//! Retry policies and backoff implementations.
//!
//! A [`BackoffStrategy`] answers two questions after a failure: should the
//! caller try again, and how long should it wait first. The strategies here
//! do not drive any loop themselves, so the same policy can be plugged into
//! a one-shot retry or an endless polling loop.
//!
//! # Key Types
//!
//! - [`BackoffStrategy`] - Core trait for retry policies
//! - [`ExponentialBackoff`] - Exponential growth with jitter and a cap
//! - [`ConstantBackoff`] - Fixed delay, handy for deterministic tests
//!
//! # Examples
//!
//! ```rust
//! use keybot_core::retry::{BackoffStrategy, ExponentialBackoff};
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .initial_delay(Duration::from_millis(100))
//!     .jitter(0.0)
//!     .build();
//!
//! assert_eq!(backoff.next_delay(2), Some(Duration::from_millis(400)));
//! ```

mod constant;
mod exponential;
mod strategy;

pub use constant::ConstantBackoff;
pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use strategy::BackoffStrategy;
