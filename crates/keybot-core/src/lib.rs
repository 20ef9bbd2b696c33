#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core abstractions shared by the keybot crates.
//!
//! - **Backoff strategies** via the [`BackoffStrategy`](retry::BackoffStrategy) trait
//!   - Exponential backoff with jitter and a delay cap
//!   - Constant backoff for deterministic tests and simple deployments
//! - **Resource lifecycle** via the [`Resource`](resource::Resource) trait, used to
//!   model the chat backend process as something acquired at client
//!   construction and explicitly torn down on shutdown
//!
//! # Examples
//!
//! ```rust
//! use keybot_core::prelude::*;
//! use std::time::Duration;
//!
//! let backoff = ExponentialBackoff::builder()
//!     .initial_delay(Duration::from_millis(100))
//!     .max_delay(Duration::from_secs(30))
//!     .build();
//!
//! assert!(backoff.next_delay(0).is_some());
//! ```

pub mod resource;
pub mod retry;

/// Convenient re-exports of commonly used items.
pub mod prelude {
    pub use crate::resource::Resource;
    pub use crate::retry::{
        BackoffStrategy, ConstantBackoff, ExponentialBackoff, ExponentialBackoffBuilder,
    };
}
