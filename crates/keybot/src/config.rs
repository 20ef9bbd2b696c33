//! Client and listener configuration

use crate::error::{ChatError, Result};
use keybot_transport::ProcessConfig;
use std::time::Duration;

/// Environment variable overriding the backend executable
pub const ENV_CLI_PATH: &str = "KEYBOT_CLI_PATH";

/// Environment variable overriding the round trip timeout, in seconds
///
/// `0` disables the timeout.
pub const ENV_CALL_TIMEOUT_SECS: &str = "KEYBOT_CALL_TIMEOUT_SECS";

/// Environment variable overriding the shutdown grace period, in seconds
pub const ENV_SHUTDOWN_TIMEOUT_SECS: &str = "KEYBOT_SHUTDOWN_TIMEOUT_SECS";

/// Configuration for [`ChatClient::connect`](crate::ChatClient::connect)
#[derive(Debug, Clone, Default)]
pub struct ClientConfig {
    /// How to spawn and talk to the backend process
    pub process: ProcessConfig,
}

impl ClientConfig {
    /// Create a configuration with default process settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a configuration from the `KEYBOT_*` environment variables
    ///
    /// Unset variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let mut process = ProcessConfig::default();

        if let Some(path) = read_var(ENV_CLI_PATH) {
            process.cli_path = path;
        }
        if let Some(secs) = read_secs(ENV_CALL_TIMEOUT_SECS)? {
            process.call_timeout = (secs > 0).then(|| Duration::from_secs(secs));
        }
        if let Some(secs) = read_secs(ENV_SHUTDOWN_TIMEOUT_SECS)? {
            process.shutdown_timeout = Duration::from_secs(secs);
        }

        Ok(Self { process })
    }

    /// Set the backend executable
    pub fn with_cli_path(mut self, path: impl Into<String>) -> Self {
        self.process.cli_path = path.into();
        self
    }

    /// Set the round trip timeout, `None` to wait forever
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.process.call_timeout = timeout;
        self
    }

    /// Set the shutdown grace period
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.process.shutdown_timeout = timeout;
        self
    }

    /// Replace the process configuration
    pub fn with_process(mut self, process: ProcessConfig) -> Self {
        self.process = process;
        self
    }
}

impl From<ProcessConfig> for ClientConfig {
    fn from(process: ProcessConfig) -> Self {
        Self { process }
    }
}

fn read_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

fn read_secs(key: &str) -> Result<Option<u64>> {
    read_var(key)
        .map(|raw| {
            raw.trim().parse::<u64>().map_err(|e| {
                ChatError::Config(format!(
                    "{key} must be a whole number of seconds, got {raw:?}: {e}"
                ))
            })
        })
        .transpose()
}

/// Configuration for the unread listener
#[derive(Debug, Clone)]
pub struct ListenerConfig {
    /// Messages buffered between the listener and its consumer
    ///
    /// The listener stops polling while the buffer is full. Values below 1
    /// are treated as 1.
    pub channel_capacity: usize,

    /// Pause after a cycle that found no unread conversations
    pub idle_interval: Duration,

    /// Consecutive undecodable responses tolerated before the listener
    /// gives up, `None` to never give up
    pub max_consecutive_decode_failures: Option<u32>,

    /// Time granted after cancellation to an in-flight round trip, and to
    /// each message of an already read batch waiting for channel room
    pub drain_timeout: Duration,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            channel_capacity: 1,
            idle_interval: Duration::from_millis(250),
            max_consecutive_decode_failures: Some(10),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

impl ListenerConfig {
    /// Set the buffer size between listener and consumer
    pub fn with_channel_capacity(mut self, capacity: usize) -> Self {
        self.channel_capacity = capacity;
        self
    }

    /// Set the pause after an empty cycle
    pub fn with_idle_interval(mut self, interval: Duration) -> Self {
        self.idle_interval = interval;
        self
    }

    /// Set the decode failure limit
    pub fn with_max_consecutive_decode_failures(mut self, limit: Option<u32>) -> Self {
        self.max_consecutive_decode_failures = limit;
        self
    }

    /// Set the drain window for cancellation
    pub fn with_drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}
