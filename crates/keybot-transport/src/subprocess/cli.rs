//! Transport backed by a spawned chat backend process
//!
//! Combines a [`ProcessHandle`] with a [`PipeTransport`] over the child's
//! stdin/stdout, and ties the process lifetime to the transport.

use crate::error::{Result, TransportError};
use crate::pipe::PipeTransport;
use crate::traits::Transport;
use async_trait::async_trait;
use keybot_core::resource::Resource;
use tokio::process::{ChildStdin, ChildStdout};
use tracing::{info, warn};

pub use super::process::{ProcessConfig, ProcessHandle};

/// Transport that owns the backend process
///
/// Spawned by [`CliTransport::spawn`] (or [`Resource::initialize`]) and
/// released by [`Transport::close`] (or [`Resource::cleanup`]), which closes
/// the child's stdin, asks it to exit and reaps it.
pub struct CliTransport {
    pipe: PipeTransport<ChildStdin, ChildStdout>,
    process: ProcessHandle,
}

impl CliTransport {
    /// Spawn the backend described by `config`
    pub fn spawn(config: ProcessConfig) -> Result<Self> {
        let call_timeout = config.call_timeout;
        let (process, stdin, stdout) = ProcessHandle::spawn(config)?;
        Ok(Self {
            pipe: PipeTransport::new(stdin, stdout).with_call_timeout(call_timeout),
            process,
        })
    }

    /// Check whether the backend process is still running
    pub async fn is_alive(&self) -> bool {
        self.process.is_alive().await
    }

    /// Get the process configuration
    pub fn config(&self) -> &ProcessConfig {
        self.process.config()
    }
}

#[async_trait]
impl Transport for CliTransport {
    async fn call(&self, request: &[u8]) -> Result<Vec<u8>> {
        self.pipe.call(request).await
    }

    async fn is_connected(&self) -> bool {
        self.pipe.is_connected().await && self.process.is_alive().await
    }

    async fn close(&self) -> Result<()> {
        let grace = self.process.config().shutdown_timeout;
        // A wedged round trip holds the pipe lock; terminating the process
        // ends it with end-of-stream.
        if tokio::time::timeout(grace, self.pipe.shutdown()).await.is_err() {
            warn!("round trip still in flight at shutdown; terminating backend");
        }
        self.process.terminate().await?;
        info!(pid = self.process.pid(), "chat backend released");
        Ok(())
    }
}

#[async_trait]
impl Resource for CliTransport {
    type Config = ProcessConfig;
    type Error = TransportError;

    async fn initialize(config: Self::Config) -> Result<Self> {
        Self::spawn(config)
    }

    async fn is_healthy(&self) -> bool {
        self.is_connected().await
    }

    async fn cleanup(&self) -> Result<()> {
        self.close().await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::time::Duration;

    // `cat` is a perfect single-threaded, in-order backend: it echoes each
    // request line back as the response.
    fn cat() -> ProcessConfig {
        ProcessConfig::new("cat").with_shutdown_timeout(Duration::from_secs(2))
    }

    #[tokio::test]
    async fn test_round_trip_through_child_process() {
        let transport = CliTransport::spawn(cat()).unwrap();

        let response = transport.call(br#"{"method":"list"}"#).await.unwrap();
        assert_eq!(response, br#"{"method":"list"}"#);
        assert!(transport.is_connected().await);

        transport.close().await.unwrap();
    }

    #[tokio::test]
    async fn test_cleanup_releases_process() {
        let transport = CliTransport::initialize(cat()).await.unwrap();
        assert!(transport.is_healthy().await);

        transport.cleanup().await.unwrap();
        assert!(!transport.is_alive().await);
        assert!(!transport.is_healthy().await);
        assert!(matches!(
            transport.call(b"{}").await,
            Err(TransportError::Closed(_))
        ));

        // Releasing twice is harmless
        transport.cleanup().await.unwrap();
    }

    #[tokio::test]
    async fn test_backend_exit_surfaces_as_closed() {
        let transport = CliTransport::spawn(ProcessConfig::new("true")).unwrap();

        let err = transport.call(b"{}").await.unwrap_err();
        assert!(err.is_fatal(), "unexpected error: {err}");
    }
}
