//! Process management for the backend subprocess

use crate::error::{Result, TransportError};
use std::collections::HashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// Configuration for spawning the backend process
#[derive(Clone, Debug)]
pub struct ProcessConfig {
    /// Path to the backend executable
    pub cli_path: String,

    /// Arguments that put the executable into line-oriented API mode
    pub args: Vec<String>,

    /// Extra environment variables for the child
    pub env: HashMap<String, String>,

    /// Whether the child inherits the parent's environment
    ///
    /// The chat backend locates its per-user service through variables such
    /// as `HOME` and `XDG_RUNTIME_DIR`, so this defaults to `true`. When
    /// `false`, the child sees only the variables set in [`env`](Self::env).
    pub inherit_env: bool,

    /// Upper bound for a single round trip, `None` to wait forever
    pub call_timeout: Option<Duration>,

    /// Time granted between the termination signal and a hard kill
    pub shutdown_timeout: Duration,
}

impl Default for ProcessConfig {
    fn default() -> Self {
        Self {
            cli_path: "keybase".to_string(),
            args: vec!["chat".to_string(), "api".to_string()],
            env: HashMap::new(),
            inherit_env: true,
            call_timeout: Some(Duration::from_secs(30)),
            shutdown_timeout: Duration::from_secs(5),
        }
    }
}

impl ProcessConfig {
    /// Create a configuration for a different executable with no arguments
    pub fn new(cli_path: impl Into<String>) -> Self {
        Self {
            cli_path: cli_path.into(),
            args: Vec::new(),
            ..Default::default()
        }
    }

    /// Add an argument
    pub fn with_arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// Set an environment variable
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env.insert(key.into(), value.into());
        self
    }

    /// Choose whether the child inherits the parent's environment
    pub fn with_inherit_env(mut self, inherit: bool) -> Self {
        self.inherit_env = inherit;
        self
    }

    /// Set the round trip timeout
    pub fn with_call_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.call_timeout = timeout;
        self
    }

    /// Set the graceful shutdown window
    pub fn with_shutdown_timeout(mut self, timeout: Duration) -> Self {
        self.shutdown_timeout = timeout;
        self
    }
}

/// Handle to a running backend process
///
/// The child is spawned with `kill_on_drop`, so losing the handle never
/// leaks a process; [`terminate`](Self::terminate) is the graceful path.
pub struct ProcessHandle {
    child: Mutex<Child>,
    pid: Option<u32>,
    config: ProcessConfig,
}

impl ProcessHandle {
    /// Spawn the backend and take ownership of its pipes
    pub fn spawn(config: ProcessConfig) -> Result<(Self, ChildStdin, ChildStdout)> {
        let mut cmd = Command::new(&config.cli_path);
        cmd.args(&config.args);

        if !config.inherit_env {
            cmd.env_clear();
        }
        cmd.envs(&config.env);

        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::inherit())
            .kill_on_drop(true);

        let mut child = cmd.spawn().map_err(|e| {
            TransportError::Process(format!("failed to spawn {}: {}", config.cli_path, e))
        })?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| TransportError::Process("failed to capture stdin".to_string()))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| TransportError::Process("failed to capture stdout".to_string()))?;

        let pid = child.id();
        info!(cli = %config.cli_path, args = ?config.args, pid, "spawned chat backend");

        Ok((
            Self {
                child: Mutex::new(child),
                pid,
                config,
            },
            stdin,
            stdout,
        ))
    }

    /// Check whether the process is still running
    pub async fn is_alive(&self) -> bool {
        let mut child = self.child.lock().await;
        matches!(child.try_wait(), Ok(None))
    }

    /// Stop the process: signal, wait up to the shutdown timeout, then kill
    ///
    /// Returns once the process has been reaped. Terminating an already
    /// exited process is not an error.
    pub async fn terminate(&self) -> Result<()> {
        let mut child = self.child.lock().await;
        if let Ok(Some(status)) = child.try_wait() {
            debug!(?status, "chat backend already exited");
            return Ok(());
        }

        self.signal_terminate();

        match tokio::time::timeout(self.config.shutdown_timeout, child.wait()).await {
            Ok(Ok(status)) => {
                info!(?status, "chat backend exited");
                Ok(())
            }
            Ok(Err(e)) => Err(TransportError::Process(format!(
                "failed to reap backend: {}",
                e
            ))),
            Err(_) => {
                warn!(
                    timeout = ?self.config.shutdown_timeout,
                    "chat backend ignored termination request; killing"
                );
                child
                    .kill()
                    .await
                    .map_err(|e| TransportError::Process(format!("failed to kill backend: {}", e)))
            }
        }
    }

    #[cfg(unix)]
    fn signal_terminate(&self) {
        use nix::sys::signal::{Signal, kill};
        use nix::unistd::Pid;

        let Some(pid) = self.pid.and_then(|pid| i32::try_from(pid).ok()) else {
            return;
        };
        if let Err(errno) = kill(Pid::from_raw(pid), Signal::SIGTERM) {
            debug!(%errno, pid, "failed to signal chat backend");
        }
    }

    // Closing stdin is the only polite request available; the wait below
    // falls through to a hard kill.
    #[cfg(not(unix))]
    fn signal_terminate(&self) {}

    /// Operating system process id, if the process was running when spawned
    pub fn pid(&self) -> Option<u32> {
        self.pid
    }

    /// Get the process configuration
    pub fn config(&self) -> &ProcessConfig {
        &self.config
    }
}
