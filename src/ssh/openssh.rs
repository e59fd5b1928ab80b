//! Session provider backed by OpenSSH connection multiplexing.
//!
//! Opening a session starts a control master (`ssh -M -N`) and waits until
//! it answers `-O check`. Each command then runs as its own `ssh -S`
//! client over the shared, already authenticated connection. Host keys and
//! credentials are handled entirely by the local ssh configuration.

use std::path::{Path, PathBuf};
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::AsyncReadExt;
use tokio::time::Instant;
use uuid::Uuid;

use super::{
    RemoteCommand, Session, SessionProvider, SshCommandBuilder, SshProcess, SshTarget,
    TransportError, DEFAULT_TERMINATE_TIMEOUT,
};
use crate::config::GerritConfig;

/// How long to wait for the control master to come up.
pub const DEFAULT_OPEN_TIMEOUT: Duration = Duration::from_secs(30);

/// Interval between `-O check` probes while the master authenticates.
const READY_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Opens multiplexed sessions with the local `ssh` binary.
#[derive(Debug, Clone)]
pub struct OpenSshProvider {
    binary: String,
    options: Vec<String>,
    control_dir: PathBuf,
    open_timeout: Duration,
}

impl Default for OpenSshProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl OpenSshProvider {
    /// Create a provider using `ssh` from `PATH` and the system temp directory.
    #[must_use]
    pub fn new() -> Self {
        Self {
            binary: "ssh".to_string(),
            options: Vec::new(),
            control_dir: std::env::temp_dir(),
            open_timeout: DEFAULT_OPEN_TIMEOUT,
        }
    }

    /// Create a provider from the `ssh_*` settings of a configuration.
    #[must_use]
    pub fn from_config(config: &GerritConfig) -> Self {
        Self::new()
            .with_binary(config.ssh_binary.clone())
            .with_options(config.ssh_options.iter().cloned())
            .with_open_timeout(Duration::from_secs(config.open_timeout_secs))
    }

    /// Use a different ssh binary.
    #[must_use]
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    /// Pass extra `-o` options on every invocation.
    #[must_use]
    pub fn with_options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Directory for control sockets.
    #[must_use]
    pub fn with_control_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.control_dir = dir.into();
        self
    }

    /// How long to wait for a master connection.
    #[must_use]
    pub fn with_open_timeout(mut self, timeout: Duration) -> Self {
        self.open_timeout = timeout;
        self
    }

    /// Get the ssh binary.
    #[must_use]
    pub fn binary(&self) -> &str {
        &self.binary
    }

    fn builder(&self, target: &SshTarget, control_path: &Path) -> SshCommandBuilder {
        SshCommandBuilder::new(target.clone())
            .options(self.options.iter().cloned())
            .control_path(control_path)
    }

    /// Poll the master until it accepts control commands.
    async fn wait_until_ready(
        &self,
        master: &mut SshProcess,
        target: &SshTarget,
        control_path: &Path,
    ) -> Result<(), TransportError> {
        // No deadline when the timeout is too large to represent.
        let deadline = Instant::now().checked_add(self.open_timeout);
        let check = self.builder(target, control_path).control_command("check");

        loop {
            if let Some(status) = master.try_wait()? {
                let mut stderr = String::new();
                if let Some(mut pipe) = master.take_stderr() {
                    let _ = pipe.read_to_string(&mut stderr).await;
                }
                return Err(TransportError::Open {
                    host: target.hostname.clone(),
                    port: target.port,
                    code: status.code(),
                    stderr: stderr.trim().to_string(),
                });
            }

            if control_path.exists() {
                let output = SshProcess::output(&self.binary, &check).await?;
                if output.status.success() {
                    return Ok(());
                }
            }

            if deadline.is_some_and(|d| Instant::now() >= d) {
                return Err(TransportError::Timeout {
                    host: target.hostname.clone(),
                    port: target.port,
                    after: self.open_timeout,
                });
            }

            tokio::time::sleep(READY_POLL_INTERVAL).await;
        }
    }
}

#[async_trait]
impl SessionProvider for OpenSshProvider {
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, TransportError> {
        let socket = ControlSocket(
            self.control_dir
                .join(format!("gerrit-ssh-{}.sock", Uuid::new_v4().simple())),
        );
        let builder = self.builder(target, socket.path()).master().no_command();
        let mut master = SshProcess::spawn_with_binary(&self.binary, &builder)?;

        if let Err(e) = self.wait_until_ready(&mut master, target, socket.path()).await {
            if let Err(kill_err) = master.kill().await {
                tracing::warn!(error = %kill_err, "Failure closing broken master connection");
            }
            return Err(e);
        }

        tracing::debug!(
            host = %target.hostname,
            port = target.port,
            control_path = %socket.path().display(),
            "SSH master connection established"
        );

        Ok(Box::new(OpenSshSession {
            binary: self.binary.clone(),
            builder,
            control_path: socket,
            master: Some(master),
        }))
    }
}

/// A multiplexed OpenSSH connection.
#[derive(Debug)]
pub struct OpenSshSession {
    binary: String,
    builder: SshCommandBuilder,
    control_path: ControlSocket,
    master: Option<SshProcess>,
}

impl OpenSshSession {
    /// Whether the session has been closed.
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.master.is_none()
    }

    fn client_builder(&self) -> SshCommandBuilder {
        SshCommandBuilder::new(self.builder.target().clone())
            .control_path(self.control_path.path())
    }
}

#[async_trait]
impl Session for OpenSshSession {
    async fn exec(&mut self, command: &str) -> Result<Box<dyn RemoteCommand>, TransportError> {
        if self.master.is_none() {
            return Err(TransportError::Closed);
        }
        tracing::debug!(command = %command, "SSH command");
        let builder = self.client_builder().remote_command(command);
        let process = SshProcess::spawn_with_binary(&self.binary, &builder)?;
        Ok(Box::new(process))
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let Some(mut master) = self.master.take() else {
            return Ok(());
        };

        let exit = self.client_builder().control_command("exit");
        match SshProcess::output(&self.binary, &exit).await {
            Ok(output) if output.status.success() => {}
            Ok(output) => {
                tracing::debug!(code = ?output.status.code(), "Control master refused exit request");
            }
            Err(e) => tracing::debug!(error = %e, "Failed to send exit to control master"),
        }

        let result = master
            .graceful_terminate(DEFAULT_TERMINATE_TIMEOUT)
            .await
            .map_err(|source| TransportError::Close { source });
        remove_socket(self.control_path.path());
        result
    }
}

/// Control socket path that is removed when dropped.
///
/// Covers an `open` future dropped mid-handshake and a session dropped
/// without `close`, where the killed master never cleans up after itself.
#[derive(Debug)]
struct ControlSocket(PathBuf);

impl ControlSocket {
    fn path(&self) -> &Path {
        &self.0
    }
}

impl Drop for ControlSocket {
    fn drop(&mut self) {
        remove_socket(&self.0);
    }
}

fn remove_socket(path: &Path) {
    match std::fs::remove_file(path) {
        Ok(()) => {}
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
        Err(e) => tracing::debug!(path = %path.display(), error = %e, "Failed to remove control socket"),
    }
}
