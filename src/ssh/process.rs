//! OpenSSH client process spawning and control.
//!
//! This module provides a builder for the `ssh` command line and a wrapper
//! around the spawned child process.

use std::path::PathBuf;
use std::process::{ExitStatus, Output, Stdio};
use std::time::Duration;

use async_trait::async_trait;
use tokio::process::{Child, ChildStderr, ChildStdout, Command};

use super::{BoxedReader, RemoteCommand, SpawnError, SshTarget, TransportError};

/// Default timeout for graceful process termination.
pub const DEFAULT_TERMINATE_TIMEOUT: Duration = Duration::from_secs(5);

/// Builder for configuring `ssh` process arguments.
#[derive(Debug, Clone)]
pub struct SshCommandBuilder {
    target: SshTarget,
    options: Vec<String>,
    control_path: Option<PathBuf>,
    master: bool,
    control_command: Option<String>,
    no_command: bool,
    remote_command: Option<String>,
}

impl SshCommandBuilder {
    /// Create a new builder for the given target.
    #[must_use]
    pub fn new(target: SshTarget) -> Self {
        Self {
            target,
            options: Vec::new(),
            control_path: None,
            master: false,
            control_command: None,
            no_command: false,
            remote_command: None,
        }
    }

    /// Add an `-o` option such as `StrictHostKeyChecking=accept-new`.
    #[must_use]
    pub fn option(mut self, option: impl Into<String>) -> Self {
        self.options.push(option.into());
        self
    }

    /// Add several `-o` options.
    #[must_use]
    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options.extend(options.into_iter().map(Into::into));
        self
    }

    /// Use a multiplexing control socket.
    #[must_use]
    pub fn control_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.control_path = Some(path.into());
        self
    }

    /// Run as the control master for the socket.
    #[must_use]
    pub fn master(mut self) -> Self {
        self.master = true;
        self
    }

    /// Send a control command (`check`, `exit`) to a running master.
    #[must_use]
    pub fn control_command(mut self, command: impl Into<String>) -> Self {
        self.control_command = Some(command.into());
        self
    }

    /// Do not execute a remote command.
    #[must_use]
    pub fn no_command(mut self) -> Self {
        self.no_command = true;
        self
    }

    /// Set the command line to run on the remote side.
    #[must_use]
    pub fn remote_command(mut self, command: impl Into<String>) -> Self {
        self.remote_command = Some(command.into());
        self
    }

    /// Get the target.
    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Build the command-line arguments.
    #[must_use]
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec![
            "-p".to_string(),
            self.target.port.to_string(),
            "-o".to_string(),
            "BatchMode=yes".to_string(),
        ];

        if let Some(keyfile) = &self.target.keyfile {
            args.push("-i".to_string());
            args.push(keyfile.display().to_string());
        }

        for option in &self.options {
            args.push("-o".to_string());
            args.push(option.clone());
        }

        if let Some(path) = &self.control_path {
            args.push("-S".to_string());
            args.push(path.display().to_string());
        }

        if self.master {
            args.push("-M".to_string());
        }

        if let Some(command) = &self.control_command {
            args.push("-O".to_string());
            args.push(command.clone());
        }

        if self.no_command {
            args.push("-N".to_string());
        }

        args.push("-l".to_string());
        args.push(self.target.username.clone());
        // Options end here, so a hostname can never be read as a flag
        args.push("--".to_string());
        args.push(self.target.hostname.clone());

        if let Some(command) = &self.remote_command {
            args.push(command.clone());
        }

        args
    }
}

/// A running `ssh` process.
#[derive(Debug)]
pub struct SshProcess {
    child: Child,
}

impl SshProcess {
    /// Spawn a process using a custom binary.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn.
    pub fn spawn_with_binary(binary: &str, builder: &SshCommandBuilder) -> Result<Self, SpawnError> {
        let child = Command::new(binary)
            .args(builder.build_args())
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| SpawnError::from_io(binary, e))?;

        Ok(Self { child })
    }

    /// Run a short-lived `ssh` invocation and collect its output.
    ///
    /// # Errors
    ///
    /// Returns `SpawnError` if the process fails to spawn or cannot be waited on.
    pub async fn output(binary: &str, builder: &SshCommandBuilder) -> Result<Output, SpawnError> {
        Command::new(binary)
            .args(builder.build_args())
            .stdin(Stdio::null())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| SpawnError::from_io(binary, e))
    }

    /// Take ownership of the stdout handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stdout(&mut self) -> Option<ChildStdout> {
        self.child.stdout.take()
    }

    /// Take ownership of the stderr handle.
    ///
    /// This can only be called once; subsequent calls return `None`.
    pub fn take_stderr(&mut self) -> Option<ChildStderr> {
        self.child.stderr.take()
    }

    /// Get the process ID, if still running.
    #[must_use]
    pub fn id(&self) -> Option<u32> {
        self.child.id()
    }

    /// Check if the process has exited without blocking.
    ///
    /// # Errors
    ///
    /// Returns an error if the process state cannot be queried.
    pub fn try_wait(&mut self) -> std::io::Result<Option<ExitStatus>> {
        self.child.try_wait()
    }

    /// Wait for the process to exit.
    ///
    /// # Errors
    ///
    /// Returns an error if waiting fails.
    pub async fn wait(&mut self) -> std::io::Result<ExitStatus> {
        self.child.wait().await
    }

    /// Forcefully kill the process.
    ///
    /// # Errors
    ///
    /// Returns an error if the kill signal cannot be sent.
    pub async fn kill(&mut self) -> std::io::Result<()> {
        self.child.kill().await
    }

    /// Attempt graceful termination with a timeout.
    ///
    /// On Unix, sends SIGTERM first, then SIGKILL after the timeout.
    /// On other platforms, falls back to immediate kill.
    ///
    /// # Errors
    ///
    /// Returns an error if termination fails.
    pub async fn graceful_terminate(&mut self, timeout: Duration) -> std::io::Result<()> {
        #[cfg(unix)]
        {
            self.graceful_terminate_unix(timeout).await
        }

        #[cfg(not(unix))]
        {
            let _ = timeout;
            self.kill().await
        }
    }

    #[cfg(unix)]
    async fn graceful_terminate_unix(&mut self, timeout: Duration) -> std::io::Result<()> {
        use nix::sys::signal::{kill, Signal};
        use nix::unistd::Pid;

        if let Some(pid) = self.id() {
            let nix_pid = Pid::from_raw(i32::try_from(pid).unwrap_or(i32::MAX));
            let _ = kill(nix_pid, Signal::SIGTERM);

            match tokio::time::timeout(timeout, self.child.wait()).await {
                Ok(Ok(_)) => Ok(()),
                Ok(Err(e)) => Err(e),
                Err(_) => self.child.kill().await,
            }
        } else {
            // Already exited
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteCommand for SshProcess {
    fn take_stdout(&mut self) -> Option<BoxedReader> {
        SshProcess::take_stdout(self).map(|s| Box::new(s) as BoxedReader)
    }

    fn take_stderr(&mut self) -> Option<BoxedReader> {
        SshProcess::take_stderr(self).map(|s| Box::new(s) as BoxedReader)
    }

    async fn exit_status(&mut self) -> Result<Option<i32>, TransportError> {
        let status = self.wait().await?;
        Ok(status.code())
    }
}
