//! Session abstraction consumed by the watcher and the administrative commands.

use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncRead;

use super::TransportError;

/// A readable byte stream from a remote command.
pub type BoxedReader = Box<dyn AsyncRead + Send + Unpin>;

/// Where and as whom to connect.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SshTarget {
    pub hostname: String,
    pub port: u16,
    pub username: String,
    /// Identity file passed to ssh with `-i`.
    pub keyfile: Option<PathBuf>,
}

impl SshTarget {
    /// Create a target on the default Gerrit SSH port.
    #[must_use]
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            port: super::DEFAULT_PORT,
            username: username.into(),
            keyfile: None,
        }
    }

    /// Set the port.
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Set the identity file.
    #[must_use]
    pub fn keyfile(mut self, keyfile: impl Into<PathBuf>) -> Self {
        self.keyfile = Some(keyfile.into());
        self
    }
}

/// A command running on the remote side of a session.
#[async_trait]
pub trait RemoteCommand: Send {
    /// Take ownership of the stdout stream. Returns `None` after the first call.
    fn take_stdout(&mut self) -> Option<BoxedReader>;

    /// Take ownership of the stderr stream. Returns `None` after the first call.
    fn take_stderr(&mut self) -> Option<BoxedReader>;

    /// Wait for the command to finish.
    ///
    /// Returns `None` when the command was terminated without an exit code.
    async fn exit_status(&mut self) -> Result<Option<i32>, TransportError>;
}

/// An authenticated remote execution context.
#[async_trait]
pub trait Session: Send {
    /// Execute a single command.
    async fn exec(&mut self, command: &str) -> Result<Box<dyn RemoteCommand>, TransportError>;

    /// Close the session. Closing an already closed session is a no-op.
    async fn close(&mut self) -> Result<(), TransportError>;
}

/// Opens sessions to a host.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Open a fresh session.
    ///
    /// Implementations release anything they partially set up before
    /// returning an error.
    async fn open(&self, target: &SshTarget) -> Result<Box<dyn Session>, TransportError>;
}

/// Close a session, logging rather than returning any failure.
pub async fn close_quietly(session: &mut dyn Session) {
    if let Err(e) = session.close().await {
        tracing::warn!(error = %e, "Failure closing session");
    }
}
