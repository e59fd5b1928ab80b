//! Transport error types.

use std::time::Duration;

/// Error type for spawning the local `ssh` binary.
#[derive(thiserror::Error, Debug)]
pub enum SpawnError {
    /// The binary was not found.
    #[error("ssh binary not found: {0}")]
    NotFound(String),
    /// Permission denied when spawning.
    #[error("Permission denied spawning {0}")]
    PermissionDenied(String),
    /// Other I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl SpawnError {
    /// Create a `SpawnError` from an I/O error, classifying common cases.
    pub(crate) fn from_io(binary: &str, err: std::io::Error) -> Self {
        match err.kind() {
            std::io::ErrorKind::NotFound => Self::NotFound(binary.to_string()),
            std::io::ErrorKind::PermissionDenied => Self::PermissionDenied(binary.to_string()),
            _ => Self::Io(err),
        }
    }
}

/// Errors raised while opening, using or closing a remote session.
#[derive(thiserror::Error, Debug)]
pub enum TransportError {
    /// The local ssh process could not be started.
    #[error("Failed to spawn ssh: {0}")]
    Spawn(#[from] SpawnError),

    /// The connection was refused or authentication failed.
    #[error("Failed to connect to {host}:{port} (exit status {code:?}): {stderr}")]
    Open {
        host: String,
        port: u16,
        code: Option<i32>,
        stderr: String,
    },

    /// The session did not become ready in time.
    #[error("Timed out connecting to {host}:{port} after {after:?}")]
    Timeout {
        host: String,
        port: u16,
        after: Duration,
    },

    /// The session was already closed.
    #[error("Session is closed")]
    Closed,

    /// Tearing the session down failed.
    #[error("Failed to close session: {source}")]
    Close { source: std::io::Error },

    /// Other I/O error on the session.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
