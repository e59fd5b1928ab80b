//! Administrative command error types.

use crate::ssh::TransportError;

/// Errors from administrative commands. None of them are retried.
#[derive(thiserror::Error, Debug)]
pub enum AdminError {
    /// The command exited with a non-zero status.
    #[error("Gerrit error executing {command} (exit status {code:?}): {stderr}")]
    CommandFailed {
        command: String,
        code: Option<i32>,
        stderr: String,
    },

    /// The session could not be opened or used.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),

    /// Reading command output failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The response was not the expected JSON.
    #[error("Failed to parse Gerrit response: {0}")]
    Json(#[from] serde_json::Error),

    /// `set-project` was asked to change an unsupported key.
    #[error("Trying to update a non-valid key {0}")]
    InvalidUpdateKey(String),

    /// A version string could not be parsed.
    #[error("Invalid Gerrit version: {0:?}")]
    InvalidVersion(String),

    /// Output did not have the expected shape.
    #[error("Unexpected output from {command}: {output:?}")]
    UnexpectedOutput { command: String, output: String },
}
