//! Stream error types.

use crate::ssh::TransportError;

/// Failures of a single consume cycle.
///
/// Every variant is transient: the watcher logs it, closes the session and
/// reconnects.
#[derive(thiserror::Error, Debug)]
pub enum StreamError {
    /// A line was not a JSON object.
    #[error("Malformed event line {input:?}: {reason}")]
    Malformed { input: String, reason: String },

    /// The remote side closed the stream.
    #[error("Event stream closed by remote")]
    Hangup,

    /// The stream command exited with a failure status.
    #[error("Gerrit error executing stream-events: return code {code}")]
    RemoteExit { code: i32 },

    /// The command's stdout was not available.
    #[error("Stream stdout not available")]
    NoStdout,

    /// Reading from the channel failed.
    #[error("I/O error on event stream: {0}")]
    Io(#[from] std::io::Error),

    /// Executing the stream command failed.
    #[error("Transport error: {0}")]
    Transport(#[from] TransportError),
}
