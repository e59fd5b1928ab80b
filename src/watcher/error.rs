//! Watcher error types.

use crate::ssh::TransportError;

/// Why [`ConnectionManager::connect`](super::ConnectionManager::connect) gave up.
#[derive(thiserror::Error, Debug)]
pub enum ConnectError {
    /// Every planned attempt failed.
    #[error("Gave up after {attempts} connection attempt(s): {source}")]
    Exhausted {
        attempts: u64,
        #[source]
        source: TransportError,
    },

    /// The cancellation token fired while connecting.
    #[error("Connection cancelled")]
    Cancelled,
}

/// Terminal failures of the watcher task.
#[derive(thiserror::Error, Debug)]
pub enum WatcherError {
    /// The connection plan was exhausted.
    #[error("Watcher stopped: gave up after {attempts} connection attempt(s): {source}")]
    Exhausted {
        attempts: u64,
        #[source]
        source: TransportError,
    },

    /// The watcher task panicked or was aborted.
    #[error("Watcher task failed: {0}")]
    Join(#[from] tokio::task::JoinError),
}
