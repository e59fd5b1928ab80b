//! Long-lived watcher for the Gerrit event stream.
//!
//! Retries happen at two levels: [`ConnectionManager`] follows a bounded or
//! unbounded [`AttemptPlan`] while opening a session, and [`EventWatcher`]
//! restarts every consume cycle that fails mid-stream.

mod connect;
mod error;
mod machine;
mod plan;
mod status;

pub use connect::ConnectionManager;
pub use error::{ConnectError, WatcherError};
pub use machine::{EventWatcher, WatcherHandle, WatcherSettings};
pub use plan::{retry_delay_from_secs, AttemptLimit, AttemptPlan, ConnectionAttempt};
pub use status::{StatusTracker, WatcherStatus, STATUS_HISTORY_LIMIT};
