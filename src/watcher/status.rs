//! Observable watcher status.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, PoisonError};

use serde::{Deserialize, Serialize};
use tokio::sync::watch;

/// Number of transitions kept for diagnostics.
pub const STATUS_HISTORY_LIMIT: usize = 256;

/// Lifecycle of the event watcher.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WatcherStatus {
    #[default]
    Idle,
    Connecting,
    Connected,
    Consuming,
    Disconnected,
    Dead,
}

impl fmt::Display for WatcherStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Idle => "idle",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Consuming => "consuming",
            Self::Disconnected => "disconnected",
            Self::Dead => "dead",
        };
        f.write_str(name)
    }
}

/// Status cell written by the watcher and read by observers.
///
/// Only the watcher task transitions it. Observers can read the current
/// value, subscribe to changes or inspect the recent history.
#[derive(Debug)]
pub struct StatusTracker {
    current: watch::Sender<WatcherStatus>,
    history: Mutex<VecDeque<WatcherStatus>>,
}

impl Default for StatusTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StatusTracker {
    #[must_use]
    pub fn new() -> Self {
        let (current, _) = watch::channel(WatcherStatus::Idle);
        let mut history = VecDeque::with_capacity(STATUS_HISTORY_LIMIT);
        history.push_back(WatcherStatus::Idle);
        Self {
            current,
            history: Mutex::new(history),
        }
    }

    #[must_use]
    pub fn current(&self) -> WatcherStatus {
        *self.current.borrow()
    }

    /// Receive every status change from now on.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WatcherStatus> {
        self.current.subscribe()
    }

    /// Recent distinct statuses, oldest first.
    #[must_use]
    pub fn history(&self) -> Vec<WatcherStatus> {
        self.history
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .copied()
            .collect()
    }

    /// Move to `to`. Setting the current status again is a no-op.
    pub fn transition(&self, to: WatcherStatus) {
        let mut from = to;
        let changed = self.current.send_if_modified(|status| {
            from = *status;
            if *status == to {
                false
            } else {
                *status = to;
                true
            }
        });
        if !changed {
            return;
        }

        tracing::debug!(%from, %to, "Watcher state transition");
        let mut history = self.history.lock().unwrap_or_else(PoisonError::into_inner);
        if history.len() == STATUS_HISTORY_LIMIT {
            history.pop_front();
        }
        history.push_back(to);
    }
}
