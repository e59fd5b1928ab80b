//! The watcher state machine.
//!
//! One run loop iteration is a consume cycle: connect, start
//! `gerrit stream-events`, push records until the stream fails, close the
//! session, wait, and go again. Consume-time failures are always retried;
//! only an exhausted connection plan or cancellation ends the loop.

use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use super::{
    retry_delay_from_secs, AttemptLimit, ConnectError, ConnectionManager, StatusTracker,
    WatcherError, WatcherStatus,
};
use crate::config::ConfigError;
use crate::queue::EventQueue;
use crate::ssh::{close_quietly, Session};
use crate::stream::{drain_stderr, listen, CycleEnd, StreamError, STREAM_EVENTS_COMMAND};

/// Retry settings fixed at watcher construction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatcherSettings {
    /// Connect-time attempt limit.
    pub attempt_limit: AttemptLimit,
    /// Delay between connect attempts and between consume cycles.
    pub retry_delay: Duration,
}

impl Default for WatcherSettings {
    fn default() -> Self {
        Self {
            attempt_limit: AttemptLimit::Unbounded,
            retry_delay: Duration::from_secs(5),
        }
    }
}

impl WatcherSettings {
    /// Build settings from raw values; `connection_attempts <= 0` is unbounded.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetryDelay` if `retry_delay_secs` is
    /// negative or not finite.
    pub fn new(connection_attempts: i64, retry_delay_secs: f64) -> Result<Self, ConfigError> {
        Ok(Self {
            attempt_limit: AttemptLimit::from_count(connection_attempts),
            retry_delay: retry_delay_from_secs(retry_delay_secs)?,
        })
    }
}

/// Background watcher feeding an [`EventQueue`].
#[derive(Debug)]
pub struct EventWatcher {
    connector: ConnectionManager,
    settings: WatcherSettings,
    queue: Arc<EventQueue>,
    status: Arc<StatusTracker>,
}

impl EventWatcher {
    #[must_use]
    pub fn new(connector: ConnectionManager, settings: WatcherSettings, queue: Arc<EventQueue>) -> Self {
        Self {
            connector,
            settings,
            queue,
            status: Arc::new(StatusTracker::new()),
        }
    }

    /// Shared status cell of this watcher.
    #[must_use]
    pub fn status(&self) -> Arc<StatusTracker> {
        Arc::clone(&self.status)
    }

    /// Run the watcher on its own task.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    #[must_use]
    pub fn spawn(self) -> WatcherHandle {
        let cancel = CancellationToken::new();
        let status = self.status();
        let task = tokio::spawn(self.run(cancel.clone()));
        WatcherHandle {
            cancel,
            status,
            task,
        }
    }

    /// Run until `cancel` fires or the connection plan is exhausted.
    ///
    /// The status is `dead` when this returns.
    ///
    /// # Errors
    ///
    /// Returns `WatcherError::Exhausted` when no session could be opened.
    pub async fn run(self, cancel: CancellationToken) -> Result<(), WatcherError> {
        let result = self.run_loop(&cancel).await;
        self.status.transition(WatcherStatus::Dead);
        match &result {
            Ok(()) => tracing::info!("Event watcher stopped"),
            Err(e) => tracing::error!(error = %e, "Event watcher terminated"),
        }
        result
    }

    async fn run_loop(&self, cancel: &CancellationToken) -> Result<(), WatcherError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(());
            }
            self.status.transition(WatcherStatus::Disconnected);
            self.status.transition(WatcherStatus::Connecting);

            let session = match self
                .connector
                .connect(self.settings.attempt_limit, self.settings.retry_delay, cancel)
                .await
            {
                Ok(session) => session,
                Err(ConnectError::Cancelled) => return Ok(()),
                Err(ConnectError::Exhausted { attempts, source }) => {
                    return Err(WatcherError::Exhausted { attempts, source });
                }
            };
            self.status.transition(WatcherStatus::Connected);

            match self.consume(session, cancel).await {
                CycleEnd::Cancelled => return Ok(()),
                CycleEnd::Failed(e) => {
                    tracing::warn!(error = %e, "Exception consuming ssh event stream");
                }
            }
            self.status.transition(WatcherStatus::Disconnected);

            let delay = self.settings.retry_delay;
            if delay > Duration::ZERO {
                tracing::info!(delay = ?delay, "Delaying consumption retry");
                tokio::select! {
                    biased;

                    () = cancel.cancelled() => return Ok(()),
                    () = tokio::time::sleep(delay) => {}
                }
            }
        }
    }

    /// One consume cycle on an open session. The session is always closed.
    async fn consume(&self, mut session: Box<dyn Session>, cancel: &CancellationToken) -> CycleEnd {
        let end = self.stream_events(session.as_mut(), cancel).await;
        close_quietly(session.as_mut()).await;
        end
    }

    async fn stream_events(&self, session: &mut dyn Session, cancel: &CancellationToken) -> CycleEnd {
        let mut command = match session.exec(STREAM_EVENTS_COMMAND).await {
            Ok(command) => command,
            Err(e) => return CycleEnd::Failed(StreamError::Transport(e)),
        };
        let Some(stdout) = command.take_stdout() else {
            return CycleEnd::Failed(StreamError::NoStdout);
        };
        // Ends by itself once the command exits or is dropped
        if let Some(stderr) = command.take_stderr() {
            tokio::spawn(drain_stderr(stderr));
        }

        self.status.transition(WatcherStatus::Consuming);
        match listen(stdout, &self.queue, cancel).await {
            CycleEnd::Failed(StreamError::Hangup) => {
                let status = tokio::select! {
                    biased;

                    () = cancel.cancelled() => return CycleEnd::Cancelled,
                    status = command.exit_status() => status,
                };
                tracing::debug!(status = ?status, "SSH exit status");
                match status {
                    Ok(Some(code)) if code != 0 => CycleEnd::Failed(StreamError::RemoteExit { code }),
                    _ => CycleEnd::Failed(StreamError::Hangup),
                }
            }
            other => other,
        }
    }
}

/// Handle to a spawned [`EventWatcher`].
#[derive(Debug)]
pub struct WatcherHandle {
    cancel: CancellationToken,
    status: Arc<StatusTracker>,
    task: JoinHandle<Result<(), WatcherError>>,
}

impl WatcherHandle {
    /// Current status of the watcher.
    #[must_use]
    pub fn status(&self) -> WatcherStatus {
        self.status.current()
    }

    /// Shared status cell, for subscribing or reading history.
    #[must_use]
    pub fn status_tracker(&self) -> Arc<StatusTracker> {
        Arc::clone(&self.status)
    }

    /// Signal the watcher to stop at its next suspension point.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether the watcher task has ended.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Cancel the watcher and wait for it to finish.
    ///
    /// # Errors
    ///
    /// Returns the watcher's terminal error if it had already given up, or
    /// `WatcherError::Join` if the task panicked.
    pub async fn stop(self) -> Result<(), WatcherError> {
        self.cancel.cancel();
        self.join().await
    }

    /// Wait for the watcher to finish without cancelling it.
    ///
    /// # Errors
    ///
    /// Same as [`stop`](Self::stop).
    pub async fn join(self) -> Result<(), WatcherError> {
        self.task.await?
    }
}
