//! Consumer-facing Gerrit client.
//!
//! [`GerritClient`] owns the event queue and the background watcher, and
//! exposes the administrative commands. Administrative calls never share
//! the watcher's session; each opens its own.

mod admin;

use std::sync::Arc;

use tokio::sync::OnceCell;

use crate::config::{ConfigError, GerritConfig};
use crate::queue::EventQueue;
use crate::ssh::{OpenSshProvider, SessionProvider, SshTarget};
use crate::stream::EventRecord;
use crate::watcher::{
    ConnectionManager, EventWatcher, StatusTracker, WatcherError, WatcherHandle, WatcherSettings,
    WatcherStatus,
};

/// Client for a single Gerrit server.
pub struct GerritClient {
    target: SshTarget,
    provider: Arc<dyn SessionProvider>,
    queue: Arc<EventQueue>,
    watcher: Option<WatcherHandle>,
    installed_plugins: OnceCell<Vec<String>>,
}

impl std::fmt::Debug for GerritClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GerritClient")
            .field("target", &self.target)
            .field("watcher", &self.watcher)
            .finish_non_exhaustive()
    }
}

impl GerritClient {
    /// Create a client that talks to Gerrit through the local `ssh` binary.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if the configuration is incomplete or invalid.
    pub fn new(config: &GerritConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self::with_provider(
            config.target(),
            Arc::new(OpenSshProvider::from_config(config)),
        ))
    }

    /// Create a client with a custom session provider.
    #[must_use]
    pub fn with_provider(target: SshTarget, provider: Arc<dyn SessionProvider>) -> Self {
        Self {
            target,
            provider,
            queue: Arc::new(EventQueue::new()),
            watcher: None,
            installed_plugins: OnceCell::new(),
        }
    }

    /// The server this client talks to.
    #[must_use]
    pub fn target(&self) -> &SshTarget {
        &self.target
    }

    /// Start the background event watcher.
    ///
    /// `connection_attempts <= 0` retries forever. A watcher that is already
    /// running is cancelled and replaced; events it queued are kept.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetryDelay` if `retry_delay_secs` is
    /// negative. Nothing is started in that case.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start_watching(
        &mut self,
        connection_attempts: i64,
        retry_delay_secs: f64,
    ) -> Result<(), ConfigError> {
        let settings = WatcherSettings::new(connection_attempts, retry_delay_secs)?;
        self.start_watching_with(settings);
        Ok(())
    }

    /// Start the background event watcher with prepared settings.
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime.
    pub fn start_watching_with(&mut self, settings: WatcherSettings) {
        if let Some(previous) = self.watcher.take() {
            tracing::debug!("Replacing running event watcher");
            previous.cancel();
        }
        let connector = ConnectionManager::new(Arc::clone(&self.provider), self.target.clone());
        let watcher = EventWatcher::new(connector, settings, Arc::clone(&self.queue));
        tracing::info!(
            host = %self.target.hostname,
            port = self.target.port,
            attempt_limit = ?settings.attempt_limit,
            retry_delay = ?settings.retry_delay,
            "Starting event watcher"
        );
        self.watcher = Some(watcher.spawn());
    }

    /// Wait for the next event.
    pub async fn get_event(&self) -> EventRecord {
        self.queue.pop().await
    }

    /// Take the next event if one is queued.
    #[must_use]
    pub fn try_get_event(&self) -> Option<EventRecord> {
        self.queue.try_pop()
    }

    /// The queue events are delivered to, for sharing with other consumers.
    #[must_use]
    pub fn event_queue(&self) -> Arc<EventQueue> {
        Arc::clone(&self.queue)
    }

    /// Status of the current watcher, `idle` if none was started.
    #[must_use]
    pub fn watcher_status(&self) -> WatcherStatus {
        self.watcher
            .as_ref()
            .map_or(WatcherStatus::Idle, WatcherHandle::status)
    }

    /// Status cell of the current watcher.
    #[must_use]
    pub fn status_tracker(&self) -> Option<Arc<StatusTracker>> {
        self.watcher.as_ref().map(WatcherHandle::status_tracker)
    }

    /// Stop the watcher and wait for it to exit. A no-op if none is running.
    ///
    /// # Errors
    ///
    /// Returns the watcher's terminal error if it had already given up.
    pub async fn stop_watching(&mut self) -> Result<(), WatcherError> {
        match self.watcher.take() {
            Some(handle) => handle.stop().await,
            None => Ok(()),
        }
    }
}

impl Drop for GerritClient {
    fn drop(&mut self) {
        if let Some(handle) = &self.watcher {
            handle.cancel();
        }
    }
}
