//! Configuration types.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::ConfigError;
use crate::ssh::{SshTarget, DEFAULT_PORT};
use crate::watcher::WatcherSettings;

/// Connection settings for a Gerrit server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GerritConfig {
    /// Gerrit host name.
    #[serde(default)]
    pub hostname: String,
    /// Account used for SSH.
    #[serde(default)]
    pub username: String,
    /// SSH daemon port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Identity file; a leading `~/` is expanded.
    #[serde(default)]
    pub keyfile: Option<PathBuf>,
    /// Local ssh binary.
    #[serde(default = "default_ssh_binary")]
    pub ssh_binary: String,
    /// Extra `-o` options, e.g. `StrictHostKeyChecking=accept-new`.
    #[serde(default)]
    pub ssh_options: Vec<String>,
    /// Seconds to wait for a session to open.
    #[serde(default = "default_open_timeout_secs")]
    pub open_timeout_secs: u64,
    #[serde(default)]
    pub watcher: WatcherConfig,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_ssh_binary() -> String {
    "ssh".to_string()
}

fn default_open_timeout_secs() -> u64 {
    30
}

impl Default for GerritConfig {
    fn default() -> Self {
        Self {
            hostname: String::new(),
            username: String::new(),
            port: default_port(),
            keyfile: None,
            ssh_binary: default_ssh_binary(),
            ssh_options: Vec::new(),
            open_timeout_secs: default_open_timeout_secs(),
            watcher: WatcherConfig::default(),
        }
    }
}

impl GerritConfig {
    /// Create a configuration with defaults for everything but host and user.
    #[must_use]
    pub fn new(hostname: impl Into<String>, username: impl Into<String>) -> Self {
        Self {
            hostname: hostname.into(),
            username: username.into(),
            ..Default::default()
        }
    }

    /// Check that the required fields are present.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` for an empty host or user, or
    /// `ConfigError::InvalidRetryDelay` for a bad watcher delay.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.hostname.trim().is_empty() {
            return Err(ConfigError::MissingField("hostname"));
        }
        if self.username.trim().is_empty() {
            return Err(ConfigError::MissingField("username"));
        }
        self.watcher.settings()?;
        Ok(())
    }

    /// The SSH target described by this configuration.
    #[must_use]
    pub fn target(&self) -> SshTarget {
        SshTarget {
            hostname: self.hostname.clone(),
            port: self.port,
            username: self.username.clone(),
            keyfile: self.keyfile.as_deref().map(expand_home),
        }
    }
}

fn expand_home(path: &std::path::Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}

/// Retry behaviour of the event watcher.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct WatcherConfig {
    /// Connect attempts before giving up; zero or negative retries forever.
    pub connection_attempts: i64,
    /// Seconds between connect attempts and between consume cycles.
    pub retry_delay_secs: f64,
}

impl Default for WatcherConfig {
    fn default() -> Self {
        Self {
            connection_attempts: -1,
            retry_delay_secs: 5.0,
        }
    }
}

impl WatcherConfig {
    /// Validated watcher settings.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidRetryDelay` if the delay is negative.
    pub fn settings(&self) -> Result<WatcherSettings, ConfigError> {
        WatcherSettings::new(self.connection_attempts, self.retry_delay_secs)
    }
}
