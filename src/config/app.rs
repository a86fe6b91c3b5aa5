//! Store configuration structures.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::store::{BackendKind, DEFAULT_CHANNEL_CAPACITY, StoreBuilder};

use super::validation::{ConfigError, expand_env_vars, parse_duration};

fn default_backend() -> BackendKind {
    BackendKind::Pooled
}

fn default_channel_capacity() -> usize {
    DEFAULT_CHANNEL_CAPACITY
}

fn default_connect_timeout() -> String {
    "30s".to_string()
}

fn default_busy_timeout() -> String {
    "5s".to_string()
}

/// Counter store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Store connection URL, e.g., `sqlite:data/tally.db`.
    pub url: String,

    /// Backend kind: `direct` or `pooled` (default: pooled).
    #[serde(default = "default_backend")]
    pub backend: BackendKind,

    /// Command channel capacity for the pool actor (default: 1024).
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Deadline for one connection attempt (default: "30s").
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: String,

    /// Busy timeout for write contention between connections (default: "5s").
    #[serde(default = "default_busy_timeout")]
    pub busy_timeout: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            url: "sqlite:tally.db".to_string(),
            backend: BackendKind::Pooled,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
            connect_timeout: "30s".to_string(),
            busy_timeout: "5s".to_string(),
        }
    }
}

impl StoreConfig {
    /// Load configuration from a YAML file.
    ///
    /// Environment variables in the file content are expanded before parsing,
    /// so the store URL can be supplied as `${TALLY_STORE_URL}`.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        let config: Self = serde_yaml::from_str(&expand_env_vars(&content))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.url.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "store url must not be empty".to_string(),
            ));
        }

        if self.channel_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "channel_capacity must be positive".to_string(),
            ));
        }

        parse_duration(&self.connect_timeout)
            .map_err(|e| ConfigError::ValidationError(format!("connect_timeout: {e}")))?;
        parse_duration(&self.busy_timeout)
            .map_err(|e| ConfigError::ValidationError(format!("busy_timeout: {e}")))?;

        Ok(())
    }

    /// Create a [`StoreBuilder`] from this configuration.
    ///
    /// Validates first, so a builder is only handed out for a usable config.
    pub fn builder(&self) -> Result<StoreBuilder, ConfigError> {
        self.validate()?;
        Ok(StoreBuilder::new(self.url.clone())
            .backend(self.backend)
            .channel_capacity(self.channel_capacity)
            .connect_timeout(self.connect_timeout()?)
            .busy_timeout(self.busy_timeout()?))
    }

    /// Parsed connect timeout. Call after `validate()`.
    pub fn connect_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.connect_timeout)
            .map_err(|e| ConfigError::ValidationError(format!("connect_timeout: {e}")))
    }

    /// Parsed busy timeout. Call after `validate()`.
    pub fn busy_timeout(&self) -> Result<Duration, ConfigError> {
        parse_duration(&self.busy_timeout)
            .map_err(|e| ConfigError::ValidationError(format!("busy_timeout: {e}")))
    }
}
