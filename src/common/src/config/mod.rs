use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use once_cell::sync::OnceCell;

pub static CONFIG: OnceCell<Configuration> = OnceCell::new();

/// Configuration for the store backends the janitor is wired to.
///
/// Production deployments embed the janitor as a library and supply their own
/// store implementations; the `memory` backend exists for standalone mode and
/// tests.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Backend selector (`memory` is the only built-in backend)
    pub backend: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: String::from("memory"),
        }
    }
}

/// Settings for the retention manager.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RetentionSettings {
    /// Whether the retention manager is enabled at all
    pub enabled: bool,
    /// Whether an enabled manager starts its scheduler automatically
    pub start_enabled: bool,
    /// Interval between scheduled retention cycles
    #[serde(with = "humantime_serde")]
    pub schedule_interval: Duration,
    /// Name of the cluster-wide lock guarding a cycle
    pub lock_key: String,
    /// Maximum number of candidates fetched per rule per cycle
    pub batch_size: usize,
    /// Maximum number of deletions running concurrently within a rule
    pub max_deletion_concurrency: usize,
}

impl Default for RetentionSettings {
    fn default() -> Self {
        Self {
            // Disabled by default for safety
            enabled: false,
            start_enabled: true,
            schedule_interval: Duration::from_millis(30000),
            lock_key: String::from("retention_manager_lock"),
            batch_size: 1500,
            max_deletion_concurrency: 2,
        }
    }
}

impl RetentionSettings {
    /// Validate the retention settings.
    ///
    /// Checks:
    /// - Schedule interval is positive
    /// - Batch size is positive
    /// - Deletion concurrency is positive
    /// - Lock key is non-empty
    pub fn validate(&self) -> Result<(), RetentionSettingsError> {
        if self.schedule_interval.is_zero() {
            return Err(RetentionSettingsError::InvalidScheduleInterval(
                self.schedule_interval,
            ));
        }
        if self.batch_size == 0 {
            return Err(RetentionSettingsError::InvalidBatchSize(self.batch_size));
        }
        if self.max_deletion_concurrency == 0 {
            return Err(RetentionSettingsError::InvalidConcurrency(
                self.max_deletion_concurrency,
            ));
        }
        if self.lock_key.is_empty() {
            return Err(RetentionSettingsError::EmptyLockKey);
        }
        Ok(())
    }
}

/// Errors that can occur during retention settings validation.
#[derive(Error, Debug)]
pub enum RetentionSettingsError {
    /// Schedule interval must be positive.
    #[error("Invalid schedule interval: {0:?} must be positive")]
    InvalidScheduleInterval(Duration),

    /// Batch size must be positive.
    #[error("Invalid batch size: {0} must be positive")]
    InvalidBatchSize(usize),

    /// Deletion concurrency must be positive.
    #[error("Invalid deletion concurrency: {0} must be positive")]
    InvalidConcurrency(usize),

    /// Lock key must be non-empty.
    #[error("Lock key cannot be empty")]
    EmptyLockKey,
}

#[derive(Clone, Debug, Serialize, Deserialize, Default)]
pub struct Configuration {
    /// Store backend configuration
    pub storage: StorageConfig,
    /// Retention manager settings
    pub retention: RetentionSettings,
}

impl Configuration {
    pub fn load() -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file("graphvault.toml"))
            .merge(Env::prefixed("GRAPHVAULT__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }

    pub fn load_from_path(path: &Path) -> Result<Self, Box<figment::Error>> {
        let config = Figment::from(Serialized::defaults(Configuration::default()))
            .merge(Toml::file(path))
            .merge(Env::prefixed("GRAPHVAULT__").split("__"))
            .extract()
            .map_err(Box::new)?;

        Ok(config)
    }
}
