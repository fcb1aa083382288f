//! Service configuration, read from TOML
use super::error::ValidationError;
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const SYSTEM_USER: &str = "SYSTEM_WORKER";

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct ServiceConfig {
    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub worker: WorkerConfig,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct StorageConfig {
    /// Directory of the sled database
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

/// Periodic submit/approve triggers
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct WorkerConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Maximum documents picked up per tick
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,

    #[serde(default = "default_interval_ms")]
    pub submit_interval_ms: u64,

    #[serde(default = "default_interval_ms")]
    pub approve_interval_ms: u64,

    /// User id recorded in history entries written by the workers
    #[serde(default = "default_system_user")]
    pub system_user: String,
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/documents.db")
}

fn default_enabled() -> bool {
    true
}

fn default_batch_size() -> usize {
    100
}

fn default_interval_ms() -> u64 {
    10_000
}

fn default_system_user() -> String {
    SYSTEM_USER.to_string()
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            batch_size: default_batch_size(),
            submit_interval_ms: default_interval_ms(),
            approve_interval_ms: default_interval_ms(),
            system_user: default_system_user(),
        }
    }
}

impl ServiceConfig {
    pub fn load(path: impl AsRef<Path>) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::from_toml(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(config)
    }

    pub fn from_toml(raw: &str) -> anyhow::Result<Self> {
        let config: Self = toml::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        self.worker.validate()
    }
}

impl WorkerConfig {
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.batch_size == 0 {
            return Err(ValidationError::NotPositive("worker.batch_size"));
        }
        if self.submit_interval_ms == 0 {
            return Err(ValidationError::NotPositive("worker.submit_interval_ms"));
        }
        if self.approve_interval_ms == 0 {
            return Err(ValidationError::NotPositive("worker.approve_interval_ms"));
        }
        if self.system_user.trim().is_empty() {
            return Err(ValidationError::MissingUser);
        }
        Ok(())
    }

    pub fn submit_interval(&self) -> Duration {
        Duration::from_millis(self.submit_interval_ms)
    }

    pub fn approve_interval(&self) -> Duration {
        Duration::from_millis(self.approve_interval_ms)
    }
}
