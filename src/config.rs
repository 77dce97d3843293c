//! Configuration model for exlock.
//!
//! Defines the Config struct representing `exlock.yaml`. Supports
//! forward-compatible YAML parsing (unknown fields are ignored), sensible
//! defaults for every field, and validation of config values. The config
//! file is optional: absent file means all defaults.

use crate::backoff::{Backoff, DEFAULT_RETRY_INTERVAL_MILLIS, DEFAULT_WAIT_BUDGET_MILLIS};
use crate::error::{ExlockError, Result};
use crate::guard::DEFAULT_LEASE_TTL_MILLIS;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Default config file name, looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "exlock.yaml";

/// Configuration for exlock.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory holding lease files (the shared store).
    #[serde(default = "default_lease_dir")]
    pub lease_dir: String,

    /// Default lease TTL in milliseconds for guarded operations.
    #[serde(default = "default_lease_ttl_millis")]
    pub lease_ttl_millis: u64,

    /// Total wall-clock budget for blocking acquisition, in milliseconds.
    #[serde(default = "default_wait_budget_millis")]
    pub wait_budget_millis: u64,

    /// Delay before the first acquisition retry, in milliseconds.
    #[serde(default = "default_retry_interval_millis")]
    pub retry_interval_millis: u64,
}

// Default value functions for serde
fn default_lease_dir() -> String {
    ".exlock/leases".to_string()
}
fn default_lease_ttl_millis() -> u64 {
    DEFAULT_LEASE_TTL_MILLIS
}
fn default_wait_budget_millis() -> u64 {
    DEFAULT_WAIT_BUDGET_MILLIS
}
fn default_retry_interval_millis() -> u64 {
    DEFAULT_RETRY_INTERVAL_MILLIS
}

impl Default for Config {
    fn default() -> Self {
        Self {
            lease_dir: default_lease_dir(),
            lease_ttl_millis: default_lease_ttl_millis(),
            wait_budget_millis: default_wait_budget_millis(),
            retry_interval_millis: default_retry_interval_millis(),
        }
    }
}

impl Config {
    /// Load config from a YAML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            ExlockError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Load config from an explicit path, or from `exlock.yaml` in the
    /// working directory if present, or defaults otherwise.
    ///
    /// An explicit path that does not exist is an error; the implicit
    /// default file is allowed to be absent.
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load(default_path)
                } else {
                    Ok(Self::default())
                }
            }
        }
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(yaml)
            .map_err(|e| ExlockError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| ExlockError::UserError(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values.
    ///
    /// Rules:
    /// - `lease_dir` must be non-empty
    /// - `lease_ttl_millis`, `wait_budget_millis`, `retry_interval_millis`
    ///   must be positive
    /// - `retry_interval_millis` must not exceed `wait_budget_millis`
    pub fn validate(&self) -> Result<()> {
        if self.lease_dir.trim().is_empty() {
            return Err(ExlockError::Config(
                "config validation failed: lease_dir must be non-empty".to_string(),
            ));
        }

        if self.lease_ttl_millis == 0 {
            return Err(ExlockError::Config(
                "config validation failed: lease_ttl_millis must be greater than 0".to_string(),
            ));
        }

        if self.wait_budget_millis == 0 {
            return Err(ExlockError::Config(
                "config validation failed: wait_budget_millis must be greater than 0".to_string(),
            ));
        }

        if self.retry_interval_millis == 0 {
            return Err(ExlockError::Config(
                "config validation failed: retry_interval_millis must be greater than 0"
                    .to_string(),
            ));
        }

        if self.retry_interval_millis > self.wait_budget_millis {
            return Err(ExlockError::Config(format!(
                "config validation failed: retry_interval_millis ({}) exceeds wait_budget_millis ({})",
                self.retry_interval_millis, self.wait_budget_millis
            )));
        }

        Ok(())
    }

    /// Backoff policy described by this config.
    pub fn backoff(&self) -> Backoff {
        Backoff::new(self.retry_interval_millis, self.wait_budget_millis)
    }
}
