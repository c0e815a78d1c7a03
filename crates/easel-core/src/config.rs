//! Worker configuration.
//!
//! Precedence (highest to lowest):
//! 1. Environment variables (`EASEL_WORKER_*`)
//! 2. Config file (TOML)
//! 3. Default values
//!
//! Every field has a default, so a config file only needs the keys it changes.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::Semaphore;
use tracing::debug;

use crate::processors::ProcessorSettings;

pub const ENV_CONCURRENCY: &str = "EASEL_WORKER_CONCURRENCY";
pub const ENV_POLL_INTERVAL_MS: &str = "EASEL_WORKER_POLL_INTERVAL_MS";
pub const ENV_RATE_LIMIT: &str = "EASEL_WORKER_RATE_LIMIT";
pub const ENV_BASE_DIMENSION: &str = "EASEL_WORKER_BASE_DIMENSION";
pub const ENV_ASSET_BUCKET: &str = "EASEL_WORKER_ASSET_BUCKET";
pub const ENV_TITLE_MAX_CHARS: &str = "EASEL_WORKER_TITLE_MAX_CHARS";
pub const ENV_LOG_LEVEL: &str = "EASEL_WORKER_LOG_LEVEL";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid value {value:?} for {key}")]
    InvalidEnv { key: &'static str, value: String },

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Worker tuning knobs.
///
/// # Example
///
/// ```toml
/// concurrency = 5
/// rate_limit_per_second = 1.5
/// asset_bucket = "canvas-prod"
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Maximum tasks in flight at once.
    pub concurrency: usize,
    /// Sleep between polls; doubled after a failed poll.
    pub poll_interval_ms: u64,
    /// Provider calls per second, shared by every processor.
    pub rate_limit_per_second: f64,
    /// Long edge of ratio-derived generation sizes.
    pub base_dimension: u32,
    pub asset_bucket: String,
    pub title_max_chars: usize,
    /// Default `tracing` filter; `RUST_LOG` wins over it.
    pub log_level: String,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            concurrency: 3,
            poll_interval_ms: 5000,
            rate_limit_per_second: 2.0,
            base_dimension: crate::domain::dimensions::DEFAULT_BASE_DIMENSION,
            asset_bucket: "canvas".to_string(),
            title_max_chars: 50,
            log_level: "info".to_string(),
        }
    }
}

impl WorkerConfig {
    /// Defaults, then `path` if given, then the environment. Validated.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        Self::load_over(Self::default(), path)
    }

    /// Like `load`, but the file and the environment are layered over `base`
    /// instead of the built-in defaults. Keys the file omits keep `base`'s value.
    pub fn load_over(base: Self, path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => {
                debug!(path = %path.display(), "loading worker config");
                base.merged_with_file(path)?
            }
            None => base,
        };
        config.apply_env_overrides()?;
        config.validate()?;
        debug!(?config, "worker configuration loaded");
        Ok(config)
    }

    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        Self::default().merged_with_file(path)
    }

    fn merged_with_file(self, path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let parse_error = |source: toml::de::Error| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        };
        let file: toml::Table = content.parse().map_err(parse_error)?;
        let mut merged = match toml::Value::try_from(&self) {
            Ok(toml::Value::Table(table)) => table,
            Ok(other) => {
                return Err(ConfigError::Invalid(format!(
                    "config serialized to a {}, not a table",
                    other.type_str()
                )));
            }
            Err(e) => return Err(ConfigError::Invalid(e.to_string())),
        };
        merged.extend(file);
        toml::Value::Table(merged).try_into().map_err(parse_error)
    }

    pub fn apply_env_overrides(&mut self) -> Result<(), ConfigError> {
        self.apply_overrides(|key| std::env::var(key).ok())
    }

    /// Apply overrides from `lookup` (an environment-like key/value source).
    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) -> Result<(), ConfigError> {
        if let Some(v) = parsed(&lookup, ENV_CONCURRENCY)? {
            self.concurrency = v;
        }
        if let Some(v) = parsed(&lookup, ENV_POLL_INTERVAL_MS)? {
            self.poll_interval_ms = v;
        }
        if let Some(v) = parsed(&lookup, ENV_RATE_LIMIT)? {
            self.rate_limit_per_second = v;
        }
        if let Some(v) = parsed(&lookup, ENV_BASE_DIMENSION)? {
            self.base_dimension = v;
        }
        if let Some(v) = lookup(ENV_ASSET_BUCKET) {
            self.asset_bucket = v;
        }
        if let Some(v) = parsed(&lookup, ENV_TITLE_MAX_CHARS)? {
            self.title_max_chars = v;
        }
        if let Some(v) = lookup(ENV_LOG_LEVEL) {
            self.log_level = v;
        }
        Ok(())
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.concurrency == 0 {
            return Err(ConfigError::Invalid("concurrency must be at least 1".into()));
        }
        if self.concurrency > Semaphore::MAX_PERMITS {
            return Err(ConfigError::Invalid(format!(
                "concurrency must be at most {}, got {}",
                Semaphore::MAX_PERMITS,
                self.concurrency
            )));
        }
        if self.poll_interval_ms == 0 {
            return Err(ConfigError::Invalid("poll_interval_ms must be positive".into()));
        }
        if !(self.rate_limit_per_second.is_finite() && self.rate_limit_per_second > 0.0) {
            return Err(ConfigError::Invalid(format!(
                "rate_limit_per_second must be a positive number, got {}",
                self.rate_limit_per_second
            )));
        }
        if self.base_dimension == 0 {
            return Err(ConfigError::Invalid("base_dimension must be positive".into()));
        }
        if self.asset_bucket.trim().is_empty() {
            return Err(ConfigError::Invalid("asset_bucket must not be empty".into()));
        }
        Ok(())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn processor_settings(&self) -> ProcessorSettings {
        ProcessorSettings {
            asset_bucket: self.asset_bucket.clone(),
            base_dimension: self.base_dimension,
            title_max_chars: self.title_max_chars,
        }
    }
}

fn parsed<T: std::str::FromStr>(
    lookup: &impl Fn(&str) -> Option<String>,
    key: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = lookup(key) else {
        return Ok(None);
    };
    raw.trim()
        .parse()
        .map(Some)
        .map_err(|_| ConfigError::InvalidEnv { key, value: raw })
}
