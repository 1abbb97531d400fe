//! Configuration for the wrapper.
//!
//! Configuration sources (highest priority first):
//! 1. CLI flags
//! 2. Environment variables (CRONALERT_*, resolved by the CLI layer)
//! 3. Config file (--config / CRONALERT_CONFIG, else ~/.cronalert/config.yaml)
//! 4. Defaults
//!
//! The resolved `Config` is the only configuration the core sees.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::adapters::DeliverySettings;

/// Default notification endpoint
pub const DEFAULT_ENDPOINT: &str = "https://api.sendgrid.com/v3/mail/send";

/// Default realm when none is configured
pub const DEFAULT_REALM: &str = "default";

/// Default log directory, relative to the working directory
pub const DEFAULT_LOG_DIR: &str = "logs";

/// Environment variable set in the child's environment
pub const WRAPPED_ENV_VAR: &str = "CRONALERT_WRAPPED";

/// Configuration errors. Fatal before anything runs.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("No sender address configured (use -f or set CRONALERT_FROM)")]
    MissingSender,

    #[error("Invalid config file {path}: {message}")]
    ConfigFile { path: PathBuf, message: String },
}

/// Raw config file schema (matches YAML structure)
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub from: Option<String>,
    pub to: Option<String>,
    pub realm: Option<String>,
    pub endpoint: Option<String>,
    pub log_dir: Option<String>,
    #[serde(default)]
    pub delivery: Option<DeliveryConfig>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DeliveryConfig {
    pub max_retries: Option<u32>,
    pub retry_delay_ms: Option<u64>,
    pub timeout_seconds: Option<u64>,
}

/// Values supplied by flags or environment; `None` defers to the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub from: Option<String>,
    pub to: Option<String>,
    pub realm: Option<String>,
    pub endpoint: Option<String>,
    pub log_dir: Option<PathBuf>,
    pub api_token: Option<String>,
    pub always_notify: bool,
    pub debug: bool,
}

/// Resolved configuration passed to the orchestrator
#[derive(Debug, Clone)]
pub struct Config {
    /// Sender address (required before running)
    pub from_email: Option<String>,
    /// Recipient address; falls back to the sender
    pub to_email: Option<String>,
    /// Deployment name used in subjects and display names
    pub realm: String,
    /// Notification API endpoint
    pub endpoint: String,
    /// Bearer token for the notification API
    pub api_token: Option<String>,
    /// Directory for per-run log files
    pub log_dir: PathBuf,
    /// Notify on success as well as failure
    pub always_notify: bool,
    /// Echo raw API responses for every attempt
    pub debug: bool,
    /// Retry and timeout settings
    pub delivery: DeliverySettings,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            from_email: None,
            to_email: None,
            realm: DEFAULT_REALM.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            api_token: None,
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            always_notify: false,
            debug: false,
            delivery: DeliverySettings::default(),
        }
    }
}

impl Config {
    /// Layer overrides on top of an optional config file and defaults
    pub fn resolve(overrides: Overrides, file: Option<ConfigFile>) -> Self {
        let file = file.unwrap_or_default();
        let defaults = DeliverySettings::default();
        let delivery = file.delivery.unwrap_or_default();

        Self {
            from_email: non_empty(overrides.from).or_else(|| non_empty(file.from)),
            to_email: non_empty(overrides.to).or_else(|| non_empty(file.to)),
            realm: non_empty(overrides.realm)
                .or_else(|| non_empty(file.realm))
                .unwrap_or_else(|| DEFAULT_REALM.to_string()),
            endpoint: non_empty(overrides.endpoint)
                .or_else(|| non_empty(file.endpoint))
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            api_token: non_empty(overrides.api_token),
            log_dir: overrides
                .log_dir
                .or_else(|| file.log_dir.map(PathBuf::from))
                .unwrap_or_else(|| PathBuf::from(DEFAULT_LOG_DIR)),
            always_notify: overrides.always_notify,
            debug: overrides.debug,
            delivery: DeliverySettings {
                max_retries: delivery.max_retries.unwrap_or(defaults.max_retries),
                retry_delay: delivery
                    .retry_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(defaults.retry_delay),
                timeout: delivery
                    .timeout_seconds
                    .map(Duration::from_secs)
                    .unwrap_or(defaults.timeout),
            },
        }
    }

    /// Sender address, or `MissingSender`
    pub fn sender(&self) -> Result<&str, ConfigError> {
        self.from_email.as_deref().ok_or(ConfigError::MissingSender)
    }

    /// Recipient address; the sender when no recipient is configured
    pub fn recipient(&self) -> Result<&str, ConfigError> {
        match self.to_email.as_deref() {
            Some(to) => Ok(to),
            None => self.sender(),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Default config file location (~/.cronalert/config.yaml)
pub fn default_config_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".cronalert").join("config.yaml"))
}

/// Load and parse a config file
pub fn load_config_file(path: &Path) -> Result<ConfigFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })?;

    serde_yaml::from_str(&content).map_err(|e| ConfigError::ConfigFile {
        path: path.to_path_buf(),
        message: e.to_string(),
    })
}

/// Locate and load the config file.
///
/// An explicit path must exist and parse. The default path is skipped when
/// absent.
pub fn find_config_file(explicit: Option<&Path>) -> Result<Option<ConfigFile>, ConfigError> {
    if let Some(path) = explicit {
        return load_config_file(path).map(Some);
    }

    match default_config_path() {
        Some(path) if path.exists() => load_config_file(&path).map(Some),
        _ => Ok(None),
    }
}
