//! Client configuration
//!
//! [`ClientConfig`] carries everything the request executor needs from its
//! environment. Values come from environment variables or a JSON/TOML file
//! (see [`loader`]); durations are written as milliseconds.

pub mod loader;

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use stellar_common::duration_millis;
use stellar_common::resilience::{RetryConfig, DEFAULT_BASE_DELAY, DEFAULT_MAX_RETRIES};
use thiserror::Error;

use crate::http::DEFAULT_TIMEOUT;

// Re-export commonly used items
pub use loader::{load, load_from_env, load_from_file, oauth_identity_from_env, probe_config_paths};

/// Errors raised while loading or validating configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingVar(String),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Config file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("No config file found in any of the standard locations")]
    NoConfigFile,

    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid {format} format: {message}")]
    Parse { format: &'static str, message: String },

    #[error("Unsupported config format: {0}")]
    UnsupportedFormat(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings consumed by the request executor
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientConfig {
    /// API root, e.g. `https://api.example.com/v1`
    pub base_url: String,

    /// Per-attempt timeout
    #[serde(rename = "timeout_ms", with = "duration_millis")]
    pub timeout: Duration,

    /// Retries after the initial attempt for transient failures
    pub max_retries: u32,

    /// Backoff base: the first retry waits this long
    #[serde(rename = "retry_delay_ms", with = "duration_millis")]
    pub base_retry_delay: Duration,

    /// Verbose request logging
    pub debug: bool,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: String::new(),
            timeout: DEFAULT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            base_retry_delay: DEFAULT_BASE_DELAY,
            debug: false,
            user_agent: None,
        }
    }
}

impl ClientConfig {
    /// Defaults with the given base URL
    pub fn new(base_url: impl Into<String>) -> Self {
        Self { base_url: base_url.into(), ..Self::default() }
    }

    /// Retry settings derived from this config
    pub fn retry_config(&self) -> RetryConfig {
        RetryConfig::new(self.max_retries, self.base_retry_delay)
    }

    /// Check the values are usable
    ///
    /// # Errors
    /// Returns `ConfigError::Invalid` if the base URL is empty, not an
    /// absolute http(s) URL, or the timeout is zero.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::Invalid("base_url must not be empty".into()));
        }

        let parsed = url::Url::parse(&self.base_url)
            .map_err(|e| ConfigError::Invalid(format!("base_url is not a valid URL: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid(format!(
                "base_url must use http or https, got {}",
                parsed.scheme()
            )));
        }

        if self.timeout.is_zero() {
            return Err(ConfigError::Invalid("timeout must be greater than zero".into()));
        }

        Ok(())
    }
}
