//! Configuration loader
//!
//! Loads client configuration from environment variables or files.
//!
//! ## Loading Strategy
//! 1. First, attempts to load from environment variables
//! 2. If `STELLAR_BASE_URL` is unset or a value is malformed, falls back to
//!    loading from file
//! 3. Probes multiple paths for config files
//! 4. Supports JSON and TOML formats
//!
//! ## Environment Variables
//! - `STELLAR_BASE_URL`: API root (required for env loading)
//! - `STELLAR_TIMEOUT_MS`: Per-request timeout in milliseconds
//! - `STELLAR_MAX_RETRIES`: Retry budget for transient failures
//! - `STELLAR_RETRY_DELAY_MS`: Backoff base in milliseconds
//! - `STELLAR_DEBUG`: Verbose logging (true/false)
//! - `STELLAR_USER_AGENT`: Optional User-Agent override
//! - `STELLAR_CLIENT_ID`, `STELLAR_CLIENT_SECRET`, `STELLAR_REDIRECT_URI`,
//!   `STELLAR_ACCESS_TYPE`: OAuth application identity (see
//!   [`oauth_identity_from_env`])
//!
//! ## File Locations
//! The loader probes the following paths (in order):
//! 1. `./stellar.json` or `./stellar.toml` (current working directory)
//! 2. `./config.json` or `./config.toml` (current working directory)
//! 3. The same names next to the executable

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;

use stellar_common::auth::{AccessType, OAuthClientIdentity};

use super::{ClientConfig, ConfigError};

/// Load configuration with automatic fallback strategy
///
/// The result is validated before it is returned.
///
/// # Errors
/// Returns `ConfigError` if no source yields a valid configuration.
pub fn load() -> Result<ClientConfig, ConfigError> {
    let config = match load_from_env() {
        Ok(config) => {
            tracing::info!("Configuration loaded from environment variables");
            config
        }
        Err(e) => {
            tracing::debug!(error = %e, "Failed to load from environment, trying file");
            load_from_file(None)?
        }
    };

    config.validate()?;
    Ok(config)
}

/// Load configuration from environment variables
///
/// Only `STELLAR_BASE_URL` is required; everything else falls back to the
/// [`ClientConfig`] defaults.
///
/// # Errors
/// Returns `ConfigError` if the base URL is missing or a numeric variable
/// does not parse.
pub fn load_from_env() -> Result<ClientConfig, ConfigError> {
    let defaults = ClientConfig::default();

    let base_url = env_var("STELLAR_BASE_URL")?;
    let timeout = env_parse::<u64>("STELLAR_TIMEOUT_MS")?
        .map(Duration::from_millis)
        .unwrap_or(defaults.timeout);
    let max_retries = env_parse::<u32>("STELLAR_MAX_RETRIES")?.unwrap_or(defaults.max_retries);
    let base_retry_delay = env_parse::<u64>("STELLAR_RETRY_DELAY_MS")?
        .map(Duration::from_millis)
        .unwrap_or(defaults.base_retry_delay);
    let debug = env_bool("STELLAR_DEBUG", defaults.debug);
    let user_agent = env_opt("STELLAR_USER_AGENT");

    Ok(ClientConfig { base_url, timeout, max_retries, base_retry_delay, debug, user_agent })
}

/// OAuth application identity from the environment
///
/// Returns `None` unless both `STELLAR_CLIENT_ID` and
/// `STELLAR_CLIENT_SECRET` are set. `STELLAR_ACCESS_TYPE` accepts `online`
/// or `offline` (default).
pub fn oauth_identity_from_env() -> Option<OAuthClientIdentity> {
    let client_id = env_opt("STELLAR_CLIENT_ID")?;
    let client_secret = env_opt("STELLAR_CLIENT_SECRET")?;

    let mut identity = OAuthClientIdentity::new(client_id, client_secret);
    if let Some(redirect_uri) = env_opt("STELLAR_REDIRECT_URI") {
        identity = identity.with_redirect_uri(redirect_uri);
    }
    if env_opt("STELLAR_ACCESS_TYPE").is_some_and(|v| v.eq_ignore_ascii_case("online")) {
        identity = identity.with_access_type(AccessType::Online);
    }

    Some(identity)
}

/// Load configuration from a file
///
/// If `path` is `None`, probes multiple locations for config files.
/// Supports both JSON and TOML formats (detected by file extension).
///
/// # Arguments
/// * `path` - Optional path to config file. If `None`, uses
///   [`probe_config_paths`].
///
/// # Errors
/// Returns `ConfigError` if:
/// - File not found (when path is specified)
/// - No config file found (when path is `None`)
/// - File format is invalid
pub fn load_from_file(path: Option<PathBuf>) -> Result<ClientConfig, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::FileNotFound(p));
            }
            p
        }
        None => probe_config_paths().ok_or(ConfigError::NoConfigFile)?,
    };

    tracing::info!(path = %config_path.display(), "Loading configuration from file");

    let contents = std::fs::read_to_string(&config_path)?;
    parse_config(&contents, &config_path)
}

/// Parse configuration from string content
///
/// Format is detected by file extension (`.json` or `.toml`).
fn parse_config(contents: &str, path: &Path) -> Result<ClientConfig, ConfigError> {
    let extension = path.extension().and_then(|e| e.to_str()).unwrap_or("json");

    match extension {
        "toml" => toml::from_str(contents)
            .map_err(|e| ConfigError::Parse { format: "TOML", message: e.to_string() }),
        "json" => serde_json::from_str(contents)
            .map_err(|e| ConfigError::Parse { format: "JSON", message: e.to_string() }),
        other => Err(ConfigError::UnsupportedFormat(other.to_string())),
    }
}

/// Probe multiple paths for configuration files
///
/// # Returns
/// The first config file found, or `None` if no file exists.
pub fn probe_config_paths() -> Option<PathBuf> {
    const NAMES: [&str; 4] = ["stellar.json", "stellar.toml", "config.json", "config.toml"];
    let mut candidates = Vec::new();

    if let Ok(cwd) = std::env::current_dir() {
        candidates.extend(NAMES.iter().map(|name| cwd.join(name)));
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            candidates.extend(NAMES.iter().map(|name| exe_dir.join(name)));
        }
    }

    candidates.into_iter().find(|path| path.exists())
}

/// Get required environment variable
fn env_var(key: &str) -> Result<String, ConfigError> {
    env_opt(key).ok_or_else(|| ConfigError::MissingVar(key.to_string()))
}

/// Non-empty environment variable, if set
fn env_opt(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|value| !value.trim().is_empty())
}

/// Parse an optional environment variable
fn env_parse<T>(key: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_opt(key)
        .map(|raw| {
            raw.trim().parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key: key.to_string(),
                message: e.to_string(),
            })
        })
        .transpose()
}

/// Parse boolean from environment variable
///
/// Accepts: `1`/`0`, `true`/`false`, `yes`/`no`, `on`/`off` (case-insensitive)
fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|s| matches!(s.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on"))
        .unwrap_or(default)
}
