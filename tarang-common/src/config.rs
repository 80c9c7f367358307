//! Configuration loading for tarang front-ends
//!
//! Settings sources priority:
//! 1. Command-line arguments (highest priority)
//! 2. Environment variables (`TARANG_API_URL`, `TARANG_USER_ID`, `TARANG_CONFIG`)
//! 3. TOML configuration file
//! 4. Built-in defaults (lowest priority)
//!
//! A missing TOML file is not an error: a warning is logged and defaults apply.
//! A TOML file that exists but does not parse is a configuration error.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Default remote service base URL
pub const DEFAULT_API_URL: &str = "http://127.0.0.1:5000";

/// Environment variable overriding the service base URL
pub const ENV_API_URL: &str = "TARANG_API_URL";

/// Environment variable overriding the signed-in user id
pub const ENV_USER_ID: &str = "TARANG_USER_ID";

/// Environment variable pointing at an explicit TOML file
pub const ENV_CONFIG: &str = "TARANG_CONFIG";

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const DEFAULT_VOLUME: f64 = 0.8;

/// Configuration file contents; every field is optional
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TomlConfig {
    /// Remote service base URL
    #[serde(default)]
    pub api_url: Option<String>,

    /// Identity-provider user id used to scope uploads and listings
    #[serde(default)]
    pub user_id: Option<String>,

    #[serde(default)]
    pub email: Option<String>,

    #[serde(default)]
    pub full_name: Option<String>,

    /// HTTP request timeout in seconds
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,

    /// Initial playback volume (0.0 - 1.0)
    #[serde(default)]
    pub default_volume: Option<f64>,

    /// Logging configuration (optional)
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Command-line configuration overrides
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub api_url: Option<String>,
    pub user_id: Option<String>,
    pub config_path: Option<PathBuf>,
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Base URL without trailing slash
    pub api_url: String,
    pub user_id: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<String>,
    pub request_timeout: Duration,
    pub default_volume: f64,
    pub logging: LoggingConfig,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            user_id: None,
            email: None,
            full_name: None,
            request_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            default_volume: DEFAULT_VOLUME,
            logging: LoggingConfig::default(),
        }
    }
}

impl ClientConfig {
    /// Resolve configuration from CLI overrides, environment, TOML and defaults
    pub fn resolve(overrides: ConfigOverrides) -> Result<Self> {
        let config_path = overrides
            .config_path
            .clone()
            .or_else(|| std::env::var(ENV_CONFIG).ok().map(PathBuf::from))
            .or_else(default_config_path);

        let toml_config = match config_path {
            Some(path) => load_toml_config(&path)?.unwrap_or_default(),
            None => {
                warn!("No configuration file found, using built-in defaults");
                TomlConfig::default()
            }
        };

        Self::from_sources(overrides, toml_config)
    }

    /// Merge an already-loaded TOML config with overrides and environment
    pub fn from_sources(overrides: ConfigOverrides, toml_config: TomlConfig) -> Result<Self> {
        let api_url = overrides
            .api_url
            .or_else(|| non_empty_env(ENV_API_URL))
            .or(toml_config.api_url)
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_url = normalize_base_url(&api_url)?;

        let user_id = overrides
            .user_id
            .or_else(|| non_empty_env(ENV_USER_ID))
            .or(toml_config.user_id)
            .filter(|id| !id.trim().is_empty());

        let timeout_secs = toml_config
            .request_timeout_secs
            .unwrap_or(DEFAULT_TIMEOUT_SECS);
        if timeout_secs == 0 {
            return Err(Error::Config(
                "request_timeout_secs must be greater than zero".to_string(),
            ));
        }

        let default_volume = toml_config.default_volume.unwrap_or(DEFAULT_VOLUME);
        if !default_volume.is_finite() {
            return Err(Error::Config(format!(
                "default_volume must be a number in [0, 1], got {}",
                default_volume
            )));
        }

        let config = Self {
            api_url,
            user_id,
            email: toml_config.email,
            full_name: toml_config.full_name,
            request_timeout: Duration::from_secs(timeout_secs),
            default_volume: default_volume.clamp(0.0, 1.0),
            logging: toml_config.logging,
        };

        info!(api_url = %config.api_url, user = ?config.user_id, "Configuration resolved");
        Ok(config)
    }
}

/// Load a TOML config file
///
/// Returns `Ok(None)` if the file does not exist.
pub fn load_toml_config(path: &Path) -> Result<Option<TomlConfig>> {
    if !path.exists() {
        warn!("Config file not found: {}, using defaults", path.display());
        return Ok(None);
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;

    debug!("Loaded TOML configuration from {}", path.display());
    Ok(Some(config))
}

/// Write a TOML config file, creating parent directories as needed
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("Serialize TOML failed: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Apply `update` to the TOML file at `path` and write it back
///
/// A missing file starts from defaults. Returns the written configuration.
pub fn update_toml_config<F>(path: &Path, update: F) -> Result<TomlConfig>
where
    F: FnOnce(&mut TomlConfig),
{
    let mut config = load_toml_config(path)?.unwrap_or_default();
    update(&mut config);
    write_toml_config(&config, path)?;
    info!("Settings saved to {}", path.display());
    Ok(config)
}

/// Per-user config file location, whether or not it exists yet
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("tarang").join("config.toml"))
}

/// Platform config file location, if one exists
///
/// Linux checks `~/.config/tarang/config.toml` then `/etc/tarang/config.toml`.
pub fn default_config_path() -> Option<PathBuf> {
    if let Some(path) = user_config_path() {
        if path.exists() {
            return Some(path);
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/tarang/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

fn normalize_base_url(url: &str) -> Result<String> {
    let trimmed = url.trim().trim_end_matches('/');
    if !(trimmed.starts_with("http://") || trimmed.starts_with("https://")) {
        return Err(Error::Config(format!(
            "api_url must start with http:// or https://, got '{}'",
            url
        )));
    }
    Ok(trimmed.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_log_level() {
        assert_eq!(default_log_level(), "info");
        assert_eq!(LoggingConfig::default().level, "info");
    }

    #[test]
    fn test_normalize_base_url() {
        assert_eq!(
            normalize_base_url("http://localhost:5000/").unwrap(),
            "http://localhost:5000"
        );
        assert!(normalize_base_url("localhost:5000").is_err());
    }

    #[test]
    fn test_client_config_default() {
        let config = ClientConfig::default();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.default_volume, 0.8);
        assert_eq!(config.request_timeout, Duration::from_secs(30));
    }
}
