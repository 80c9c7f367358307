//! Configuration resolution tests
//!
//! Priority order: CLI override > environment > TOML file > built-in default.
//!
//! Note: Uses serial_test crate to prevent ENV variable race conditions.
//! Tests that manipulate TARANG_* variables are marked with #[serial].

use serial_test::serial;
use std::env;
use std::time::Duration;
use tarang_common::config::{
    load_toml_config, update_toml_config, write_toml_config, ClientConfig, ConfigOverrides,
    TomlConfig, DEFAULT_API_URL, ENV_API_URL, ENV_CONFIG, ENV_USER_ID,
};
use tempfile::TempDir;

fn clear_env() {
    env::remove_var(ENV_API_URL);
    env::remove_var(ENV_USER_ID);
    env::remove_var(ENV_CONFIG);
}

#[test]
#[serial]
fn test_defaults_when_nothing_configured() {
    clear_env();

    let config = ClientConfig::from_sources(ConfigOverrides::default(), TomlConfig::default())
        .unwrap();

    assert_eq!(config.api_url, DEFAULT_API_URL);
    assert!(config.user_id.is_none());
    assert_eq!(config.default_volume, 0.8);
    assert_eq!(config.request_timeout, Duration::from_secs(30));
    assert_eq!(config.logging.level, "info");
}

#[test]
#[serial]
fn test_toml_values_used() {
    clear_env();

    let toml_config: TomlConfig = toml::from_str(
        r#"
        api_url = "http://music.local:8000/"
        user_id = "user_123"
        default_volume = 0.5
        request_timeout_secs = 10

        [logging]
        level = "debug"
        "#,
    )
    .unwrap();

    let config = ClientConfig::from_sources(ConfigOverrides::default(), toml_config).unwrap();

    assert_eq!(config.api_url, "http://music.local:8000");
    assert_eq!(config.user_id.as_deref(), Some("user_123"));
    assert_eq!(config.default_volume, 0.5);
    assert_eq!(config.request_timeout, Duration::from_secs(10));
    assert_eq!(config.logging.level, "debug");
}

#[test]
#[serial]
fn test_env_overrides_toml() {
    clear_env();
    env::set_var(ENV_API_URL, "http://env.local:9000");
    env::set_var(ENV_USER_ID, "env_user");

    let toml_config = TomlConfig {
        api_url: Some("http://toml.local:8000".to_string()),
        user_id: Some("toml_user".to_string()),
        ..Default::default()
    };

    let config = ClientConfig::from_sources(ConfigOverrides::default(), toml_config).unwrap();
    clear_env();

    assert_eq!(config.api_url, "http://env.local:9000");
    assert_eq!(config.user_id.as_deref(), Some("env_user"));
}

#[test]
#[serial]
fn test_cli_overrides_env() {
    clear_env();
    env::set_var(ENV_API_URL, "http://env.local:9000");

    let overrides = ConfigOverrides {
        api_url: Some("http://cli.local:7000".to_string()),
        user_id: Some("cli_user".to_string()),
        config_path: None,
    };

    let config = ClientConfig::from_sources(overrides, TomlConfig::default()).unwrap();
    clear_env();

    assert_eq!(config.api_url, "http://cli.local:7000");
    assert_eq!(config.user_id.as_deref(), Some("cli_user"));
}

#[test]
#[serial]
fn test_invalid_values_rejected() {
    clear_env();

    let zero_timeout = TomlConfig {
        request_timeout_secs: Some(0),
        ..Default::default()
    };
    assert!(ClientConfig::from_sources(ConfigOverrides::default(), zero_timeout).is_err());

    let bad_url = ConfigOverrides {
        api_url: Some("ftp://nope".to_string()),
        ..Default::default()
    };
    assert!(ClientConfig::from_sources(bad_url, TomlConfig::default()).is_err());
}

#[test]
#[serial]
fn test_volume_is_clamped() {
    clear_env();

    let loud = TomlConfig {
        default_volume: Some(1.7),
        ..Default::default()
    };
    let config = ClientConfig::from_sources(ConfigOverrides::default(), loud).unwrap();
    assert_eq!(config.default_volume, 1.0);
}

#[test]
fn test_missing_toml_file_is_not_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("absent.toml");

    assert!(load_toml_config(&path).unwrap().is_none());
}

#[test]
fn test_malformed_toml_file_is_an_error() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("broken.toml");
    std::fs::write(&path, "api_url = [unterminated").unwrap();

    assert!(load_toml_config(&path).is_err());
}

#[test]
fn test_write_then_load_toml() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("nested").join("config.toml");

    let config = TomlConfig {
        api_url: Some("http://music.local:8000".to_string()),
        user_id: Some("user_123".to_string()),
        ..Default::default()
    };
    write_toml_config(&config, &path).unwrap();

    let loaded = load_toml_config(&path).unwrap().unwrap();
    assert_eq!(loaded.api_url, config.api_url);
    assert_eq!(loaded.user_id, config.user_id);
    assert_eq!(loaded.logging.level, "info");
}

#[test]
fn test_update_keeps_other_settings() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    write_toml_config(
        &TomlConfig {
            api_url: Some("http://music.local:8000".to_string()),
            default_volume: Some(0.4),
            ..Default::default()
        },
        &path,
    )
    .unwrap();

    let written = update_toml_config(&path, |config| {
        config.user_id = Some("user_456".to_string());
    })
    .unwrap();
    assert_eq!(written.user_id.as_deref(), Some("user_456"));

    let loaded = load_toml_config(&path).unwrap().unwrap();
    assert_eq!(loaded.api_url.as_deref(), Some("http://music.local:8000"));
    assert_eq!(loaded.default_volume, Some(0.4));
    assert_eq!(loaded.user_id.as_deref(), Some("user_456"));
}

#[test]
fn test_update_creates_missing_file() {
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("tarang").join("config.toml");

    update_toml_config(&path, |config| {
        config.full_name = Some("Asha".to_string());
    })
    .unwrap();

    let loaded = load_toml_config(&path).unwrap().unwrap();
    assert_eq!(loaded.full_name.as_deref(), Some("Asha"));
    assert!(loaded.api_url.is_none());
}

#[test]
#[serial]
fn test_resolve_reads_explicit_config_path() {
    clear_env();
    let temp_dir = TempDir::new().unwrap();
    let path = temp_dir.path().join("config.toml");
    std::fs::write(&path, "user_id = \"file_user\"\n").unwrap();

    let config = ClientConfig::resolve(ConfigOverrides {
        config_path: Some(path),
        ..Default::default()
    })
    .unwrap();

    assert_eq!(config.user_id.as_deref(), Some("file_user"));
}
