//! Configuration IO helpers.

use std::env;
use std::fs;
use std::fs::{create_dir_all, write};
use std::path::{Path, PathBuf};

use dirs_next::{config_dir, home_dir};

use crate::config::{ConfigError, ToolServerConfig, validate_config};

/// Environment variable overriding the configuration file location.
pub const CONFIG_PATH_ENV: &str = "TOOLSMITH_CONFIG_PATH";

/// Returns the default path for the configuration file.
pub fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV)
        && !path.trim().is_empty()
    {
        return expand_tilde(path.trim());
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("toolsmith").join("tools.json")
}

/// Loads and validates configuration from the default path.
pub fn load_config() -> Result<ToolServerConfig, ConfigError> {
    let path = default_config_path();
    load_config_from_path(&path)
}

/// Loads and validates configuration from a specific path.
///
/// A missing file yields the defaults.
pub fn load_config_from_path(path: &Path) -> Result<ToolServerConfig, ConfigError> {
    if !path.exists() {
        tracing::debug!(path = %path.display(), "no configuration file; using defaults");
        return Ok(ToolServerConfig::default());
    }

    let content = fs::read_to_string(path)?;
    let config: ToolServerConfig = serde_json::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Validates and saves configuration to a specific path.
pub fn save_config_to_path(config: &ToolServerConfig, path: &Path) -> Result<(), ConfigError> {
    validate_config(config)?;
    if let Some(parent_directory) = path.parent() {
        create_dir_all(parent_directory)?;
    }

    let content = serde_json::to_string_pretty(config)?;
    write(path, content)?;
    Ok(())
}

fn expand_tilde(path: &str) -> PathBuf {
    match path.strip_prefix("~/") {
        Some(rest) => home_dir().map(|home| home.join(rest)).unwrap_or_else(|| PathBuf::from(path)),
        None => PathBuf::from(path),
    }
}
