//! Configuration loading and config file resolution
//!
//! Settings resolve with the priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. TOML config file
//! 4. Compiled default (fallback)

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Settings read from the songbridge TOML config file.
///
/// Every field is optional; callers layer CLI flags and environment
/// variables on top before applying compiled defaults.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Bearer token for the source catalog (Spotify Web API)
    pub spotify_token: Option<String>,
    /// Bearer token for the destination platform API (YouTube Data API)
    pub youtube_token: Option<String>,
    /// WebDriver endpoint for the interactive populate path
    pub webdriver_url: Option<String>,
    /// Serialized cookie blob consumed by the interactive path
    pub cookie_file: Option<PathBuf>,
    /// Directory for diagnostic snapshots
    pub snapshot_dir: Option<PathBuf>,
    /// Resolver worker pool width
    pub resolver_concurrency: Option<usize>,
    /// Remote call retry bound
    pub retry_max_attempts: Option<u32>,
    /// Initial retry backoff delay, doubled per attempt
    pub retry_initial_delay_ms: Option<u64>,
    /// Element readiness timeout for the interactive path, in seconds
    pub element_wait_secs: Option<u64>,
}

/// Locate the platform config file, if one exists.
///
/// Linux checks `~/.config/songbridge/config.toml` then
/// `/etc/songbridge/config.toml`; macOS and Windows use the user config
/// directory only.
pub fn find_config_file() -> Option<PathBuf> {
    let user_config = dirs::config_dir().map(|d| d.join("songbridge").join("config.toml"));

    if let Some(path) = &user_config {
        if path.exists() {
            return user_config;
        }
    }

    if cfg!(target_os = "linux") {
        let system_config = PathBuf::from("/etc/songbridge/config.toml");
        if system_config.exists() {
            return Some(system_config);
        }
    }

    None
}

/// Load a TOML config from an explicit path.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("cannot read {}: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("cannot parse {}: {}", path.display(), e)))
}

/// Load the platform config file, falling back to defaults when absent.
pub fn load_default_config() -> Result<TomlConfig> {
    match find_config_file() {
        Some(path) => {
            tracing::debug!(path = %path.display(), "Loading config file");
            load_toml_config(&path)
        }
        None => Ok(TomlConfig::default()),
    }
}

/// Write a TOML config file, creating parent directories as needed.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let content = toml::to_string_pretty(config)
        .map_err(|e| Error::Config(format!("cannot serialize config: {}", e)))?;
    std::fs::write(path, content)?;
    Ok(())
}

/// Resolve one string setting with CLI > env > TOML priority.
pub fn resolve_setting(
    cli_arg: Option<&str>,
    env_var_name: &str,
    toml_value: Option<&str>,
) -> Option<String> {
    if let Some(value) = cli_arg {
        return Some(value.to_string());
    }
    if let Ok(value) = std::env::var(env_var_name) {
        if !value.is_empty() {
            return Some(value);
        }
    }
    toml_value.map(|v| v.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_toml_round_trip() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("config.toml");

        let config = TomlConfig {
            youtube_token: Some("yt-token".to_string()),
            resolver_concurrency: Some(8),
            retry_max_attempts: Some(5),
            ..TomlConfig::default()
        };

        write_toml_config(&config, &path).unwrap();
        let loaded = load_toml_config(&path).unwrap();

        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file_is_error() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("nope.toml");
        assert!(load_toml_config(&path).is_err());
    }

    #[test]
    fn test_resolve_setting_priority() {
        // CLI wins over TOML
        assert_eq!(
            resolve_setting(Some("from-cli"), "SONGBRIDGE_TEST_UNSET", Some("from-toml")),
            Some("from-cli".to_string())
        );
        // TOML used when CLI and env absent
        assert_eq!(
            resolve_setting(None, "SONGBRIDGE_TEST_UNSET", Some("from-toml")),
            Some("from-toml".to_string())
        );
        assert_eq!(resolve_setting(None, "SONGBRIDGE_TEST_UNSET", None), None);
    }
}
