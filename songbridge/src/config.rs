//! Application configuration assembly
//!
//! Settings come from the platform TOML config file with environment
//! variables layered on top (CLI flags, where they exist, win inside the
//! subcommand handlers). Compiled defaults fill the rest.

use crate::populate::webdriver::DEFAULT_ELEMENT_WAIT;
use crate::resolver::DEFAULT_CONCURRENCY;
use crate::retry::RetryPolicy;
use songbridge_common::config::{load_default_config, load_toml_config, resolve_setting, TomlConfig};
use songbridge_common::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const DEFAULT_WEBDRIVER_URL: &str = "http://localhost:9515";
pub const DEFAULT_COOKIE_FILE: &str = "cookies.json";

/// Resolved application settings
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub spotify_token: Option<String>,
    pub youtube_token: Option<String>,
    pub webdriver_url: String,
    pub cookie_file: PathBuf,
    pub snapshot_dir: PathBuf,
    pub concurrency: usize,
    pub retry: RetryPolicy,
    pub element_wait: Duration,
}

impl AppConfig {
    /// Load settings, from an explicit config file when given, otherwise
    /// from the platform config location (absent file means defaults).
    pub fn load(config_path: Option<&Path>) -> Result<Self> {
        let toml = match config_path {
            Some(path) => load_toml_config(path)?,
            None => load_default_config()?,
        };
        Ok(Self::from_toml(toml))
    }

    fn from_toml(toml: TomlConfig) -> Self {
        let retry_default = RetryPolicy::default();

        Self {
            spotify_token: resolve_setting(None, "SPOTIFY_TOKEN", toml.spotify_token.as_deref()),
            youtube_token: resolve_setting(None, "YOUTUBE_TOKEN", toml.youtube_token.as_deref()),
            webdriver_url: resolve_setting(
                None,
                "SONGBRIDGE_WEBDRIVER_URL",
                toml.webdriver_url.as_deref(),
            )
            .unwrap_or_else(|| DEFAULT_WEBDRIVER_URL.to_string()),
            cookie_file: resolve_setting(
                None,
                "SONGBRIDGE_COOKIE_FILE",
                toml.cookie_file.as_deref().and_then(Path::to_str),
            )
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_COOKIE_FILE)),
            snapshot_dir: toml
                .snapshot_dir
                .unwrap_or_else(|| PathBuf::from(".")),
            concurrency: toml.resolver_concurrency.unwrap_or(DEFAULT_CONCURRENCY),
            retry: RetryPolicy {
                max_attempts: toml.retry_max_attempts.unwrap_or(retry_default.max_attempts),
                initial_delay: toml
                    .retry_initial_delay_ms
                    .map(Duration::from_millis)
                    .unwrap_or(retry_default.initial_delay),
            },
            element_wait: toml
                .element_wait_secs
                .map(Duration::from_secs)
                .unwrap_or(DEFAULT_ELEMENT_WAIT),
        }
    }

    pub fn require_spotify_token(&self) -> Result<&str> {
        self.spotify_token.as_deref().ok_or_else(|| {
            Error::Config(
                "no Spotify token: set SPOTIFY_TOKEN or spotify_token in config.toml".to_string(),
            )
        })
    }

    pub fn require_youtube_token(&self) -> Result<&str> {
        self.youtube_token.as_deref().ok_or_else(|| {
            Error::Config(
                "no YouTube token: set YOUTUBE_TOKEN or youtube_token in config.toml".to_string(),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_toml() {
        let config = AppConfig::from_toml(TomlConfig::default());

        assert_eq!(config.webdriver_url, DEFAULT_WEBDRIVER_URL);
        assert_eq!(config.cookie_file, PathBuf::from(DEFAULT_COOKIE_FILE));
        assert_eq!(config.concurrency, DEFAULT_CONCURRENCY);
        assert_eq!(config.retry.max_attempts, 3);
        assert!(config.require_youtube_token().is_err());
    }

    #[test]
    fn test_toml_values_applied() {
        let toml = TomlConfig {
            youtube_token: Some("tok".to_string()),
            resolver_concurrency: Some(8),
            retry_max_attempts: Some(5),
            retry_initial_delay_ms: Some(250),
            element_wait_secs: Some(20),
            ..TomlConfig::default()
        };

        let config = AppConfig::from_toml(toml);

        assert_eq!(config.require_youtube_token().unwrap(), "tok");
        assert_eq!(config.concurrency, 8);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_delay, Duration::from_millis(250));
        assert_eq!(config.element_wait, Duration::from_secs(20));
    }
}
