//! Application configuration
//!
//! Configuration loaded from .library-lander.toml file.

use crate::preferences::Theme;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Language used for user-facing error messages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Locale {
    #[default]
    It,
    En,
}

/// Application configuration loaded from .library-lander.toml
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct AppConfig {
    /// Base URL of the library backend, without trailing slash
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Maximum age of cached GET responses, in seconds
    #[serde(default = "default_cache_time_secs")]
    pub cache_time_secs: u64,

    /// Delays between retry attempts, in milliseconds.
    /// The number of retries equals the number of entries.
    #[serde(default = "default_retry_delays_ms")]
    pub retry_delays_ms: Vec<u64>,

    /// Timeout for a single HTTP attempt, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Theme used when the user never picked one
    #[serde(default)]
    pub system_theme: Theme,

    /// Initial value of the online flag
    #[serde(default = "default_start_online")]
    pub start_online: bool,

    /// Language for user-facing messages
    #[serde(default)]
    pub locale: Locale,
}

fn default_base_url() -> String {
    "http://localhost:8080/api".to_string()
}

fn default_cache_time_secs() -> u64 {
    5 * 60
}

fn default_retry_delays_ms() -> Vec<u64> {
    vec![1000, 2000, 4000]
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_start_online() -> bool {
    true
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            cache_time_secs: default_cache_time_secs(),
            retry_delays_ms: default_retry_delays_ms(),
            request_timeout_secs: default_request_timeout_secs(),
            system_theme: Theme::default(),
            start_online: default_start_online(),
            locale: Locale::default(),
        }
    }
}

impl AppConfig {
    /// Load the first config file found, or use defaults
    pub fn load() -> Self {
        if let Some(file) = crate::load_config_file() {
            match Self::parse(&file.content) {
                Ok(config) => {
                    log::info!("Loaded app config from {}", file.path.display());
                    return config;
                }
                Err(e) => {
                    log::warn!("Failed to parse {}: {}", file.path.display(), e);
                }
            }
        }

        log::debug!("Using default app config");
        Self::default()
    }

    /// Parse a TOML document, filling missing keys with defaults
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(content)
    }

    pub fn cache_time(&self) -> Duration {
        Duration::from_secs(self.cache_time_secs)
    }

    pub fn retry_delays(&self) -> Vec<Duration> {
        self.retry_delays_ms
            .iter()
            .copied()
            .map(Duration::from_millis)
            .collect()
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_default_config() {
        let config = AppConfig::default();
        assert_eq!(config.base_url, "http://localhost:8080/api");
        assert_eq!(config.cache_time(), Duration::from_secs(300));
        assert_eq!(
            config.retry_delays(),
            vec![
                Duration::from_millis(1000),
                Duration::from_millis(2000),
                Duration::from_millis(4000)
            ]
        );
        assert_eq!(config.system_theme, Theme::Light);
        assert!(config.start_online);
        assert_eq!(config.locale, Locale::It);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let config = AppConfig::parse(
            r#"
            base_url = "https://library.example.com/api"
            retry_delays_ms = [10, 20]
            locale = "en"
            "#,
        )
        .unwrap();

        assert_eq!(config.base_url, "https://library.example.com/api");
        assert_eq!(config.retry_delays_ms, vec![10, 20]);
        assert_eq!(config.locale, Locale::En);
        assert_eq!(config.cache_time_secs, 300);
        assert_eq!(config.request_timeout_secs, 30);
    }

    #[test]
    fn test_system_theme_dark() {
        let config = AppConfig::parse(r#"system_theme = "dark""#).unwrap();
        assert_eq!(config.system_theme, Theme::Dark);
    }

    #[test]
    fn test_invalid_config_is_error() {
        assert!(AppConfig::parse("cache_time_secs = \"soon\"").is_err());
    }
}
