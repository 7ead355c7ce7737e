//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (WEBSTASH_*)
//! 2. TOML config file (if WEBSTASH_CONFIG_FILE set)
//! 3. Built-in defaults

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::cache::StoreLimits;

mod validation;

pub use validation::ConfigError;

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (WEBSTASH_*)
/// 2. TOML config file (if WEBSTASH_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Per-entry cap on stored bytes.
    ///
    /// Set via WEBSTASH_MAX_FILE_SIZE environment variable.
    #[serde(default = "default_max_file_size")]
    pub max_file_size: usize,

    /// Global cap on stored bytes per cache.
    ///
    /// Set via WEBSTASH_MAX_TOTAL_CACHE_SIZE environment variable.
    #[serde(default = "default_max_total_cache_size")]
    pub max_total_cache_size: usize,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via WEBSTASH_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Maximum redirects followed by the HTTP client.
    ///
    /// Set via WEBSTASH_MAX_REDIRECTS environment variable.
    #[serde(default = "default_max_redirects")]
    pub max_redirects: usize,
}

fn default_max_file_size() -> usize {
    4 * 1024 * 1024
}

fn default_max_total_cache_size() -> usize {
    100 * 1024 * 1024
}

fn default_user_agent() -> String {
    "webstash/0.1".into()
}

fn default_max_redirects() -> usize {
    5
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            max_file_size: default_max_file_size(),
            max_total_cache_size: default_max_total_cache_size(),
            user_agent: default_user_agent(),
            max_redirects: default_max_redirects(),
        }
    }
}

impl AppConfig {
    /// Load configuration from all sources with layered precedence.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("WEBSTASH_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("WEBSTASH_")
                .ignore(&["config_file"])
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// Limits for the search record store.
    pub fn search_limits(&self) -> StoreLimits {
        StoreLimits::search(self.max_file_size, self.max_total_cache_size)
    }

    /// Limits for the fetch record store.
    pub fn fetch_limits(&self) -> StoreLimits {
        StoreLimits::fetch(self.max_file_size, self.max_total_cache_size)
    }
}
