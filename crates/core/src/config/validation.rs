//! Configuration validation rules.
//!
//! This module provides validation logic for `AppConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::AppConfig;
use thiserror::Error;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

const MAX_TOTAL_LIMIT: usize = 1024 * 1024 * 1024;

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_file_size` is 0 or larger than `max_total_cache_size`
    /// - `max_total_cache_size` exceeds 1GB
    /// - `user_agent` is empty
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_file_size == 0 {
            return Err(ConfigError::Invalid { field: "max_file_size".into(), reason: "must be greater than 0".into() });
        }
        if self.max_total_cache_size > MAX_TOTAL_LIMIT {
            return Err(ConfigError::Invalid {
                field: "max_total_cache_size".into(),
                reason: "must not exceed 1GB".into(),
            });
        }
        if self.max_file_size > self.max_total_cache_size {
            return Err(ConfigError::Invalid {
                field: "max_file_size".into(),
                reason: "must not exceed max_total_cache_size".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        if self.max_redirects > 20 {
            tracing::warn!(max_redirects = self.max_redirects, "unusually high redirect limit");
        }

        Ok(())
    }
}
