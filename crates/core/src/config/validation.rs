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

    #[error("missing required configuration: {field} ({hint})")]
    Missing { field: String, hint: String },
}

impl AppConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `max_bytes` is 0 or exceeds 100MB
    /// - `timeout_ms` is less than 100ms or exceeds 5 minutes
    /// - `user_agent` is empty
    /// - `cache_prefix` or `cache_version` is empty or contains `-`
    /// - `upstream_origin` is not an http(s) URL
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_bytes == 0 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must be greater than 0".into() });
        }
        if self.max_bytes > 100 * 1024 * 1024 {
            return Err(ConfigError::Invalid { field: "max_bytes".into(), reason: "must not exceed 100MB".into() });
        }

        if self.timeout_ms < 100 {
            return Err(ConfigError::Invalid { field: "timeout_ms".into(), reason: "must be at least 100ms".into() });
        }
        if self.timeout_ms > 300_000 {
            return Err(ConfigError::Invalid {
                field: "timeout_ms".into(),
                reason: "must not exceed 5 minutes (300000ms)".into(),
            });
        }

        if self.user_agent.is_empty() {
            return Err(ConfigError::Invalid { field: "user_agent".into(), reason: "must not be empty".into() });
        }

        for (field, value) in [("cache_prefix", &self.cache_prefix), ("cache_version", &self.cache_version)] {
            if value.is_empty() {
                return Err(ConfigError::Invalid { field: field.into(), reason: "must not be empty".into() });
            }
            if value.contains('-') {
                return Err(ConfigError::Invalid {
                    field: field.into(),
                    reason: "must not contain '-' (used as the partition name separator)".into(),
                });
            }
        }

        let upstream = self.upstream_url()?;
        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(ConfigError::Invalid {
                field: "upstream_origin".into(),
                reason: format!("unsupported scheme: {}", upstream.scheme()),
            });
        }

        if self.precache.is_empty() {
            return Err(ConfigError::Missing {
                field: "precache".into(),
                hint: "list at least the app shell, e.g. [\"/index.html\"]".into(),
            });
        }

        if !self.precache.contains(&self.app_shell) {
            tracing::warn!(
                app_shell = %self.app_shell,
                "app_shell is not in the precache list; offline navigations will only \
                 be served once it has been fetched"
            );
        }

        Ok(())
    }
}
