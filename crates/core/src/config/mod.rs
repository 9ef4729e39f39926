//! Application configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (TUNECACHE_*)
//! 2. TOML config file (if TUNECACHE_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;
use std::time::Duration;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

mod validation;

pub use validation::ConfigError;

/// Desktop Chrome user agent sent on every outgoing request.
pub const BROWSER_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36";

/// Application configuration with layered loading.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (TUNECACHE_*)
/// 2. TOML config file (if TUNECACHE_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Address the HTTP service binds to.
    ///
    /// Set via TUNECACHE_LISTEN_ADDR environment variable.
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,

    /// Path to SQLite cache database.
    ///
    /// Set via TUNECACHE_DB_PATH environment variable.
    #[serde(default = "default_db_path")]
    pub db_path: PathBuf,

    /// Origin of the player UI; relative requests are resolved against it.
    ///
    /// Set via TUNECACHE_UPSTREAM_ORIGIN environment variable.
    #[serde(default = "default_upstream_origin")]
    pub upstream_origin: String,

    /// Prefix shared by every partition name.
    #[serde(default = "default_cache_prefix")]
    pub cache_prefix: String,

    /// Cache version; partitions of any other version are deleted on activation.
    ///
    /// Set via TUNECACHE_CACHE_VERSION environment variable.
    #[serde(default = "default_cache_version")]
    pub cache_version: String,

    /// Bootstrap resources stored in the primary partition at install time.
    #[serde(default = "default_precache")]
    pub precache: Vec<String>,

    /// Path of the app shell served to offline navigations.
    #[serde(default = "default_app_shell")]
    pub app_shell: String,

    /// User-Agent string for HTTP requests.
    ///
    /// Set via TUNECACHE_USER_AGENT environment variable.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// HTTP request timeout in milliseconds.
    ///
    /// Set via TUNECACHE_TIMEOUT_MS environment variable.
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,

    /// Maximum bytes to fetch per request.
    ///
    /// Set via TUNECACHE_MAX_BYTES environment variable.
    #[serde(default = "default_max_bytes")]
    pub max_bytes: usize,

    /// Base URL for YouTube page and oEmbed requests.
    #[serde(default = "default_youtube_base_url")]
    pub youtube_base_url: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:3001".into()
}

fn default_db_path() -> PathBuf {
    PathBuf::from("./tunecache.sqlite")
}

fn default_upstream_origin() -> String {
    "http://localhost:5173".into()
}

fn default_cache_prefix() -> String {
    "tunecache".into()
}

fn default_cache_version() -> String {
    "v1".into()
}

fn default_precache() -> Vec<String> {
    vec!["/".into(), "/index.html".into(), "/manifest.json".into()]
}

fn default_app_shell() -> String {
    "/index.html".into()
}

fn default_user_agent() -> String {
    BROWSER_USER_AGENT.into()
}

fn default_timeout_ms() -> u64 {
    10_000
}

fn default_max_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_youtube_base_url() -> String {
    "https://www.youtube.com".into()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            listen_addr: default_listen_addr(),
            db_path: default_db_path(),
            upstream_origin: default_upstream_origin(),
            cache_prefix: default_cache_prefix(),
            cache_version: default_cache_version(),
            precache: default_precache(),
            app_shell: default_app_shell(),
            user_agent: default_user_agent(),
            timeout_ms: default_timeout_ms(),
            max_bytes: default_max_bytes(),
            youtube_base_url: default_youtube_base_url(),
        }
    }
}

impl AppConfig {
    /// Timeout as Duration for use with reqwest/tokio.
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `TUNECACHE_`
    /// 2. TOML file from `TUNECACHE_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("TUNECACHE_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("TUNECACHE_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }

    /// The upstream origin parsed as a URL.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if the origin does not parse.
    pub fn upstream_url(&self) -> Result<url::Url, ConfigError> {
        url::Url::parse(&self.upstream_origin)
            .map_err(|e| ConfigError::Invalid { field: "upstream_origin".into(), reason: e.to_string() })
    }
}
