//! Application configuration
//!
//! This module provides centralized configuration management using the `config` crate.
//! Configuration can be loaded from environment variables and config files.

use config::{Config, ConfigError, Environment, File};
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Deserialize;
use std::env;

/// Main application configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub api: PlatformApiConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub auth: AuthConfig,
    #[serde(default)]
    pub margin: MarginConfig,
}

/// HTTP server configuration
#[derive(Debug, Deserialize, Clone)]
pub struct ServerConfig {
    /// Server host address
    #[serde(default = "default_host")]
    pub host: String,

    /// Server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Number of worker threads
    #[serde(default = "default_workers")]
    pub workers: usize,

    /// Comma separated list of allowed CORS origins
    #[serde(default = "default_cors_origins")]
    pub cors_origins: String,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    9002
}

fn default_workers() -> usize {
    num_cpus::get()
}

fn default_cors_origins() -> String {
    "http://localhost:3000,http://127.0.0.1:3000".to_string()
}

/// External platform API configuration
#[derive(Debug, Deserialize, Clone)]
pub struct PlatformApiConfig {
    /// Base URL of the platform REST API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Request timeout in seconds (0 keeps the HTTP client default)
    #[serde(default = "default_api_timeout")]
    pub timeout_secs: u64,

    /// How many times an idempotent read is retried on transient failure
    #[serde(default = "default_read_retries")]
    pub read_retries: u32,
}

fn default_base_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_api_timeout() -> u64 {
    30
}

fn default_read_retries() -> u32 {
    2
}

impl Default for PlatformApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_api_timeout(),
            read_retries: default_read_retries(),
        }
    }
}

/// Query cache configuration
#[derive(Debug, Deserialize, Clone)]
pub struct CacheConfig {
    /// TTL for cached reads in seconds
    #[serde(default = "default_cache_ttl")]
    pub ttl_secs: u64,

    /// Maximum number of cached queries
    #[serde(default = "default_cache_capacity")]
    pub capacity: usize,
}

fn default_cache_ttl() -> u64 {
    60
}

fn default_cache_capacity() -> usize {
    256
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_secs: default_cache_ttl(),
            capacity: default_cache_capacity(),
        }
    }
}

/// Session handling configuration
#[derive(Debug, Deserialize, Clone)]
pub struct AuthConfig {
    /// Path of the token refresh endpoint
    #[serde(default = "default_refresh_path")]
    pub refresh_path: String,

    /// Tokens are treated as expired this many seconds early
    #[serde(default = "default_expiry_skew")]
    pub expiry_skew_secs: i64,

    /// A session unused for this long is dropped with its cache
    #[serde(default = "default_session_idle")]
    pub session_idle_secs: u64,

    /// Most sessions held at once
    #[serde(default = "default_max_sessions")]
    pub max_sessions: u64,
}

fn default_refresh_path() -> String {
    "/v1/auth/refresh".to_string()
}

fn default_expiry_skew() -> i64 {
    30
}

fn default_session_idle() -> u64 {
    1800
}

fn default_max_sessions() -> u64 {
    10_000
}

impl Default for AuthConfig {
    fn default() -> Self {
        Self {
            refresh_path: default_refresh_path(),
            expiry_skew_secs: default_expiry_skew(),
            session_idle_secs: default_session_idle(),
            max_sessions: default_max_sessions(),
        }
    }
}

/// Margin classification thresholds (percent)
#[derive(Debug, Deserialize, Clone)]
pub struct MarginConfig {
    /// Below this margin a zone is in warning
    #[serde(default = "default_warning_percent")]
    pub warning_percent: Decimal,

    /// Below this margin a zone is critical
    #[serde(default = "default_critical_percent")]
    pub critical_percent: Decimal,
}

fn default_warning_percent() -> Decimal {
    dec!(40)
}

fn default_critical_percent() -> Decimal {
    dec!(20)
}

impl Default for MarginConfig {
    fn default() -> Self {
        Self {
            warning_percent: default_warning_percent(),
            critical_percent: default_critical_percent(),
        }
    }
}

impl AppConfig {
    /// Load configuration from environment and optional config file
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".to_string());
        tracing::debug!(run_mode = %run_mode, "Loading configuration");

        let config = Config::builder()
            // Start with default values
            .set_default("server.host", "0.0.0.0")?
            .set_default("server.port", 9002)?
            .set_default("server.workers", num_cpus::get() as i64)?
            .set_default("server.cors_origins", default_cors_origins())?
            .set_default("api.base_url", default_base_url())?
            .set_default("api.timeout_secs", 30)?
            .set_default("api.read_retries", 2)?
            .set_default("cache.ttl_secs", 60)?
            .set_default("cache.capacity", 256)?
            .set_default("auth.refresh_path", default_refresh_path())?
            .set_default("auth.expiry_skew_secs", 30)?
            .set_default("auth.session_idle_secs", 1800)?
            .set_default("auth.max_sessions", 10_000)?
            .set_default("margin.warning_percent", "40")?
            .set_default("margin.critical_percent", "20")?
            // Load config file if exists
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Load from environment variables with RINGER_ prefix
            .add_source(
                Environment::with_prefix("RINGER")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        config.try_deserialize()
    }

    /// Load configuration from a specific file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(Environment::with_prefix("RINGER").separator("__"))
            .build()?;

        config.try_deserialize()
    }

    /// Get the server bind address
    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_sections() {
        let api = PlatformApiConfig::default();
        assert_eq!(api.read_retries, 2);
        assert_eq!(api.timeout_secs, 30);

        let auth = AuthConfig::default();
        assert_eq!(auth.refresh_path, "/v1/auth/refresh");
        assert_eq!(auth.session_idle_secs, 1800);
        assert_eq!(auth.max_sessions, 10_000);

        let margin = MarginConfig::default();
        assert_eq!(margin.warning_percent, dec!(40));
        assert_eq!(margin.critical_percent, dec!(20));
    }

    #[test]
    fn test_server_addr() {
        let config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 9100,
                workers: 1,
                cors_origins: default_cors_origins(),
            },
            api: PlatformApiConfig::default(),
            cache: CacheConfig::default(),
            auth: AuthConfig::default(),
            margin: MarginConfig::default(),
        };
        assert_eq!(config.server_addr(), "127.0.0.1:9100");
    }
}
