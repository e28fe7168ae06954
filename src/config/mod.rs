//! Configuration management for searchvol
//!
//! This module handles loading and validating configuration from environment
//! variables and TOML files. Credentials for the keyword tool API are
//! required; everything else has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

/// Default keyword tool endpoint
pub const DEFAULT_BASE_URL: &str = "https://api.naver.com";

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Keyword tool API configuration
    #[serde(default)]
    pub api: ApiConfig,

    /// Batch lookup tuning
    #[serde(default)]
    pub lookup: LookupConfig,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Keyword tool API credentials and transport settings
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    /// API access key (`X-API-KEY`)
    pub access_key: String,

    /// Shared secret used to sign requests
    pub secret_key: String,

    /// Customer id (`X-Customer`)
    pub customer_id: String,

    /// Base URL of the API
    pub base_url: String,

    /// Per-request timeout in seconds
    pub request_timeout_secs: u64,

    /// Optional process-wide cap on requests per second
    pub rate_limit: Option<u32>,
}

impl std::fmt::Debug for ApiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiConfig")
            .field("access_key", &self.access_key)
            .field("secret_key", &"<redacted>")
            .field("customer_id", &self.customer_id)
            .field("base_url", &self.base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("rate_limit", &self.rate_limit)
            .finish()
    }
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            access_key: String::new(),
            secret_key: String::new(),
            customer_id: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            request_timeout_secs: 10,
            rate_limit: None,
        }
    }
}

/// Batch scheduling configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LookupConfig {
    /// Maximum lookups in flight within a batch
    pub concurrency: usize,

    /// Number of keywords per batch
    pub batch_size: usize,

    /// Pause between batches in milliseconds
    pub pacing_delay_ms: u64,
}

impl Default for LookupConfig {
    fn default() -> Self {
        Self {
            concurrency: 5,
            batch_size: 20,
            pacing_delay_ms: 1000,
        }
    }
}

impl LookupConfig {
    /// Pause between batches as Duration
    #[must_use]
    pub fn pacing_delay(&self) -> Duration {
        Duration::from_millis(self.pacing_delay_ms)
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Server bind address
    pub bind_address: SocketAddr,

    /// Enable permissive CORS
    pub enable_cors: bool,

    /// Enable request tracing
    pub enable_request_logging: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: SocketAddr::from(([0, 0, 0, 0], 8080)),
            enable_cors: true,
            enable_request_logging: true,
        }
    }
}

impl ServerConfig {
    /// Create a new config builder
    pub fn builder() -> ServerConfigBuilder {
        ServerConfigBuilder::default()
    }
}

/// Builder for ServerConfig
#[derive(Debug, Default)]
pub struct ServerConfigBuilder {
    bind_address: Option<SocketAddr>,
    enable_cors: Option<bool>,
    enable_request_logging: Option<bool>,
}

impl ServerConfigBuilder {
    /// Set bind address
    pub fn bind_address(mut self, addr: SocketAddr) -> Self {
        self.bind_address = Some(addr);
        self
    }

    /// Set bind address from string
    pub fn bind_address_str(mut self, addr: &str) -> Result<Self> {
        self.bind_address = Some(
            addr.parse()
                .with_context(|| format!("Invalid bind address: {addr}"))?,
        );
        Ok(self)
    }

    /// Enable/disable CORS
    pub fn enable_cors(mut self, enable: bool) -> Self {
        self.enable_cors = Some(enable);
        self
    }

    /// Enable/disable request logging
    pub fn enable_request_logging(mut self, enable: bool) -> Self {
        self.enable_request_logging = Some(enable);
        self
    }

    /// Build the config
    pub fn build(self) -> ServerConfig {
        let defaults = ServerConfig::default();
        ServerConfig {
            bind_address: self.bind_address.unwrap_or(defaults.bind_address),
            enable_cors: self.enable_cors.unwrap_or(defaults.enable_cors),
            enable_request_logging: self
                .enable_request_logging
                .unwrap_or(defaults.enable_request_logging),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: String,

    /// Log format (text, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: String::from("info"),
            format: String::from("text"),
        }
    }
}

/// Read `SEARCHVOL_{name}`, falling back to the bare legacy variable.
/// Blank values count as unset at either level.
fn env_var(name: &str, legacy: Option<&str>) -> Option<String> {
    let non_blank = |var: &str| std::env::var(var).ok().filter(|v| !v.trim().is_empty());
    non_blank(&format!("SEARCHVOL_{name}")).or_else(|| legacy.and_then(non_blank))
}

fn env_parse<T: std::str::FromStr>(name: &str, legacy: Option<&str>) -> Result<Option<T>>
where
    T::Err: std::fmt::Display,
{
    match env_var(name, legacy) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("Invalid value for SEARCHVOL_{name} ({raw}): {e}")),
        None => Ok(None),
    }
}

impl Config {
    /// Load configuration from environment variables
    ///
    /// `ACCESS_KEY`, `SECRET_KEY`, `CUSTOMER_ID` and `PORT` are honoured when
    /// the prefixed variables are absent.
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();
        config.apply_env()?;
        Ok(config)
    }

    /// Overlay environment variables onto this configuration
    pub fn apply_env(&mut self) -> Result<()> {
        if let Some(v) = env_var("ACCESS_KEY", Some("ACCESS_KEY")) {
            self.api.access_key = v;
        }
        if let Some(v) = env_var("SECRET_KEY", Some("SECRET_KEY")) {
            self.api.secret_key = v;
        }
        if let Some(v) = env_var("CUSTOMER_ID", Some("CUSTOMER_ID")) {
            self.api.customer_id = v;
        }
        if let Some(v) = env_var("BASE_URL", None) {
            self.api.base_url = v;
        }
        if let Some(v) = env_parse("REQUEST_TIMEOUT", None)? {
            self.api.request_timeout_secs = v;
        }
        if let Some(v) = env_parse("RATE_LIMIT", None)? {
            self.api.rate_limit = Some(v);
        }
        if let Some(v) = env_parse("CONCURRENCY", None)? {
            self.lookup.concurrency = v;
        }
        if let Some(v) = env_parse("BATCH_SIZE", None)? {
            self.lookup.batch_size = v;
        }
        if let Some(v) = env_parse("PACING_DELAY_MS", None)? {
            self.lookup.pacing_delay_ms = v;
        }
        if let Some(addr) = env_parse::<SocketAddr>("BIND_ADDRESS", None)? {
            self.server.bind_address = addr;
        } else if let Some(port) = env_parse::<u16>("PORT", Some("PORT"))? {
            self.server.bind_address.set_port(port);
        }
        if let Some(v) = env_var("LOG_LEVEL", None) {
            self.logging.level = v;
        }
        if let Some(v) = env_var("LOG_FORMAT", None) {
            self.logging.format = v;
        }
        Ok(())
    }

    /// Load configuration from a file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Self = toml::from_str(&content)
            .with_context(|| format!("Failed to parse TOML config file: {}", path.display()))?;

        Ok(config)
    }

    /// Load from an optional file, then overlay the environment
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env()?;
        Ok(config)
    }

    /// Validate configuration values
    pub fn validate(&self) -> crate::error::Result<()> {
        use crate::error::Error;

        if self.api.access_key.is_empty() {
            return Err(Error::config("access_key is not set"));
        }
        if self.api.secret_key.is_empty() {
            return Err(Error::config("secret_key is not set"));
        }
        if self.api.customer_id.is_empty() {
            return Err(Error::config("customer_id is not set"));
        }
        if url::Url::parse(&self.api.base_url).is_err() {
            return Err(Error::config(format!(
                "base_url is not a valid URL: {}",
                self.api.base_url
            )));
        }
        if self.api.request_timeout_secs == 0 {
            return Err(Error::config("request_timeout_secs must be greater than 0"));
        }
        if self.api.rate_limit == Some(0) {
            return Err(Error::config("rate_limit must be greater than 0"));
        }
        if self.lookup.concurrency == 0 {
            return Err(Error::config("concurrency must be greater than 0"));
        }
        if self.lookup.batch_size == 0 {
            return Err(Error::config("batch_size must be greater than 0"));
        }

        Ok(())
    }

    /// Get request timeout as Duration
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.api.request_timeout_secs)
    }
}
