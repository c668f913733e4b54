//! Application configuration module
//!
//! Provides the server configuration and its loaders. Values are layered:
//! built-in defaults, then an optional TOML file, then environment variables.
//!
//! ```toml
//! host = "0.0.0.0"
//! port = 3000
//! jwt_secret = "change-me"
//! outbound_buffer = 256
//! notification_queue_capacity = 1024
//! ```

use std::path::Path;

use serde::Deserialize;
use thiserror::Error;

/// Environment variable naming an optional TOML config file
pub const CONFIG_PATH_ENV: &str = "TASKCOLLAB_CONFIG";

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_OUTBOUND_BUFFER: usize = 256;
const DEFAULT_NOTIFICATION_QUEUE: usize = 1024;
const DEFAULT_JWT_SECRET: &str = "your-secret-key-change-in-production";

/// Smallest usable outbound queue. A rejected handshake queues `auth_error`
/// followed by the close frame, and both must fit.
pub const MIN_OUTBOUND_BUFFER: usize = 2;

/// Server configuration
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct RealtimeConfig {
    /// Interface to bind
    pub host: String,
    /// Port to bind
    pub port: u16,
    /// HS256 secret used to verify bearer tokens
    pub jwt_secret: String,
    /// Postgres URL for the project/task directory; in-memory directory when absent
    pub database_url: Option<String>,
    /// Outbound frames buffered per connection before it counts as failed
    pub outbound_buffer: usize,
    /// Domain events buffered before new ones are dropped
    pub notification_queue_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            jwt_secret: DEFAULT_JWT_SECRET.to_string(),
            database_url: None,
            outbound_buffer: DEFAULT_OUTBOUND_BUFFER,
            notification_queue_capacity: DEFAULT_NOTIFICATION_QUEUE,
        }
    }
}

impl RealtimeConfig {
    /// Create a new RealtimeConfigBuilder
    pub fn builder() -> RealtimeConfigBuilder {
        RealtimeConfigBuilder::default()
    }

    /// Load defaults, then the file named by `TASKCOLLAB_CONFIG` (if set), then env vars
    pub fn load() -> Result<Self, ConfigError> {
        let mut config = match std::env::var(CONFIG_PATH_ENV) {
            Ok(path) => Self::from_toml_file(path)?,
            Err(_) => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parse a TOML document; missing keys keep their defaults
    pub fn from_toml_str(raw: &str) -> Result<Self, ConfigError> {
        toml::from_str(raw).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&raw)
    }

    /// Override fields from environment-style lookups
    pub fn apply_env<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("SERVER_HOST") {
            self.host = host;
        }
        if let Some(port) = lookup("SERVER_PORT") {
            self.port = port
                .parse()
                .map_err(|_| ConfigError::InvalidValue("SERVER_PORT", port))?;
        }
        if let Some(secret) = lookup("JWT_SECRET") {
            self.jwt_secret = secret;
        }
        if let Some(url) = lookup("DATABASE_URL") {
            self.database_url = Some(url).filter(|u| !u.is_empty());
        }
        if let Some(buffer) = lookup("OUTBOUND_BUFFER") {
            self.outbound_buffer = buffer
                .parse()
                .map_err(|_| ConfigError::InvalidValue("OUTBOUND_BUFFER", buffer))?;
        }
        if let Some(capacity) = lookup("NOTIFICATION_QUEUE_CAPACITY") {
            self.notification_queue_capacity = capacity
                .parse()
                .map_err(|_| ConfigError::InvalidValue("NOTIFICATION_QUEUE_CAPACITY", capacity))?;
        }
        Ok(())
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.jwt_secret.trim().is_empty() {
            return Err(ConfigError::MissingValue("jwt_secret"));
        }
        if self.outbound_buffer < MIN_OUTBOUND_BUFFER {
            return Err(ConfigError::InvalidValue(
                "outbound_buffer",
                self.outbound_buffer.to_string(),
            ));
        }
        if self.notification_queue_capacity == 0 {
            return Err(ConfigError::InvalidValue(
                "notification_queue_capacity",
                "0".to_string(),
            ));
        }
        Ok(())
    }

    /// `host:port` string for binding
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn uses_default_secret(&self) -> bool {
        self.jwt_secret == DEFAULT_JWT_SECRET
    }
}

/// Builder for RealtimeConfig
#[derive(Debug, Default)]
pub struct RealtimeConfigBuilder {
    host: Option<String>,
    port: Option<u16>,
    jwt_secret: Option<String>,
    database_url: Option<String>,
    outbound_buffer: Option<usize>,
    notification_queue_capacity: Option<usize>,
}

impl RealtimeConfigBuilder {
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = Some(host.into());
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = Some(port);
        self
    }

    pub fn jwt_secret(mut self, secret: impl Into<String>) -> Self {
        self.jwt_secret = Some(secret.into());
        self
    }

    pub fn database_url(mut self, url: impl Into<String>) -> Self {
        self.database_url = Some(url.into());
        self
    }

    pub fn outbound_buffer(mut self, size: usize) -> Self {
        self.outbound_buffer = Some(size);
        self
    }

    pub fn notification_queue_capacity(mut self, size: usize) -> Self {
        self.notification_queue_capacity = Some(size);
        self
    }

    /// Build and validate the configuration
    pub fn build(self) -> Result<RealtimeConfig, ConfigError> {
        let defaults = RealtimeConfig::default();
        let config = RealtimeConfig {
            host: self.host.unwrap_or(defaults.host),
            port: self.port.unwrap_or(defaults.port),
            jwt_secret: self.jwt_secret.unwrap_or(defaults.jwt_secret),
            database_url: self.database_url.or(defaults.database_url),
            outbound_buffer: self.outbound_buffer.unwrap_or(defaults.outbound_buffer),
            notification_queue_capacity: self
                .notification_queue_capacity
                .unwrap_or(defaults.notification_queue_capacity),
        };
        config.validate()?;
        Ok(config)
    }
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing value: {0}")]
    MissingValue(&'static str),
    #[error("invalid value for {0}: {1}")]
    InvalidValue(&'static str, String),
    #[error("failed to read config file {path}: {message}")]
    Io { path: String, message: String },
    #[error("failed to parse config: {0}")]
    Parse(String),
}
