//! Configuration management for Cornstand.

use serde::{Deserialize, Serialize};
use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use crate::error::{CornstandError, Result};

/// Prefix for environment variable overrides, e.g. `CORNSTAND__LIMITS__WINDOW_SECS`.
pub const ENV_PREFIX: &str = "CORNSTAND";

/// Longest window or retention accepted, ten years in seconds.
pub const MAX_TTL_SECS: u64 = 60 * 60 * 24 * 365 * 10;

/// Main configuration for the Cornstand service.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CornstandConfig {
    /// Server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Purchase window and counter retention
    #[serde(default)]
    pub limits: LimitsConfig,

    /// Key-value store connection
    #[serde(default)]
    pub store: StoreConfig,

    /// Log output
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server address
    #[serde(default = "default_http_addr")]
    pub http_addr: SocketAddr,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_addr: default_http_addr(),
        }
    }
}

fn default_http_addr() -> SocketAddr {
    SocketAddr::from(([0, 0, 0, 0], 3000))
}

/// Purchase window and counter retention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsConfig {
    /// Length of the per-client purchase window in seconds
    #[serde(default = "default_window_secs")]
    pub window_secs: u64,

    /// How long an idle purchase counter is retained, refreshed on every purchase
    #[serde(default = "default_retention_secs")]
    pub retention_secs: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            window_secs: default_window_secs(),
            retention_secs: default_retention_secs(),
        }
    }
}

impl LimitsConfig {
    /// Limits with the given window and the default retention.
    pub fn with_window(window_secs: u64) -> Self {
        Self {
            window_secs,
            ..Self::default()
        }
    }
}

fn default_window_secs() -> u64 {
    60
}

fn default_retention_secs() -> u64 {
    60 * 60 * 24 * 30
}

/// Key-value store connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Redis connection URL; the in-memory store is used when unset
    #[serde(default)]
    pub redis_url: Option<String>,

    /// Prefix shared by every key the service writes
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Upper bound on a single store round-trip in milliseconds
    #[serde(default = "default_operation_timeout_ms")]
    pub operation_timeout_ms: u64,

    /// Refuse to start without `redis_url`
    #[serde(default)]
    pub require_redis: bool,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            redis_url: None,
            namespace: default_namespace(),
            operation_timeout_ms: default_operation_timeout_ms(),
            require_redis: false,
        }
    }
}

impl StoreConfig {
    /// Timeout applied to each store command.
    pub fn operation_timeout(&self) -> Duration {
        Duration::from_millis(self.operation_timeout_ms)
    }
}

fn default_namespace() -> String {
    "corn".to_string()
}

fn default_operation_timeout_ms() -> u64 {
    2000
}

/// Log output settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is not set
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Log line format.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

impl CornstandConfig {
    /// Parse configuration from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        serde_yaml::from_str(yaml).map_err(|e| CornstandError::Config(e.to_string()))
    }

    /// Layer an optional YAML file and `CORNSTAND__*` environment variables.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut builder = ::config::Config::builder();

        if let Some(path) = path {
            builder = builder.add_source(
                ::config::File::from(path).format(::config::FileFormat::Yaml),
            );
        }

        builder
            .add_source(
                ::config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()
            .and_then(|c| c.try_deserialize::<CornstandConfig>())
            .map_err(|e| CornstandError::Config(e.to_string()))
    }

    /// Check constraints serde cannot express.
    pub fn validate(&self) -> Result<()> {
        check_ttl("limits.window_secs", self.limits.window_secs)?;
        check_ttl("limits.retention_secs", self.limits.retention_secs)?;
        if self.store.namespace.is_empty() {
            return Err(CornstandError::Config(
                "store.namespace must not be empty".to_string(),
            ));
        }
        if self.store.operation_timeout_ms == 0 {
            return Err(CornstandError::Config(
                "store.operation_timeout_ms must be greater than zero".to_string(),
            ));
        }
        if self.store.require_redis && self.store.redis_url.is_none() {
            return Err(CornstandError::Config(
                "store.redis_url is required when store.require_redis is set".to_string(),
            ));
        }
        Ok(())
    }
}

fn check_ttl(name: &str, secs: u64) -> Result<()> {
    if secs == 0 || secs > MAX_TTL_SECS {
        return Err(CornstandError::Config(format!(
            "{} must be between 1 and {}, got {}",
            name, MAX_TTL_SECS, secs
        )));
    }
    Ok(())
}
