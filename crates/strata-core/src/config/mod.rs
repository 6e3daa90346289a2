//! Provider configuration with layered loading.
//!
//! # Configuration Hierarchy
//!
//! Configuration is loaded in this order (later overrides earlier):
//!
//! 1. **Compiled defaults**: Hardcoded in struct `Default` implementations
//! 2. **Config file**: TOML file specified by `STRATA_CONFIG` env var
//! 3. **Environment variables**: `STRATA__*` env vars override specific fields
//!
//! # Configuration Sections
//!
//! - [`TransportConfig`]: Request timeout and notification buffering
//! - [`BlockTrackerConfig`]: How new heads are observed
//! - [`BlockCacheConfig`]: Cache sizing
//! - [`LoggingConfig`]: Log level and format
//!
//! # Example
//!
//! ```toml
//! url = "ws://127.0.0.1:8546"
//!
//! [transport]
//! request_timeout_ms = 10000
//!
//! [block_tracker]
//! kind = "subscribe"
//!
//! [block_cache]
//! max_blocks = 128
//! ```

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};
use std::{path::Path, time::Duration};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "config/strata.toml";

/// Raw transport settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TransportConfig {
    /// Milliseconds to wait for a response before failing with a timeout. Defaults to `30000`.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Capacity of the `eth_subscription` notification channel. Defaults to `1024`.
    #[serde(default = "default_notification_buffer")]
    pub notification_buffer: usize,
}

fn default_request_timeout_ms() -> u64 {
    30_000
}

fn default_notification_buffer() -> usize {
    1024
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            request_timeout_ms: default_request_timeout_ms(),
            notification_buffer: default_notification_buffer(),
        }
    }
}

impl TransportConfig {
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Source of new-head information.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockTrackerKind {
    /// `eth_subscribe` to `newHeads` over the websocket.
    #[default]
    Subscribe,
    /// Poll `eth_blockNumber` on an interval.
    Polling,
}

/// Block tracker settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockTrackerConfig {
    #[serde(default)]
    pub kind: BlockTrackerKind,

    /// Interval between `eth_blockNumber` polls when `kind = "polling"`. Defaults to `4000`.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_poll_interval_ms() -> u64 {
    4_000
}

impl Default for BlockTrackerConfig {
    fn default() -> Self {
        Self { kind: BlockTrackerKind::default(), poll_interval_ms: default_poll_interval_ms() }
    }
}

impl BlockTrackerConfig {
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Block cache sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockCacheConfig {
    /// Whether the block cache middleware is installed. Defaults to `true`.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Number of recent blocks whose block- and fork-scoped results are retained.
    /// Defaults to `64`.
    #[serde(default = "default_max_blocks")]
    pub max_blocks: usize,

    /// Maximum number of block-independent results retained. Defaults to `10000`.
    #[serde(default = "default_max_perma_entries")]
    pub max_perma_entries: usize,
}

fn default_true() -> bool {
    true
}

fn default_max_blocks() -> usize {
    64
}

fn default_max_perma_entries() -> usize {
    10_000
}

impl Default for BlockCacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_blocks: default_max_blocks(),
            max_perma_entries: default_max_perma_entries(),
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level used when `RUST_LOG` is unset. Defaults to `info`.
    pub level: String,
    /// Either `pretty` or `json`. Defaults to `pretty`.
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".to_string(), format: "pretty".to_string() }
    }
}

/// Complete provider configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Websocket endpoint of the node. Must start with `ws://` or `wss://`.
    pub url: String,

    #[serde(default)]
    pub transport: TransportConfig,

    #[serde(default)]
    pub block_tracker: BlockTrackerConfig,

    #[serde(default)]
    pub block_cache: BlockCacheConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            url: "ws://127.0.0.1:8546".to_string(),
            transport: TransportConfig::default(),
            block_tracker: BlockTrackerConfig::default(),
            block_cache: BlockCacheConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

impl ProviderConfig {
    /// Creates a default configuration pointing at `url`.
    #[must_use]
    pub fn for_url(url: impl Into<String>) -> Self {
        Self { url: url.into(), ..Self::default() }
    }

    /// Loads configuration from a TOML file with environment variable overrides.
    ///
    /// Environment variables with the `STRATA__` prefix can override any configuration value.
    /// Use `__` as a separator for nested fields (e.g., `STRATA__BLOCK_CACHE__MAX_BLOCKS=32`).
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the file cannot be read, parsed, or deserialized.
    pub fn from_file<P: AsRef<Path>>(config_path: P) -> Result<Self, ConfigError> {
        let config_builder = Config::builder()
            .set_default("url", "ws://127.0.0.1:8546")?
            .set_default("transport.request_timeout_ms", default_request_timeout_ms())?
            .set_default("transport.notification_buffer", 1024)?
            .set_default("block_tracker.kind", "subscribe")?
            .set_default("block_tracker.poll_interval_ms", default_poll_interval_ms())?
            .set_default("block_cache.enabled", true)?
            .set_default("block_cache.max_blocks", 64)?
            .set_default("block_cache.max_perma_entries", 10_000)?
            .set_default("logging.level", "info")?
            .set_default("logging.format", "pretty")?
            .add_source(File::with_name(&config_path.as_ref().to_string_lossy()).required(false))
            .add_source(Environment::with_prefix("STRATA").prefix_separator("__").separator("__"))
            .build()?;

        config_builder.try_deserialize()
    }

    /// Loads configuration from `config/strata.toml` with fallback to defaults.
    ///
    /// The config file path can be overridden using the `STRATA_CONFIG` environment variable.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the configuration cannot be loaded or parsed.
    pub fn load() -> Result<Self, ConfigError> {
        let config_path =
            std::env::var("STRATA_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_PATH.to_string());
        Self::from_file(&config_path)
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first invalid setting found.
    pub fn validate(&self) -> Result<(), String> {
        validate_ws_url(&self.url)?;

        if self.transport.request_timeout_ms == 0 {
            return Err("Request timeout must be greater than 0".to_string());
        }

        if self.transport.notification_buffer == 0 {
            return Err("Notification buffer must be greater than 0".to_string());
        }

        if self.block_tracker.kind == BlockTrackerKind::Polling &&
            self.block_tracker.poll_interval_ms == 0
        {
            return Err("Poll interval must be greater than 0".to_string());
        }

        if self.block_cache.max_blocks == 0 || self.block_cache.max_perma_entries == 0 {
            return Err("Block cache sizes must be greater than 0".to_string());
        }

        if !matches!(self.logging.format.as_str(), "json" | "pretty") {
            return Err("Logging format must be 'json' or 'pretty'".to_string());
        }

        Ok(())
    }
}

/// Checks that `url` is a websocket URL.
///
/// # Errors
///
/// Returns a description of the problem if the URL is empty or does not start
/// with `ws://` or `wss://`.
pub fn validate_ws_url(url: &str) -> Result<(), String> {
    if url.trim().is_empty() {
        return Err("WebSocket URL is empty".to_string());
    }

    if !url.starts_with("ws://") && !url.starts_with("wss://") {
        return Err(format!("Invalid WebSocket URL format: {url}"));
    }

    Ok(())
}
