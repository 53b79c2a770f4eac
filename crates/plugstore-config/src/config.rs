// crates/plugstore-config/src/config.rs
// ============================================================================
// Module: Plugstore Configuration
// Description: Configuration loading and validation for the storage service.
// Purpose: Provide strict, fail-closed config parsing with hard limits.
// Dependencies: plugstore-store-sqlite, serde, toml
// ============================================================================

//! ## Overview
//! Configuration is loaded from a TOML file with strict size and path limits.
//! The path comes from the caller, then the `PLUGSTORE_CONFIG` environment
//! variable, then `plugstore.toml` in the working directory. Every section
//! has defaults, so an empty file is a valid configuration.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::env;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;

use plugstore_store_sqlite::DEFAULT_BUSY_TIMEOUT_MS;
use plugstore_store_sqlite::SqliteStoreConfig;
use plugstore_store_sqlite::SqliteStoreMode;
use plugstore_store_sqlite::SqliteSyncMode;
use serde::Deserialize;
use serde::Serialize;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Default configuration filename when no path is specified.
const DEFAULT_CONFIG_NAME: &str = "plugstore.toml";
/// Environment variable used to override the config path.
pub const CONFIG_ENV_VAR: &str = "PLUGSTORE_CONFIG";
/// Maximum configuration file size in bytes.
pub(crate) const MAX_CONFIG_FILE_SIZE: usize = 1024 * 1024;
/// Maximum length of a single path component.
pub(crate) const MAX_PATH_COMPONENT_LENGTH: usize = 255;
/// Maximum total path length.
pub(crate) const MAX_TOTAL_PATH_LENGTH: usize = 4096;
/// Maximum length of the bus namespace.
const MAX_NAMESPACE_LENGTH: usize = 64;
/// Maximum in-process bus queue depth.
const MAX_CHANNEL_CAPACITY: usize = 65_536;
/// Hard upper bound for `search.max_rows`.
const MAX_SEARCH_ROWS: usize = 100_000;
/// Hard upper bound for gateway request bodies.
const MAX_GATEWAY_BODY_BYTES: usize = 16 * 1024 * 1024;
/// Hard upper bound for the gateway request timeout.
const MAX_GATEWAY_TIMEOUT_MS: u64 = 60_000;
/// Maximum length of the log filter directive.
const MAX_LOG_LEVEL_LENGTH: usize = 256;

// ============================================================================
// SECTION: Root Config
// ============================================================================

/// Plugstore configuration root.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PlugstoreConfig {
    /// Message bus configuration.
    #[serde(default)]
    pub bus: BusConfig,
    /// Storage configuration.
    #[serde(default)]
    pub store: StoreConfig,
    /// Search limits.
    #[serde(default)]
    pub search: SearchConfig,
    /// HTTP gateway configuration.
    #[serde(default)]
    pub gateway: GatewayConfig,
    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl PlugstoreConfig {
    /// Loads configuration from disk using the default resolution rules.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when loading or validation fails.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let resolved = resolve_path(path)?;
        validate_path(&resolved)?;
        let bytes = fs::read(&resolved).map_err(|err| ConfigError::Io(err.to_string()))?;
        if bytes.len() > MAX_CONFIG_FILE_SIZE {
            return Err(ConfigError::Invalid("config file exceeds size limit".to_string()));
        }
        let content = std::str::from_utf8(&bytes)
            .map_err(|_| ConfigError::Invalid("config file must be utf-8".to_string()))?;
        Self::from_toml(content)
    }

    /// Parses and validates configuration from TOML text.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when parsing or validation fails.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self =
            toml::from_str(content).map_err(|err| ConfigError::Parse(err.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration for internal consistency.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] when configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bus.validate()?;
        self.store.validate()?;
        self.search.validate()?;
        self.gateway.validate()?;
        self.logging.validate()?;
        Ok(())
    }
}

// ============================================================================
// SECTION: Bus
// ============================================================================

/// Message bus configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BusConfig {
    /// Subject prefix; requests arrive on `{namespace}.{plugin}.{operation}`.
    #[serde(default = "default_namespace")]
    pub namespace: String,
    /// In-process bus queue depth.
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

impl BusConfig {
    /// Validates bus settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let namespace = self.namespace.as_str();
        if namespace.is_empty() || namespace.len() > MAX_NAMESPACE_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "bus.namespace must be 1 to {MAX_NAMESPACE_LENGTH} characters"
            )));
        }
        if !namespace.chars().all(|ch| ch.is_ascii_alphanumeric() || ch == '-' || ch == '_') {
            return Err(ConfigError::Invalid(
                "bus.namespace may only contain ASCII letters, digits, `-`, and `_`".to_string(),
            ));
        }
        if self.channel_capacity == 0 || self.channel_capacity > MAX_CHANNEL_CAPACITY {
            return Err(ConfigError::Invalid(format!(
                "bus.channel_capacity must be between 1 and {MAX_CHANNEL_CAPACITY}"
            )));
        }
        Ok(())
    }
}

/// Returns the default subject namespace.
fn default_namespace() -> String {
    "db".to_string()
}

/// Returns the default bus queue depth.
const fn default_channel_capacity() -> usize {
    1_024
}

// ============================================================================
// SECTION: Store
// ============================================================================

/// `SQLite` storage configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StoreConfig {
    /// Path to the `SQLite` database file.
    #[serde(default = "default_store_path")]
    pub path: PathBuf,
    /// Busy timeout in milliseconds.
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,
    /// `SQLite` journal mode.
    #[serde(default)]
    pub journal_mode: SqliteStoreMode,
    /// `SQLite` sync mode.
    #[serde(default)]
    pub sync_mode: SqliteSyncMode,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: default_store_path(),
            busy_timeout_ms: default_busy_timeout_ms(),
            journal_mode: SqliteStoreMode::default(),
            sync_mode: SqliteSyncMode::default(),
        }
    }
}

impl StoreConfig {
    /// Builds the `SQLite` store configuration.
    #[must_use]
    pub fn sqlite_config(&self) -> SqliteStoreConfig {
        SqliteStoreConfig {
            path: self.path.clone(),
            busy_timeout_ms: self.busy_timeout_ms,
            journal_mode: self.journal_mode,
            sync_mode: self.sync_mode,
        }
    }

    /// Validates store settings.
    fn validate(&self) -> Result<(), ConfigError> {
        validate_path_string("store.path", &self.path.to_string_lossy())?;
        if self.busy_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "store.busy_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Returns the default database path.
fn default_store_path() -> PathBuf {
    PathBuf::from("plugstore.db")
}

/// Returns the default busy timeout for `SQLite` connections.
const fn default_busy_timeout_ms() -> u64 {
    DEFAULT_BUSY_TIMEOUT_MS
}

// ============================================================================
// SECTION: Search
// ============================================================================

/// Search limits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SearchConfig {
    /// Row cap applied when `limit` is missing or larger.
    #[serde(default = "default_max_rows")]
    pub max_rows: usize,
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            max_rows: default_max_rows(),
        }
    }
}

impl SearchConfig {
    /// Validates search settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_rows == 0 || self.max_rows > MAX_SEARCH_ROWS {
            return Err(ConfigError::Invalid(format!(
                "search.max_rows must be between 1 and {MAX_SEARCH_ROWS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default search row cap.
const fn default_max_rows() -> usize {
    1_000
}

// ============================================================================
// SECTION: Gateway
// ============================================================================

/// HTTP gateway configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Whether the gateway listens at all.
    #[serde(default)]
    pub enabled: bool,
    /// Listen address.
    #[serde(default = "default_bind")]
    pub bind: SocketAddr,
    /// Maximum request body size in bytes.
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
    /// Time to wait for a bus reply, in milliseconds.
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: default_bind(),
            max_body_bytes: default_max_body_bytes(),
            request_timeout_ms: default_request_timeout_ms(),
        }
    }
}

impl GatewayConfig {
    /// Validates gateway settings.
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_body_bytes == 0 || self.max_body_bytes > MAX_GATEWAY_BODY_BYTES {
            return Err(ConfigError::Invalid(format!(
                "gateway.max_body_bytes must be between 1 and {MAX_GATEWAY_BODY_BYTES}"
            )));
        }
        if self.request_timeout_ms == 0 || self.request_timeout_ms > MAX_GATEWAY_TIMEOUT_MS {
            return Err(ConfigError::Invalid(format!(
                "gateway.request_timeout_ms must be between 1 and {MAX_GATEWAY_TIMEOUT_MS}"
            )));
        }
        Ok(())
    }
}

/// Returns the default gateway listen address.
fn default_bind() -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], 8470))
}

/// Returns the default gateway body limit.
const fn default_max_body_bytes() -> usize {
    1024 * 1024
}

/// Returns the default gateway reply timeout.
const fn default_request_timeout_ms() -> u64 {
    2_000
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    /// Human-readable output.
    #[default]
    Pretty,
    /// One JSON object per line.
    Json,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct LoggingConfig {
    /// Default filter directive (`RUST_LOG` overrides it).
    #[serde(default = "default_log_level")]
    pub level: String,
    /// Output format.
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

impl LoggingConfig {
    /// Validates logging settings.
    fn validate(&self) -> Result<(), ConfigError> {
        let level = self.level.trim();
        if level.is_empty() || level.len() > MAX_LOG_LEVEL_LENGTH {
            return Err(ConfigError::Invalid(format!(
                "logging.level must be 1 to {MAX_LOG_LEVEL_LENGTH} characters"
            )));
        }
        Ok(())
    }
}

/// Returns the default log filter.
fn default_log_level() -> String {
    "info".to_string()
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// Configuration loading or validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure while reading configuration.
    #[error("config io error: {0}")]
    Io(String),
    /// TOML parsing error.
    #[error("config parse error: {0}")]
    Parse(String),
    /// Invalid configuration data.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ============================================================================
// SECTION: Helpers
// ============================================================================

/// Resolves the config path from CLI or environment defaults.
fn resolve_path(path: Option<&Path>) -> Result<PathBuf, ConfigError> {
    if let Some(path) = path {
        return Ok(path.to_path_buf());
    }
    if let Ok(env_path) = env::var(CONFIG_ENV_VAR) {
        if env_path.len() > MAX_TOTAL_PATH_LENGTH {
            return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
        }
        return Ok(PathBuf::from(env_path));
    }
    Ok(PathBuf::from(DEFAULT_CONFIG_NAME))
}

/// Validates the resolved path against security limits.
fn validate_path(path: &Path) -> Result<(), ConfigError> {
    let text = path.to_string_lossy();
    if text.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid("config path exceeds max length".to_string()));
    }
    for component in path.components() {
        let value = component.as_os_str().to_string_lossy();
        if value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid("config path component too long".to_string()));
        }
    }
    Ok(())
}

/// Validates a path string against length constraints.
fn validate_path_string(field: &str, value: &str) -> Result<(), ConfigError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(ConfigError::Invalid(format!("{field} must be non-empty")));
    }
    if trimmed.len() > MAX_TOTAL_PATH_LENGTH {
        return Err(ConfigError::Invalid(format!("{field} exceeds max length")));
    }
    let path = Path::new(trimmed);
    for component in path.components() {
        let component_value = component.as_os_str().to_string_lossy();
        if component_value.len() > MAX_PATH_COMPONENT_LENGTH {
            return Err(ConfigError::Invalid(format!("{field} path component too long")));
        }
    }
    Ok(())
}
