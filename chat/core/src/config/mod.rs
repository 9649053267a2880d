//! TOML Configuration File Support
//!
//! Centralized configuration loading for the chat client, supporting a TOML
//! configuration file at `~/.config/chat-stream/config.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # Example Configuration
//!
//! ```toml
//! [server]
//! endpoint = "https://chat.example.com/chat"
//! health_path = "/health"
//! auth_token = "..."
//!
//! [timeouts]
//! request_secs = 300
//! connect_secs = 10
//!
//! [client]
//! update_buffer = 256
//! ```
//!
//! # Environment Variables
//!
//! - `CHAT_ENDPOINT`: chat endpoint URL
//! - `CHAT_AUTH_TOKEN`: bearer token
//! - `CHAT_REQUEST_TIMEOUT_SECS`: total request timeout
//! - `CHAT_CONNECT_TIMEOUT_SECS`: connect timeout

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default chat endpoint
pub const DEFAULT_ENDPOINT: &str = "http://localhost:8080/chat";

/// Default health check path, resolved against the endpoint origin
pub const DEFAULT_HEALTH_PATH: &str = "/health";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// Server section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerToml {
    /// Chat endpoint URL
    pub endpoint: Option<String>,

    /// Health check path
    pub health_path: Option<String>,

    /// Bearer token
    pub auth_token: Option<String>,
}

/// Timeouts section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeoutsToml {
    /// Total request timeout in seconds (covers the whole stream)
    pub request_secs: Option<u64>,

    /// Connect timeout in seconds
    pub connect_secs: Option<u64>,
}

/// Client section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ClientToml {
    /// Capacity of the update channel handed to subscribers
    pub update_buffer: Option<usize>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ChatToml {
    /// Server section
    pub server: ServerToml,

    /// Timeouts section
    pub timeouts: TimeoutsToml,

    /// Client section
    pub client: ClientToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration for the chat client
#[derive(Clone)]
pub struct ChatConfig {
    /// Chat endpoint URL (`POST`)
    pub endpoint: String,

    /// Health check path, resolved against the endpoint origin
    pub health_path: String,

    /// Total request timeout, enforced by the HTTP stack
    pub request_timeout: Duration,

    /// Connect timeout
    pub connect_timeout: Duration,

    /// Bearer token sent in the `Authorization` header
    pub auth_token: Option<String>,

    /// Capacity of the update channel handed to subscribers
    pub update_buffer: usize,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for ChatConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_ENDPOINT.to_string(),
            health_path: DEFAULT_HEALTH_PATH.to_string(),
            request_timeout: Duration::from_secs(300),
            connect_timeout: Duration::from_secs(10),
            auth_token: None,
            update_buffer: 256,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl fmt::Debug for ChatConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatConfig")
            .field("endpoint", &self.endpoint)
            .field("health_path", &self.health_path)
            .field("request_timeout", &self.request_timeout)
            .field("connect_timeout", &self.connect_timeout)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[REDACTED]"))
            .field("update_buffer", &self.update_buffer)
            .field("config_file_path", &self.config_file_path)
            .field("source", &self.source)
            .finish()
    }
}

impl ChatConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a configuration pointing at `endpoint`, defaults elsewhere
    pub fn for_endpoint(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            ..Self::default()
        }
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Check that the configuration is usable
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ValidationError` for an empty or non-http(s)
    /// endpoint, zero timeouts, or a zero update buffer.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let endpoint = self.endpoint.trim();
        if endpoint.is_empty() {
            return Err(ConfigError::ValidationError(
                "endpoint must not be empty".to_string(),
            ));
        }
        if !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
            return Err(ConfigError::ValidationError(format!(
                "endpoint must be an http(s) URL, got {endpoint}"
            )));
        }
        if self.request_timeout.is_zero() || self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "timeouts must be greater than zero".to_string(),
            ));
        }
        if self.update_buffer == 0 {
            return Err(ConfigError::ValidationError(
                "update_buffer must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/chat-stream/config.toml` or
/// `~/.config/chat-stream/config.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("chat-stream").join("config.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if
/// the resulting configuration is invalid. A missing config file is not an
/// error (defaults are used).
pub fn load_config() -> Result<ChatConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the resulting configuration is invalid.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    load_config_with_overrides(path, &ConfigOverrides::default())
}

/// Load configuration from a specific path with CLI overrides on top
///
/// Validation runs once, after every layer is applied, so an override can
/// replace an invalid file or environment value.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed,
/// or if the fully layered configuration is invalid.
pub fn load_config_with_overrides(
    path: Option<PathBuf>,
    overrides: &ConfigOverrides,
) -> Result<ChatConfig, ConfigError> {
    load_layered(path, overrides, |key| std::env::var(key).ok())
}

/// Defaults, then file, then environment, then overrides; validated last
fn load_layered<F>(
    path: Option<PathBuf>,
    overrides: &ConfigOverrides,
    lookup: F,
) -> Result<ChatConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let mut config = load_file_layer(path)?;
    apply_env_config(&mut config, lookup);
    overrides.apply(&mut config);
    config.validate()?;
    Ok(config)
}

/// Defaults overlaid with the TOML file, if present
fn load_file_layer(path: Option<PathBuf>) -> Result<ChatConfig, ConfigError> {
    let mut config = ChatConfig::default();

    let Some(config_path) = path else {
        return Ok(config);
    };

    if !config_path.exists() {
        tracing::debug!(
            path = %config_path.display(),
            "Config file not found, using defaults"
        );
        return Ok(config);
    }

    let toml_content =
        std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
            path: config_path.clone(),
            source: e,
        })?;

    let toml_config: ChatToml = toml::from_str(&toml_content)?;
    apply_toml_config(&mut config, &toml_config);
    config.source = ConfigSource::File;

    tracing::info!(
        path = %config_path.display(),
        "Loaded configuration from file"
    );
    config.config_file_path = Some(config_path);

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut ChatConfig, toml: &ChatToml) {
    if let Some(ref endpoint) = toml.server.endpoint {
        config.endpoint.clone_from(endpoint);
    }
    if let Some(ref path) = toml.server.health_path {
        config.health_path.clone_from(path);
    }
    if toml.server.auth_token.is_some() {
        config.auth_token.clone_from(&toml.server.auth_token);
    }

    if let Some(secs) = toml.timeouts.request_secs {
        config.request_timeout = Duration::from_secs(secs);
    }
    if let Some(secs) = toml.timeouts.connect_secs {
        config.connect_timeout = Duration::from_secs(secs);
    }

    if let Some(size) = toml.client.update_buffer {
        config.update_buffer = size;
    }
}

/// Apply environment variable overrides to the config
///
/// `lookup` resolves a variable name; production passes `std::env::var`.
fn apply_env_config<F>(config: &mut ChatConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(endpoint) = lookup("CHAT_ENDPOINT") {
        config.endpoint = endpoint;
        config.source = ConfigSource::Env;
    }
    if let Some(token) = lookup("CHAT_AUTH_TOKEN") {
        config.auth_token = Some(token);
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = lookup("CHAT_REQUEST_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.request_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
    if let Some(timeout) = lookup("CHAT_CONNECT_TIMEOUT_SECS") {
        if let Ok(secs) = timeout.parse::<u64>() {
            config.connect_timeout = Duration::from_secs(secs);
            config.source = ConfigSource::Env;
        }
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Pass to [`load_config_with_overrides`] so command-line arguments win
/// over every other layer.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Endpoint override
    pub endpoint: Option<String>,

    /// Bearer token override
    pub auth_token: Option<String>,

    /// Request timeout override (seconds)
    pub request_timeout_secs: Option<u64>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set endpoint override
    #[must_use]
    pub fn with_endpoint(mut self, endpoint: String) -> Self {
        self.endpoint = Some(endpoint);
        self
    }

    /// Set bearer token override
    #[must_use]
    pub fn with_auth_token(mut self, token: String) -> Self {
        self.auth_token = Some(token);
        self
    }

    /// Set request timeout override
    #[must_use]
    pub fn with_request_timeout_secs(mut self, secs: u64) -> Self {
        self.request_timeout_secs = Some(secs);
        self
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut ChatConfig) {
        if self.endpoint.is_some()
            || self.auth_token.is_some()
            || self.request_timeout_secs.is_some()
        {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref endpoint) = self.endpoint {
            config.endpoint.clone_from(endpoint);
        }

        if self.auth_token.is_some() {
            config.auth_token.clone_from(&self.auth_token);
        }

        if let Some(secs) = self.request_timeout_secs {
            config.request_timeout = Duration::from_secs(secs);
        }
    }
}

// =============================================================================
// Tests
// =============================================================================
