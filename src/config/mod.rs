//! Client configuration.
//!
//! Settings come from a YAML file, environment variables, and built-in
//! defaults. Priority: YAML > ENV vars > defaults. The CLI loads a `.env`
//! file into the environment before reading it.
//!
//! # Environment variables
//! - `HUME_API_KEY` (required)
//! - `HUME_BASE_URL`
//! - `HUME_AUTH_SCHEME`: `api_key`, `bearer` or `both`
//! - `HUME_HANDSHAKE_TIMEOUT_SECONDS`
//! - `HUME_REQUEST_TIMEOUT_SECONDS`
//! - `HUME_UNKNOWN_FRAMES`: `drop` or `forward`
//! - `HUME_CONFIG_ID`
//!
//! # Example
//! ```rust,no_run
//! use hume_evi_client::config::ClientConfig;
//! use std::path::Path;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! // Load from environment variables only
//! let config = ClientConfig::from_env()?;
//!
//! // Load from YAML file with environment variables filling the gaps
//! let config = ClientConfig::from_file(Path::new("hume.yaml"))?;
//! # Ok(())
//! # }
//! ```

use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;
use url::Url;

use crate::core::evi::{
    AuthScheme, DEFAULT_BASE_URL, DEFAULT_HANDSHAKE_TIMEOUT_SECONDS, EviSessionConfig,
    UnknownFramePolicy,
};

mod yaml;

pub use yaml::YamlConfig;

/// Default REST request timeout in seconds.
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 30;

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse YAML config: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: &'static str, message: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Settings for a [`HumeClient`](crate::client::HumeClient).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub api_key: String,
    pub base_url: String,
    pub auth_scheme: AuthScheme,
    pub handshake_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub unknown_frame_policy: UnknownFramePolicy,
    /// Default chat configuration, used by the CLI.
    pub config_id: Option<String>,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: DEFAULT_BASE_URL.to_string(),
            auth_scheme: AuthScheme::default(),
            handshake_timeout_seconds: DEFAULT_HANDSHAKE_TIMEOUT_SECONDS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            unknown_frame_policy: UnknownFramePolicy::default(),
            config_id: None,
        }
    }
}

impl ClientConfig {
    /// Create a configuration with defaults and the given API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::merge(YamlConfig::default())
    }

    /// Load configuration from a YAML file; environment variables fill in
    /// whatever the file leaves unset.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let yaml = YamlConfig::from_file(path)?;
        Self::merge(yaml)
    }

    fn merge(yaml: YamlConfig) -> Result<Self, ConfigError> {
        let defaults = Self::default();

        let config = Self {
            api_key: yaml
                .api_key
                .or_else(|| env_var("HUME_API_KEY"))
                .unwrap_or_default(),
            base_url: yaml
                .base_url
                .or_else(|| env_var("HUME_BASE_URL"))
                .unwrap_or(defaults.base_url),
            auth_scheme: match yaml.auth_scheme {
                Some(scheme) => scheme,
                None => parse_env("HUME_AUTH_SCHEME")?.unwrap_or(defaults.auth_scheme),
            },
            handshake_timeout_seconds: match yaml.handshake_timeout_seconds {
                Some(seconds) => seconds,
                None => parse_env("HUME_HANDSHAKE_TIMEOUT_SECONDS")?
                    .unwrap_or(defaults.handshake_timeout_seconds),
            },
            request_timeout_seconds: match yaml.request_timeout_seconds {
                Some(seconds) => seconds,
                None => parse_env("HUME_REQUEST_TIMEOUT_SECONDS")?
                    .unwrap_or(defaults.request_timeout_seconds),
            },
            unknown_frame_policy: match yaml.unknown_frames {
                Some(policy) => policy,
                None => parse_env("HUME_UNKNOWN_FRAMES")?.unwrap_or(defaults.unknown_frame_policy),
            },
            config_id: yaml.config_id.or_else(|| env_var("HUME_CONFIG_ID")),
        };

        config.validate()?;
        Ok(config)
    }

    /// Check that the configuration can be used to reach the API.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::Invalid(
                "API key is required (set HUME_API_KEY or api_key)".to_string(),
            ));
        }

        if self.handshake_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "handshake_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        if self.request_timeout_seconds == 0 {
            return Err(ConfigError::Invalid(
                "request_timeout_seconds must be greater than 0".to_string(),
            ));
        }

        let url = Url::parse(&self.base_url).map_err(|e| ConfigError::InvalidValue {
            key: "base_url",
            message: e.to_string(),
        })?;
        if !matches!(url.scheme(), "http" | "https" | "ws" | "wss") {
            return Err(ConfigError::InvalidValue {
                key: "base_url",
                message: format!("unsupported scheme '{}'", url.scheme()),
            });
        }

        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds)
    }

    /// Session settings derived from this configuration.
    pub fn session_config(&self) -> EviSessionConfig {
        EviSessionConfig {
            api_key: self.api_key.clone(),
            base_url: self.base_url.clone(),
            auth_scheme: self.auth_scheme,
            handshake_timeout_seconds: self.handshake_timeout_seconds,
            unknown_frame_policy: self.unknown_frame_policy,
        }
    }
}

/// Read a non-empty environment variable.
fn env_var(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_env<T>(key: &'static str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_var(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| ConfigError::InvalidValue {
                key,
                message: e.to_string(),
            })
        })
        .transpose()
}
