use serde::Deserialize;
use std::path::Path;

use super::ConfigError;
use crate::core::evi::{AuthScheme, UnknownFramePolicy};

/// Client configuration as read from a YAML file.
///
/// Every field is optional; anything left out is taken from the environment
/// and then from built-in defaults.
///
/// # Example YAML structure
/// ```yaml
/// api_key: "your-api-key"
/// base_url: "https://api.hume.ai/v0"
/// auth_scheme: "api_key"        # api_key | bearer | both
/// handshake_timeout_seconds: 15
/// request_timeout_seconds: 30
/// unknown_frames: "drop"        # drop | forward
/// config_id: "your-config-id"
/// ```
#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
pub struct YamlConfig {
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub auth_scheme: Option<AuthScheme>,
    pub handshake_timeout_seconds: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
    pub unknown_frames: Option<UnknownFramePolicy>,
    /// Default chat configuration for the CLI.
    pub config_id: Option<String>,
}

impl YamlConfig {
    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or the YAML is malformed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;

        let config: YamlConfig = serde_yaml::from_str(&contents)?;

        Ok(config)
    }
}
