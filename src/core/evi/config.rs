//! EVI session configuration.
//!
//! # Example
//!
//! ```rust,ignore
//! use hume_evi_client::core::evi::{EviSessionConfig, StreamTarget};
//!
//! let config = EviSessionConfig::new("your-api-key")
//!     .with_handshake_timeout_seconds(10);
//! let url = config.build_websocket_url(&StreamTarget::config("cfg_123"))?;
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use url::Url;

use super::base::{EviError, EviResult};

// =============================================================================
// Constants
// =============================================================================

/// Production REST base address. The WebSocket address is derived from it.
pub const DEFAULT_BASE_URL: &str = "https://api.hume.ai/v0";

/// Default WebSocket handshake timeout in seconds.
pub const DEFAULT_HANDSHAKE_TIMEOUT_SECONDS: u64 = 15;

/// API key header.
pub const API_KEY_HEADER: &str = "X-Hume-Api-Key";

/// Path of the chat endpoint, relative to the base address.
const CHAT_PATH: [&str; 2] = ["evi", "chat"];

// =============================================================================
// Auth Scheme
// =============================================================================

/// How the API key is presented to the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuthScheme {
    /// `X-Hume-Api-Key: <key>`.
    #[default]
    ApiKey,
    /// `Authorization: Bearer <key>`.
    Bearer,
    /// Both headers.
    Both,
}

impl AuthScheme {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthScheme::ApiKey => "api_key",
            AuthScheme::Bearer => "bearer",
            AuthScheme::Both => "both",
        }
    }

    /// Header name/value pairs carrying `api_key` under this scheme.
    pub fn headers(&self, api_key: &str) -> Vec<(&'static str, String)> {
        let api_key_header = (API_KEY_HEADER, api_key.to_string());
        let bearer_header = ("Authorization", format!("Bearer {api_key}"));
        match self {
            AuthScheme::ApiKey => vec![api_key_header],
            AuthScheme::Bearer => vec![bearer_header],
            AuthScheme::Both => vec![api_key_header, bearer_header],
        }
    }
}

impl fmt::Display for AuthScheme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for AuthScheme {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "api_key" | "apikey" | "api-key" => Ok(AuthScheme::ApiKey),
            "bearer" => Ok(AuthScheme::Bearer),
            "both" => Ok(AuthScheme::Both),
            other => Err(format!(
                "unknown auth scheme '{other}' (expected api_key, bearer or both)"
            )),
        }
    }
}

// =============================================================================
// Unknown Frame Policy
// =============================================================================

/// What the receive loop does with a frame whose `type` it does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownFramePolicy {
    /// Log and discard.
    #[default]
    Drop,
    /// Deliver as [`EviResponse::Unknown`](super::EviResponse::Unknown).
    Forward,
}

impl FromStr for UnknownFramePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "drop" => Ok(UnknownFramePolicy::Drop),
            "forward" => Ok(UnknownFramePolicy::Forward),
            other => Err(format!(
                "unknown frame policy '{other}' (expected drop or forward)"
            )),
        }
    }
}

// =============================================================================
// Stream Target
// =============================================================================

/// Explicit audio stream parameters for deployments that select the stream
/// by format instead of by configuration id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AudioStreamParams {
    pub sample_rate: u32,
    pub channels: u16,
    pub bits_per_sample: u16,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub language: Option<String>,
}

impl Default for AudioStreamParams {
    fn default() -> Self {
        Self {
            sample_rate: 16000,
            channels: 1,
            bits_per_sample: 16,
            model: None,
            language: None,
        }
    }
}

impl AudioStreamParams {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = Some(language.into());
        self
    }
}

/// Which stream a session connects to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamTarget {
    /// A configuration created in the dashboard.
    Config { config_id: String },
    /// Explicit stream parameters.
    Audio(AudioStreamParams),
}

impl StreamTarget {
    pub fn config(config_id: impl Into<String>) -> Self {
        StreamTarget::Config {
            config_id: config_id.into(),
        }
    }

    fn query_pairs(&self) -> Vec<(&'static str, String)> {
        match self {
            StreamTarget::Config { config_id } => vec![("config_id", config_id.clone())],
            StreamTarget::Audio(params) => {
                let mut pairs = vec![
                    ("sample_rate", params.sample_rate.to_string()),
                    ("channels", params.channels.to_string()),
                    ("bits_per_sample", params.bits_per_sample.to_string()),
                ];
                if let Some(model) = &params.model {
                    pairs.push(("model", model.clone()));
                }
                if let Some(language) = &params.language {
                    pairs.push(("language", language.clone()));
                }
                pairs
            }
        }
    }
}

// =============================================================================
// Session Configuration
// =============================================================================

/// Settings shared by every session opened from one client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EviSessionConfig {
    pub api_key: String,

    /// REST base address; `https` becomes `wss` for the chat socket.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default)]
    pub auth_scheme: AuthScheme,

    #[serde(default = "default_handshake_timeout")]
    pub handshake_timeout_seconds: u64,

    #[serde(default)]
    pub unknown_frame_policy: UnknownFramePolicy,
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_handshake_timeout() -> u64 {
    DEFAULT_HANDSHAKE_TIMEOUT_SECONDS
}

impl Default for EviSessionConfig {
    fn default() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_base_url(),
            auth_scheme: AuthScheme::default(),
            handshake_timeout_seconds: DEFAULT_HANDSHAKE_TIMEOUT_SECONDS,
            unknown_frame_policy: UnknownFramePolicy::default(),
        }
    }
}

impl EviSessionConfig {
    /// Create a new configuration with an API key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            ..Default::default()
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_auth_scheme(mut self, scheme: AuthScheme) -> Self {
        self.auth_scheme = scheme;
        self
    }

    pub fn with_handshake_timeout_seconds(mut self, seconds: u64) -> Self {
        self.handshake_timeout_seconds = seconds;
        self
    }

    pub fn with_unknown_frame_policy(mut self, policy: UnknownFramePolicy) -> Self {
        self.unknown_frame_policy = policy;
        self
    }

    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_secs(self.handshake_timeout_seconds)
    }

    /// Build the chat WebSocket URL for `target`.
    ///
    /// `https` maps to `wss` and `http` to `ws`; `ws`/`wss` bases are used
    /// as-is. Any query string on the base address is replaced.
    pub fn build_websocket_url(&self, target: &StreamTarget) -> EviResult<Url> {
        let mut url = Url::parse(&self.base_url)?;

        let scheme = match url.scheme() {
            "https" | "wss" => "wss",
            "http" | "ws" => "ws",
            other => {
                return Err(EviError::InvalidUrl(format!(
                    "unsupported scheme '{other}' in base URL"
                )));
            }
        };
        url.set_scheme(scheme)
            .map_err(|_| EviError::InvalidUrl(format!("cannot use scheme '{scheme}'")))?;

        url.path_segments_mut()
            .map_err(|_| EviError::InvalidUrl("base URL cannot have a path".to_string()))?
            .pop_if_empty()
            .extend(CHAT_PATH);

        url.set_query(None);
        url.query_pairs_mut().extend_pairs(target.query_pairs());

        Ok(url)
    }

    /// Validate the configuration.
    pub fn validate(&self) -> EviResult<()> {
        if self.api_key.trim().is_empty() {
            return Err(EviError::InvalidConfiguration(
                "API key is required".to_string(),
            ));
        }

        if self.handshake_timeout_seconds == 0 {
            return Err(EviError::InvalidConfiguration(
                "Handshake timeout must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_default() {
        let config = EviSessionConfig::default();
        assert!(config.api_key.is_empty());
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.auth_scheme, AuthScheme::ApiKey);
        assert_eq!(config.handshake_timeout(), Duration::from_secs(15));
        assert_eq!(config.unknown_frame_policy, UnknownFramePolicy::Drop);
    }

    #[test]
    fn test_config_builder() {
        let config = EviSessionConfig::new("test-key")
            .with_base_url("http://localhost:9000/v0")
            .with_auth_scheme(AuthScheme::Both)
            .with_handshake_timeout_seconds(5)
            .with_unknown_frame_policy(UnknownFramePolicy::Forward);

        assert_eq!(config.api_key, "test-key");
        assert_eq!(config.base_url, "http://localhost:9000/v0");
        assert_eq!(config.auth_scheme, AuthScheme::Both);
        assert_eq!(config.handshake_timeout_seconds, 5);
        assert_eq!(config.unknown_frame_policy, UnknownFramePolicy::Forward);
    }

    #[test]
    fn test_build_websocket_url_with_config_id() {
        let config = EviSessionConfig::new("test-key");
        let url = config
            .build_websocket_url(&StreamTarget::config("cfg_abc"))
            .unwrap();

        assert_eq!(url.as_str(), "wss://api.hume.ai/v0/evi/chat?config_id=cfg_abc");
    }

    #[test]
    fn test_build_websocket_url_never_carries_api_key() {
        let config = EviSessionConfig::new("secret-key");
        let url = config
            .build_websocket_url(&StreamTarget::config("cfg"))
            .unwrap();
        assert!(!url.as_str().contains("secret-key"));
    }

    #[test]
    fn test_build_websocket_url_http_and_trailing_slash() {
        let config = EviSessionConfig::new("k").with_base_url("http://127.0.0.1:8080/v0/");
        let url = config
            .build_websocket_url(&StreamTarget::config("a b&c"))
            .unwrap();

        assert_eq!(url.scheme(), "ws");
        assert_eq!(url.path(), "/v0/evi/chat");
        assert_eq!(url.query(), Some("config_id=a+b%26c"));
    }

    #[test]
    fn test_build_websocket_url_with_audio_params() {
        let config = EviSessionConfig::new("k");
        let params = AudioStreamParams::default()
            .with_model("evi-3")
            .with_language("en");
        let url = config
            .build_websocket_url(&StreamTarget::Audio(params))
            .unwrap();

        assert_eq!(
            url.query(),
            Some("sample_rate=16000&channels=1&bits_per_sample=16&model=evi-3&language=en")
        );
    }

    #[test]
    fn test_build_websocket_url_rejects_bad_base() {
        let config = EviSessionConfig::new("k").with_base_url("ftp://example.com");
        let err = config
            .build_websocket_url(&StreamTarget::config("c"))
            .unwrap_err();
        assert!(matches!(err, EviError::InvalidUrl(_)));

        let config = EviSessionConfig::new("k").with_base_url("not a url");
        assert!(matches!(
            config.build_websocket_url(&StreamTarget::config("c")),
            Err(EviError::InvalidUrl(_))
        ));
    }

    #[test]
    fn test_auth_scheme_headers() {
        assert_eq!(
            AuthScheme::ApiKey.headers("k"),
            vec![("X-Hume-Api-Key", "k".to_string())]
        );
        assert_eq!(
            AuthScheme::Bearer.headers("k"),
            vec![("Authorization", "Bearer k".to_string())]
        );
        assert_eq!(AuthScheme::Both.headers("k").len(), 2);
    }

    #[test]
    fn test_auth_scheme_from_str() {
        assert_eq!("Bearer".parse::<AuthScheme>().unwrap(), AuthScheme::Bearer);
        assert_eq!("api-key".parse::<AuthScheme>().unwrap(), AuthScheme::ApiKey);
        assert_eq!("both".parse::<AuthScheme>().unwrap(), AuthScheme::Both);
        assert!("basic".parse::<AuthScheme>().is_err());
    }

    #[test]
    fn test_unknown_frame_policy_from_str() {
        assert_eq!(
            "forward".parse::<UnknownFramePolicy>().unwrap(),
            UnknownFramePolicy::Forward
        );
        assert_eq!(
            "DROP".parse::<UnknownFramePolicy>().unwrap(),
            UnknownFramePolicy::Drop
        );
        assert!("keep".parse::<UnknownFramePolicy>().is_err());
    }

    #[test]
    fn test_validate() {
        assert!(EviSessionConfig::default().validate().is_err());
        assert!(
            EviSessionConfig::new("k")
                .with_handshake_timeout_seconds(0)
                .validate()
                .is_err()
        );
        assert!(EviSessionConfig::new("k").validate().is_ok());
    }

    #[test]
    fn test_config_deserialization() {
        let json = r#"{"api_key": "my-key", "auth_scheme": "bearer"}"#;
        let config: EviSessionConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.api_key, "my-key");
        assert_eq!(config.auth_scheme, AuthScheme::Bearer);
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.handshake_timeout_seconds, 15);
    }
}
