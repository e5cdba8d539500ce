//! Single entry point bundling the REST calls and the chat session.
//!
//! # Example
//!
//! ```rust,ignore
//! use hume_evi_client::{HumeClient, OutboundFrame};
//!
//! let client = HumeClient::new("your-api-key")?;
//! let configs = client.list_configs(None, Some(10)).await?;
//!
//! client.start_voice_chat(&configs.configs_page[0].id, None).await?;
//! client.send(OutboundFrame::user_input("Hello!")?).await?;
//! client.stop_voice_chat().await?;
//! ```

use serde_json::{Map, Value};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::config::ClientConfig;
use crate::core::evi::{
    EviError, EviResult, EviSession, OutboundFrame, SessionHandler, StreamTarget,
};
use crate::core::rest::{ChatsPage, ConfigsPage, RestClient};

/// Client for the EVI API.
///
/// Holds one REST client and one [`EviSession`]; at most one voice chat can
/// be live per `HumeClient`.
#[derive(Debug)]
pub struct HumeClient {
    config: ClientConfig,
    rest: RestClient,
    session: EviSession,
}

impl HumeClient {
    /// Create a client with default settings.
    pub fn new(api_key: impl Into<String>) -> EviResult<Self> {
        Self::from_config(ClientConfig::new(api_key))
    }

    pub fn from_config(config: ClientConfig) -> EviResult<Self> {
        config
            .validate()
            .map_err(|e| EviError::InvalidConfiguration(e.to_string()))?;

        let rest = RestClient::from_config(&config)?;
        let session = EviSession::new(config.session_config())?;

        Ok(Self {
            config,
            rest,
            session,
        })
    }

    /// Point REST calls and future sessions at another base address.
    pub fn with_base_url(self, base_url: impl Into<String>) -> EviResult<Self> {
        let config = ClientConfig {
            base_url: base_url.into(),
            ..self.config
        };
        Self::from_config(config)
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// The underlying session manager.
    pub fn session(&self) -> &EviSession {
        &self.session
    }

    pub async fn list_configs(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
    ) -> EviResult<ConfigsPage> {
        self.rest.list_configs(page_number, page_size).await
    }

    pub async fn list_chats(
        &self,
        page_number: Option<u32>,
        page_size: Option<u32>,
        ascending_order: Option<bool>,
    ) -> EviResult<ChatsPage> {
        self.rest
            .list_chats(page_number, page_size, ascending_order)
            .await
    }

    /// Start a voice chat against a saved configuration.
    pub async fn start_voice_chat(
        &self,
        config_id: &str,
        handler: Option<Arc<dyn SessionHandler>>,
    ) -> EviResult<()> {
        self.session
            .start(StreamTarget::config(config_id), handler)
            .await
    }

    /// Start a voice chat that also ends when `cancel` fires.
    pub async fn start_voice_chat_with_cancellation(
        &self,
        config_id: &str,
        handler: Option<Arc<dyn SessionHandler>>,
        cancel: CancellationToken,
    ) -> EviResult<()> {
        self.session
            .start_with_cancellation(StreamTarget::config(config_id), handler, cancel)
            .await
    }

    pub async fn send(&self, frame: OutboundFrame) -> EviResult<()> {
        self.session.send(frame).await
    }

    /// Send a free-form JSON object, e.g. `{"type": "audio_input", "data": ...}`.
    pub async fn send_audio_data(&self, message: Map<String, Value>) -> EviResult<()> {
        if let Some(message_type) = message.get("type").and_then(Value::as_str) {
            debug!("Sending message type: {message_type}");
        }
        self.session.send(OutboundFrame::Json(Value::Object(message))).await
    }

    /// End the voice chat, if any.
    pub async fn stop_voice_chat(&self) -> EviResult<()> {
        self.session.stop().await
    }
}
