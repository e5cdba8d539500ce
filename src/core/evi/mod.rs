//! Empathic Voice Interface (EVI) streaming.
//!
//! One [`EviSession`] holds at most one live chat connection. Inbound frames
//! are classified by their `type` tag, decoded into [`EviResponse`] and handed
//! to a [`SessionHandler`]; outbound traffic is raw audio or JSON
//! ([`OutboundFrame`]).
//!
//! # Example
//!
//! ```rust,ignore
//! use hume_evi_client::core::evi::{
//!     EviResponse, EviSession, EviSessionConfig, SessionHandler, StreamTarget,
//! };
//! use std::sync::Arc;
//!
//! struct Printer;
//!
//! #[async_trait::async_trait]
//! impl SessionHandler for Printer {
//!     async fn on_response(&self, response: EviResponse) {
//!         if let EviResponse::AssistantMessage(msg) = response {
//!             println!("assistant: {}", msg.message.content);
//!         }
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let session = EviSession::new(EviSessionConfig::new("your-api-key"))?;
//!     session
//!         .start(StreamTarget::config("your-config-id"), Some(Arc::new(Printer)))
//!         .await?;
//!
//!     // 100ms of 16kHz mono silence
//!     session.send_audio(vec![0u8; 3200]).await?;
//!     session.stop().await?;
//!     Ok(())
//! }
//! ```

mod base;
mod config;
mod messages;
mod session;

pub use base::{
    CallbackHandler, ConnectCallback, ConnectionState, DisconnectCallback, DisconnectReason,
    EviError, EviResult, NoopHandler, ResponseCallback, SessionHandler,
};
pub use config::{
    API_KEY_HEADER, AudioStreamParams, AuthScheme, DEFAULT_BASE_URL,
    DEFAULT_HANDSHAKE_TIMEOUT_SECONDS, EviSessionConfig, StreamTarget, UnknownFramePolicy,
};
pub use messages::{
    AssistantEnd, AssistantMessage, AudioEncoding, AudioInput, AudioOutput, AudioSettings,
    ChatMessage, ChatMetadata, Empty, ErrorMessage, EviClientMessage, EviResponse, OutboundFrame,
    SessionSettings, TextInput, UserMessage, decode_response, peek_type,
};
pub use session::EviSession;
