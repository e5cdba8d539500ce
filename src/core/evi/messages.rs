//! EVI WebSocket message types.
//!
//! # Message Flow
//!
//! ```text
//! Client → Server:
//!   - raw audio (binary frame)
//!   - AudioInput (base64-encoded audio chunk)
//!   - UserInput / AssistantInput (text)
//!   - SessionSettings
//!   - PauseAssistantMessage / ResumeAssistantMessage
//!
//! Server → Client:
//!   - ChatMetadata (on connection)
//!   - UserMessage (transcription)
//!   - AssistantMessage (response text)
//!   - AudioOutput (response audio)
//!   - AssistantEnd (response complete)
//!   - Error
//! ```
//!
//! Inbound frames are discriminated solely by their top-level `type` string.
//! [`decode_response`] peeks at that tag first and only then decodes the
//! matching variant, so a frame with an unrecognised tag never fails decoding.

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use bytes::Bytes;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;

use super::base::{EviError, EviResult};

// =============================================================================
// Constants
// =============================================================================

/// `type` tag of [`ChatMetadata`].
pub const CHAT_METADATA: &str = "chat_metadata";
/// `type` tag of [`AssistantMessage`].
pub const ASSISTANT_MESSAGE: &str = "assistant_message";
/// `type` tag of [`AssistantEnd`].
pub const ASSISTANT_END: &str = "assistant_end";
/// `type` tag of [`AudioOutput`].
pub const AUDIO_OUTPUT: &str = "audio_output";
/// `type` tag of [`UserMessage`].
pub const USER_MESSAGE: &str = "user_message";
/// `type` tag of [`ErrorMessage`].
pub const ERROR: &str = "error";

// =============================================================================
// Client → Server Messages
// =============================================================================

/// Typed messages sent from client to the EVI server.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EviClientMessage {
    /// Base64-encoded audio chunk.
    AudioInput(AudioInput),
    /// Text spoken "as the user".
    UserInput(TextInput),
    /// Text the assistant should speak verbatim.
    AssistantInput(TextInput),
    /// Session configuration update.
    SessionSettings(SessionSettings),
    /// Pause assistant responses.
    PauseAssistantMessage(Empty),
    /// Resume assistant responses.
    ResumeAssistantMessage(Empty),
}

impl EviClientMessage {
    /// Wire `type` tag of this message.
    pub fn message_type(&self) -> &'static str {
        match self {
            EviClientMessage::AudioInput(_) => "audio_input",
            EviClientMessage::UserInput(_) => "user_input",
            EviClientMessage::AssistantInput(_) => "assistant_input",
            EviClientMessage::SessionSettings(_) => "session_settings",
            EviClientMessage::PauseAssistantMessage(_) => "pause_assistant_message",
            EviClientMessage::ResumeAssistantMessage(_) => "resume_assistant_message",
        }
    }
}

/// Audio input message containing base64-encoded audio.
#[derive(Debug, Clone, Serialize)]
pub struct AudioInput {
    /// Base64-encoded audio data.
    pub data: String,
}

impl AudioInput {
    /// Create new AudioInput from raw audio bytes.
    pub fn from_bytes(audio_data: &[u8]) -> Self {
        Self {
            data: BASE64.encode(audio_data),
        }
    }
}

/// Text input message.
#[derive(Debug, Clone, Serialize)]
pub struct TextInput {
    pub text: String,
}

/// Message without a body beyond its tag.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Empty {}

/// Session settings sent after connecting.
#[derive(Debug, Clone, Default, Serialize)]
pub struct SessionSettings {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub custom_session_id: Option<String>,
    /// System prompt override.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub system_prompt: Option<String>,
    /// Input audio format.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<AudioSettings>,
    /// Values for `{{placeholders}}` in the configured prompt.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variables: Option<HashMap<String, String>>,
}

/// Audio format settings.
#[derive(Debug, Clone, Serialize)]
pub struct AudioSettings {
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub channels: u16,
}

/// Supported audio encodings for EVI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// Linear 16-bit PCM, little-endian.
    #[default]
    Linear16,
    /// WebM container format.
    Webm,
}

// =============================================================================
// Outbound Frames
// =============================================================================

/// A frame written to the session.
#[derive(Debug, Clone, PartialEq)]
pub enum OutboundFrame {
    /// Raw audio, written as a binary frame.
    Binary(Bytes),
    /// Arbitrary JSON, written as a text frame.
    Json(Value),
}

impl OutboundFrame {
    /// Encode a typed client message as a JSON frame.
    pub fn from_message(message: &EviClientMessage) -> EviResult<Self> {
        Ok(OutboundFrame::Json(serde_json::to_value(message)?))
    }

    /// `audio_input` frame carrying `audio` as base64.
    pub fn audio_input(audio: &[u8]) -> EviResult<Self> {
        Self::from_message(&EviClientMessage::AudioInput(AudioInput::from_bytes(audio)))
    }

    pub fn user_input(text: impl Into<String>) -> EviResult<Self> {
        Self::from_message(&EviClientMessage::UserInput(TextInput { text: text.into() }))
    }

    pub fn assistant_input(text: impl Into<String>) -> EviResult<Self> {
        Self::from_message(&EviClientMessage::AssistantInput(TextInput {
            text: text.into(),
        }))
    }

    pub fn session_settings(settings: SessionSettings) -> EviResult<Self> {
        Self::from_message(&EviClientMessage::SessionSettings(settings))
    }

    pub fn pause_assistant_message() -> EviResult<Self> {
        Self::from_message(&EviClientMessage::PauseAssistantMessage(Empty {}))
    }

    pub fn resume_assistant_message() -> EviResult<Self> {
        Self::from_message(&EviClientMessage::ResumeAssistantMessage(Empty {}))
    }
}

impl From<Bytes> for OutboundFrame {
    fn from(data: Bytes) -> Self {
        OutboundFrame::Binary(data)
    }
}

impl From<Vec<u8>> for OutboundFrame {
    fn from(data: Vec<u8>) -> Self {
        OutboundFrame::Binary(Bytes::from(data))
    }
}

impl From<Value> for OutboundFrame {
    fn from(value: Value) -> Self {
        OutboundFrame::Json(value)
    }
}

// =============================================================================
// Server → Client Messages
// =============================================================================

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum EviResponse {
    ChatMetadata(ChatMetadata),
    AssistantMessage(AssistantMessage),
    AssistantEnd(AssistantEnd),
    AudioOutput(AudioOutput),
    UserMessage(UserMessage),
    Error(ErrorMessage),
    /// Frame with an unrecognised `type`. Only delivered when the session is
    /// configured to forward unknown frames.
    Unknown { message_type: String, raw: Value },
}

impl EviResponse {
    /// The `type` discriminant this response was decoded from.
    pub fn message_type(&self) -> &str {
        match self {
            EviResponse::ChatMetadata(_) => CHAT_METADATA,
            EviResponse::AssistantMessage(_) => ASSISTANT_MESSAGE,
            EviResponse::AssistantEnd(_) => ASSISTANT_END,
            EviResponse::AudioOutput(_) => AUDIO_OUTPUT,
            EviResponse::UserMessage(_) => USER_MESSAGE,
            EviResponse::Error(_) => ERROR,
            EviResponse::Unknown { message_type, .. } => message_type,
        }
    }
}

/// Chat metadata received on WebSocket connection.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMetadata {
    /// Chat group ID for resuming conversations.
    pub chat_group_id: String,
    /// Chat ID for this session.
    pub chat_id: String,
    #[serde(default)]
    pub request_id: Option<String>,
}

/// A role/content pair.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

/// Assistant message (response text).
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AssistantMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub message: ChatMessage,
    /// Whether the message came from an `assistant_input` rather than the model.
    #[serde(default)]
    pub from_text: bool,
}

/// End of assistant response.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct AssistantEnd {
    #[serde(default)]
    pub custom_session_id: Option<String>,
}

/// Audio output chunk from assistant.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct AudioOutput {
    pub id: String,
    #[serde(default)]
    pub index: u64,
    /// Base64-encoded audio data.
    pub data: String,
    #[serde(default)]
    pub custom_session_id: Option<String>,
}

impl AudioOutput {
    /// Decode the audio data to bytes.
    pub fn decode_audio(&self) -> Result<Vec<u8>, base64::DecodeError> {
        BASE64.decode(&self.data)
    }
}

/// Transcription of user speech.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct UserMessage {
    #[serde(default)]
    pub id: Option<String>,
    pub message: ChatMessage,
    /// Whether this is an interim transcript.
    #[serde(default)]
    pub interim: bool,
    #[serde(default)]
    pub from_text: bool,
}

/// Server-reported error.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct ErrorMessage {
    pub code: String,
    #[serde(default)]
    pub slug: Option<String>,
    pub message: String,
}

// =============================================================================
// Decoding
// =============================================================================

#[derive(Deserialize)]
struct FrameHeader {
    #[serde(rename = "type", default)]
    message_type: Option<String>,
}

/// Read only the `type` tag of a frame, ignoring every other field.
pub fn peek_type(text: &str) -> EviResult<String> {
    let header: FrameHeader = serde_json::from_str(text)
        .map_err(|e| EviError::Decode(format!("invalid frame: {e}")))?;
    header
        .message_type
        .ok_or_else(|| EviError::Decode("frame has no type".to_string()))
}

/// Decode an inbound text frame.
///
/// Known tags decode into their typed variant; a decode failure there is an
/// error. Any other tag yields [`EviResponse::Unknown`] with the raw JSON.
pub fn decode_response(text: &str) -> EviResult<EviResponse> {
    let tag = peek_type(text)?;

    let decoded = match tag.as_str() {
        CHAT_METADATA => serde_json::from_str(text).map(EviResponse::ChatMetadata),
        ASSISTANT_MESSAGE => serde_json::from_str(text).map(EviResponse::AssistantMessage),
        ASSISTANT_END => serde_json::from_str(text).map(EviResponse::AssistantEnd),
        AUDIO_OUTPUT => serde_json::from_str(text).map(EviResponse::AudioOutput),
        USER_MESSAGE => serde_json::from_str(text).map(EviResponse::UserMessage),
        ERROR => serde_json::from_str(text).map(EviResponse::Error),
        _ => serde_json::from_str(text).map(|raw| EviResponse::Unknown {
            message_type: tag.clone(),
            raw,
        }),
    };

    decoded.map_err(|e| EviError::Decode(format!("{tag}: {e}")))
}

// =============================================================================
// Tests
// =============================================================================
