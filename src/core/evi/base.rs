//! Base types for the EVI streaming session.
//!
//! Holds the error taxonomy, the connection state, the disconnect reason
//! reported to handlers, and the [`SessionHandler`] capability set.

use async_trait::async_trait;
use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use thiserror::Error;

use super::messages::EviResponse;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while talking to EVI.
#[derive(Debug, Error)]
pub enum EviError {
    /// Dialing or handshaking the WebSocket failed.
    ///
    /// `status` and `body` carry the HTTP upgrade response when the server
    /// rejected the handshake.
    #[error("Connection failed: {message}")]
    ConnectionFailed {
        message: String,
        status: Option<u16>,
        body: Option<String>,
    },

    /// `start` was called while a session is live.
    #[error("Voice chat session already active")]
    AlreadyActive,

    /// An operation needed a live session and there is none.
    #[error("Not connected")]
    NotConnected,

    /// An inbound frame could not be decoded.
    #[error("Decode error: {0}")]
    Decode(String),

    /// Read or write failure on an established connection.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Non-success REST response.
    #[error("HTTP {status}: {body}")]
    Http { status: u16, body: String },

    /// REST request failed before a status was received.
    #[error("Request failed: {0}")]
    Request(String),

    /// URL could not be built from the configured base address.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// Operation timed out.
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Outbound payload could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfiguration(String),
}

/// Result type for EVI operations.
pub type EviResult<T> = Result<T, EviError>;

impl From<serde_json::Error> for EviError {
    fn from(e: serde_json::Error) -> Self {
        EviError::Serialization(e.to_string())
    }
}

impl From<url::ParseError> for EviError {
    fn from(e: url::ParseError) -> Self {
        EviError::InvalidUrl(e.to_string())
    }
}

// =============================================================================
// Connection State
// =============================================================================

/// Lifecycle state of an [`EviSession`](super::EviSession).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection.
    #[default]
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Connected; the receive loop is running.
    Connected,
    /// The last handshake failed.
    Failed,
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConnectionState::Disconnected => write!(f, "Disconnected"),
            ConnectionState::Connecting => write!(f, "Connecting"),
            ConnectionState::Connected => write!(f, "Connected"),
            ConnectionState::Failed => write!(f, "Failed"),
        }
    }
}

/// Why a session ended. Passed to [`SessionHandler::on_disconnect`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DisconnectReason {
    /// `stop` was called locally.
    Stopped,
    /// The caller's cancellation token fired.
    Cancelled,
    /// The peer closed the connection (or the stream ended).
    Closed {
        code: Option<u16>,
        reason: Option<String>,
    },
    /// Reading from the connection failed.
    Transport(String),
}

impl fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DisconnectReason::Stopped => write!(f, "stopped"),
            DisconnectReason::Cancelled => write!(f, "cancelled"),
            DisconnectReason::Closed { code, reason } => match (code, reason) {
                (Some(code), Some(reason)) if !reason.is_empty() => {
                    write!(f, "closed by peer ({code}: {reason})")
                }
                (Some(code), _) => write!(f, "closed by peer ({code})"),
                _ => write!(f, "closed by peer"),
            },
            DisconnectReason::Transport(e) => write!(f, "transport error: {e}"),
        }
    }
}

// =============================================================================
// Handler
// =============================================================================

/// Callbacks invoked by a running session.
///
/// Every method defaults to a no-op, so implementors override only what they
/// need. `on_disconnect` is called exactly once per session.
#[async_trait]
pub trait SessionHandler: Send + Sync {
    /// The handshake completed.
    async fn on_connect(&self) {}

    /// The session ended.
    async fn on_disconnect(&self, _reason: DisconnectReason) {}

    /// A frame was decoded.
    async fn on_response(&self, _response: EviResponse) {}
}

/// Handler that ignores every event.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopHandler;

#[async_trait]
impl SessionHandler for NoopHandler {}

/// Callback type for connect events.
pub type ConnectCallback = Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for disconnect events.
pub type DisconnectCallback =
    Arc<dyn Fn(DisconnectReason) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// Callback type for decoded responses.
pub type ResponseCallback =
    Arc<dyn Fn(EviResponse) -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

/// [`SessionHandler`] assembled from individual callbacks.
///
/// ```rust,ignore
/// let handler = CallbackHandler::new()
///     .with_on_response(Arc::new(|resp| Box::pin(async move {
///         println!("{}", resp.message_type());
///     })));
/// ```
#[derive(Clone, Default)]
pub struct CallbackHandler {
    connect: Option<ConnectCallback>,
    disconnect: Option<DisconnectCallback>,
    response: Option<ResponseCallback>,
}

impl CallbackHandler {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_on_connect(mut self, callback: ConnectCallback) -> Self {
        self.connect = Some(callback);
        self
    }

    pub fn with_on_disconnect(mut self, callback: DisconnectCallback) -> Self {
        self.disconnect = Some(callback);
        self
    }

    pub fn with_on_response(mut self, callback: ResponseCallback) -> Self {
        self.response = Some(callback);
        self
    }
}

impl fmt::Debug for CallbackHandler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CallbackHandler")
            .field("connect", &self.connect.is_some())
            .field("disconnect", &self.disconnect.is_some())
            .field("response", &self.response.is_some())
            .finish()
    }
}

#[async_trait]
impl SessionHandler for CallbackHandler {
    async fn on_connect(&self) {
        if let Some(cb) = &self.connect {
            cb().await;
        }
    }

    async fn on_disconnect(&self, reason: DisconnectReason) {
        if let Some(cb) = &self.disconnect {
            cb(reason).await;
        }
    }

    async fn on_response(&self, response: EviResponse) {
        if let Some(cb) = &self.response {
            cb(response).await;
        }
    }
}
