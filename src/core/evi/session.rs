//! EVI streaming session.
//!
//! An [`EviSession`] owns at most one WebSocket connection at a time. `start`
//! dials and handshakes, stores the connection in its slot, calls
//! [`SessionHandler::on_connect`] and spawns the receive loop. The loop owns
//! the read half; the write half sits behind its own mutex so outbound frames
//! never interleave and the slot lock is never held across I/O.
//!
//! # Example
//!
//! ```rust,ignore
//! use hume_evi_client::core::evi::{EviSession, EviSessionConfig, OutboundFrame, StreamTarget};
//!
//! let session = EviSession::new(EviSessionConfig::new("your-api-key"))?;
//! session.start(StreamTarget::config("cfg_123"), None).await?;
//! session.send(OutboundFrame::user_input("Hello!")?).await?;
//! session.stop().await?;
//! ```

use bytes::Bytes;
use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use http::{HeaderName, HeaderValue};
use parking_lot::RwLock;
use serde::Serialize;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::client::IntoClientRequest;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, trace, warn};
use url::Url;

use super::base::{
    ConnectionState, DisconnectReason, EviError, EviResult, NoopHandler, SessionHandler,
};
use super::config::{EviSessionConfig, StreamTarget, UnknownFramePolicy};
use super::messages::{ChatMetadata, EviClientMessage, EviResponse, OutboundFrame, decode_response};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;
type WsSink = SplitSink<WsStream, Message>;
type WsSource = SplitStream<WsStream>;

/// Longest prefix of a frame written to trace logs.
const TRACE_PREVIEW_CHARS: usize = 100;

// =============================================================================
// Session State
// =============================================================================

/// The live connection held in the session slot.
struct ActiveSession {
    id: u64,
    writer: Arc<Mutex<WsSink>>,
    stop: CancellationToken,
}

/// State shared between the session handle and its receive task.
struct Shared {
    slot: Mutex<Option<ActiveSession>>,
    /// Serializes `start` calls; held across the handshake only.
    starting: Mutex<()>,
    state: RwLock<ConnectionState>,
    chat_metadata: RwLock<Option<ChatMetadata>>,
    next_id: AtomicU64,
}

/// A single-connection EVI chat session.
pub struct EviSession {
    config: EviSessionConfig,
    shared: Arc<Shared>,
}

impl std::fmt::Debug for EviSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EviSession")
            .field("base_url", &self.config.base_url)
            .field("state", &self.state())
            .finish()
    }
}

impl EviSession {
    /// Create a session manager. No connection is opened until `start`.
    pub fn new(config: EviSessionConfig) -> EviResult<Self> {
        config.validate()?;

        Ok(Self {
            config,
            shared: Arc::new(Shared {
                slot: Mutex::new(None),
                starting: Mutex::new(()),
                state: RwLock::new(ConnectionState::Disconnected),
                chat_metadata: RwLock::new(None),
                next_id: AtomicU64::new(1),
            }),
        })
    }

    pub fn config(&self) -> &EviSessionConfig {
        &self.config
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        *self.shared.state.read()
    }

    /// Whether a connection is live.
    pub fn is_active(&self) -> bool {
        self.state() == ConnectionState::Connected
    }

    /// The last `chat_metadata` frame received, if any.
    ///
    /// Survives `stop`, so its `chat_group_id` can be used to resume.
    pub fn chat_metadata(&self) -> Option<ChatMetadata> {
        self.shared.chat_metadata.read().clone()
    }

    /// Open a session to `target`.
    ///
    /// Returns once the handshake completes and `on_connect` has run; frames
    /// are then delivered to `handler` from a background task. Pass `None` to
    /// discard all events.
    pub async fn start(
        &self,
        target: StreamTarget,
        handler: Option<Arc<dyn SessionHandler>>,
    ) -> EviResult<()> {
        self.start_with_cancellation(target, handler, CancellationToken::new())
            .await
    }

    /// Like [`start`](Self::start), but the session also ends when `cancel`
    /// fires. A pending read is aborted immediately.
    pub async fn start_with_cancellation(
        &self,
        target: StreamTarget,
        handler: Option<Arc<dyn SessionHandler>>,
        cancel: CancellationToken,
    ) -> EviResult<()> {
        let handler: Arc<dyn SessionHandler> = handler.unwrap_or_else(|| Arc::new(NoopHandler));

        // A concurrent start in progress counts as an active session.
        let starting = self
            .shared
            .starting
            .try_lock()
            .map_err(|_| EviError::AlreadyActive)?;

        if self.shared.slot.lock().await.is_some() {
            return Err(EviError::AlreadyActive);
        }

        let url = self.config.build_websocket_url(&target)?;
        info!("Starting voice chat: {}", display_url(&url));

        *self.shared.state.write() = ConnectionState::Connecting;
        let ws_stream = match self.connect(&url).await {
            Ok(stream) => stream,
            Err(e) => {
                *self.shared.state.write() = ConnectionState::Failed;
                return Err(e);
            }
        };

        let (ws_write, ws_read) = ws_stream.split();
        let writer = Arc::new(Mutex::new(ws_write));
        let stop = CancellationToken::new();
        let id = self.shared.next_id.fetch_add(1, Ordering::Relaxed);

        *self.shared.slot.lock().await = Some(ActiveSession {
            id,
            writer: writer.clone(),
            stop: stop.clone(),
        });
        *self.shared.state.write() = ConnectionState::Connected;
        drop(starting);

        info!(session_id = id, "Voice chat connected");
        handler.on_connect().await;

        let receiver = Receiver {
            shared: self.shared.clone(),
            id,
            writer,
            stop,
            cancel,
            handler,
            unknown_frames: self.config.unknown_frame_policy,
        };
        tokio::spawn(receiver.run(ws_read));

        Ok(())
    }

    /// Dial and handshake with the configured credentials.
    async fn connect(&self, url: &Url) -> EviResult<WsStream> {
        let mut request = url
            .as_str()
            .into_client_request()
            .map_err(|e| EviError::InvalidUrl(e.to_string()))?;

        for (name, value) in self.config.auth_scheme.headers(&self.config.api_key) {
            let name = HeaderName::from_bytes(name.as_bytes())
                .map_err(|e| EviError::InvalidConfiguration(format!("header {name}: {e}")))?;
            let value = HeaderValue::from_str(&value).map_err(|_| {
                EviError::InvalidConfiguration("API key is not a valid header value".to_string())
            })?;
            request.headers_mut().insert(name, value);
        }

        let handshake_timeout = self.config.handshake_timeout();
        match timeout(handshake_timeout, connect_async(request)).await {
            Ok(Ok((stream, response))) => {
                debug!("Handshake complete (status: {})", response.status());
                Ok(stream)
            }
            Ok(Err(tungstenite::Error::Http(response))) => {
                let status = response.status().as_u16();
                let body = response
                    .body()
                    .as_deref()
                    .map(|b| String::from_utf8_lossy(b).into_owned());
                error!(
                    "WebSocket handshake rejected: status={status}, body={}",
                    body.as_deref().unwrap_or("")
                );
                Err(EviError::ConnectionFailed {
                    message: format!("handshake rejected with HTTP {status}"),
                    status: Some(status),
                    body,
                })
            }
            Ok(Err(e)) => {
                error!("WebSocket connection failed: {e}");
                Err(EviError::ConnectionFailed {
                    message: e.to_string(),
                    status: None,
                    body: None,
                })
            }
            Err(_) => Err(EviError::Timeout(format!(
                "handshake did not complete within {}s",
                handshake_timeout.as_secs()
            ))),
        }
    }

    /// Write one frame. Binary frames go out as-is, JSON as a text frame.
    pub async fn send(&self, frame: OutboundFrame) -> EviResult<()> {
        let writer = self
            .shared
            .slot
            .lock()
            .await
            .as_ref()
            .map(|session| session.writer.clone())
            .ok_or(EviError::NotConnected)?;

        let message = match frame {
            OutboundFrame::Binary(data) => {
                trace!("Sending binary frame: {} bytes", data.len());
                Message::Binary(data)
            }
            OutboundFrame::Json(value) => {
                let text = serde_json::to_string(&value)?;
                trace!("Sending EVI message: {}", preview(&text));
                Message::Text(text.into())
            }
        };

        writer
            .lock()
            .await
            .send(message)
            .await
            .map_err(|e| EviError::Transport(e.to_string()))
    }

    /// Send raw audio as a binary frame.
    pub async fn send_audio(&self, data: impl Into<Bytes>) -> EviResult<()> {
        self.send(OutboundFrame::Binary(data.into())).await
    }

    /// Serialize `value` and send it as a text frame.
    pub async fn send_json<T: Serialize + ?Sized>(&self, value: &T) -> EviResult<()> {
        self.send(OutboundFrame::Json(serde_json::to_value(value)?))
            .await
    }

    /// Send a typed client message.
    pub async fn send_message(&self, message: &EviClientMessage) -> EviResult<()> {
        debug!("Sending message type: {}", message.message_type());
        self.send(OutboundFrame::from_message(message)?).await
    }

    /// End the session. Calling this with no live session is a no-op.
    ///
    /// The close handshake is best effort: failures are logged, not returned.
    pub async fn stop(&self) -> EviResult<()> {
        let Some(session) = self.shared.slot.lock().await.take() else {
            return Ok(());
        };

        info!(session_id = session.id, "Stopping voice chat");
        *self.shared.state.write() = ConnectionState::Disconnected;
        session.stop.cancel();
        close_connection(&session.writer, session.id).await;

        Ok(())
    }
}

impl Drop for EviSession {
    /// Ends a live connection the same way `stop` does; the close frame is
    /// sent from a spawned task when a runtime is available.
    fn drop(&mut self) {
        // Only the receive loop can hold the slot here, and it is already
        // releasing its connection.
        let Ok(mut slot) = self.shared.slot.try_lock() else {
            return;
        };
        let Some(session) = slot.take() else {
            return;
        };
        drop(slot);

        info!(session_id = session.id, "Voice chat dropped while connected");
        *self.shared.state.write() = ConnectionState::Disconnected;
        session.stop.cancel();

        match tokio::runtime::Handle::try_current() {
            Ok(runtime) => {
                runtime.spawn(async move {
                    close_connection(&session.writer, session.id).await;
                });
            }
            Err(_) => warn!(
                session_id = session.id,
                "No runtime to send close frame on drop"
            ),
        }
    }
}

// =============================================================================
// Receive Loop
// =============================================================================

/// Everything the receive task needs, moved into it on spawn.
struct Receiver {
    shared: Arc<Shared>,
    id: u64,
    writer: Arc<Mutex<WsSink>>,
    stop: CancellationToken,
    cancel: CancellationToken,
    handler: Arc<dyn SessionHandler>,
    unknown_frames: UnknownFramePolicy,
}

impl Receiver {
    async fn run(self, mut read: WsSource) {
        let reason = loop {
            let next = tokio::select! {
                biased;
                _ = self.stop.cancelled() => break DisconnectReason::Stopped,
                _ = self.cancel.cancelled() => break DisconnectReason::Cancelled,
                next = read.next() => next,
            };

            match next {
                Some(Ok(Message::Text(text))) => self.dispatch(text.as_str()).await,
                Some(Ok(Message::Binary(data))) => match std::str::from_utf8(&data) {
                    Ok(text) => self.dispatch(text).await,
                    Err(_) => {
                        warn!(
                            session_id = self.id,
                            "Discarding non-UTF-8 binary frame ({} bytes)",
                            data.len()
                        );
                    }
                },
                Some(Ok(Message::Close(frame))) => {
                    info!(session_id = self.id, "WebSocket closed by peer: {:?}", frame);
                    break DisconnectReason::Closed {
                        code: frame.as_ref().map(|f| u16::from(f.code)),
                        reason: frame.map(|f| f.reason.as_str().to_string()),
                    };
                }
                Some(Ok(_)) => {}
                Some(Err(e)) => {
                    error!(session_id = self.id, "WebSocket read failed: {e}");
                    break DisconnectReason::Transport(e.to_string());
                }
                None => {
                    info!(session_id = self.id, "WebSocket stream ended");
                    break DisconnectReason::Closed {
                        code: None,
                        reason: None,
                    };
                }
            }
        };

        if reason != DisconnectReason::Stopped {
            self.release(&reason).await;
        }

        debug!(session_id = self.id, "Receive loop ended: {reason}");
        self.handler.on_disconnect(reason).await;
    }

    /// Clear the slot if it still holds this session, then close the socket.
    async fn release(&self, reason: &DisconnectReason) {
        let owned = {
            let mut slot = self.shared.slot.lock().await;
            match slot.as_ref() {
                Some(session) if session.id == self.id => slot.take().is_some(),
                _ => false,
            }
        };

        if owned {
            *self.shared.state.write() = ConnectionState::Disconnected;
        }

        match reason {
            DisconnectReason::Cancelled => close_connection(&self.writer, self.id).await,
            _ => {
                if let Err(e) = self.writer.lock().await.close().await {
                    debug!(session_id = self.id, "Closing sink: {e}");
                }
            }
        }
    }

    async fn dispatch(&self, text: &str) {
        trace!("Received EVI message: {}", preview(text));

        let response = match decode_response(text) {
            Ok(response) => response,
            Err(e) => {
                warn!(session_id = self.id, "Discarding frame: {e}");
                return;
            }
        };

        match &response {
            EviResponse::ChatMetadata(meta) => {
                info!(
                    "EVI chat metadata: chat_id={}, chat_group_id={}",
                    meta.chat_id, meta.chat_group_id
                );
                *self.shared.chat_metadata.write() = Some(meta.clone());
            }
            EviResponse::Error(err) => {
                warn!("EVI error: {} - {}", err.code, err.message);
            }
            EviResponse::Unknown { message_type, .. } => {
                if self.unknown_frames == UnknownFramePolicy::Drop {
                    debug!("Dropping frame with unknown type '{message_type}'");
                    return;
                }
            }
            _ => {}
        }

        self.handler.on_response(response).await;
    }
}

/// Best-effort normal closure followed by closing the sink.
async fn close_connection(writer: &Mutex<WsSink>, id: u64) {
    let mut sink = writer.lock().await;
    let close = Message::Close(Some(CloseFrame {
        code: CloseCode::Normal,
        reason: "".into(),
    }));
    if let Err(e) = sink.send(close).await {
        warn!(session_id = id, "Failed to send close frame: {e}");
    }
    if let Err(e) = sink.close().await {
        debug!(session_id = id, "Closing sink: {e}");
    }
}

/// URL without its query string, for logs.
fn display_url(url: &Url) -> String {
    let mut shown = url.clone();
    shown.set_query(None);
    shown.to_string()
}

fn preview(text: &str) -> String {
    text.chars().take(TRACE_PREVIEW_CHARS).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session() -> EviSession {
        EviSession::new(EviSessionConfig::new("test-key").with_base_url("http://127.0.0.1:9"))
            .unwrap()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let err = EviSession::new(EviSessionConfig::default()).unwrap_err();
        assert!(matches!(err, EviError::InvalidConfiguration(_)));
    }

    #[tokio::test]
    async fn test_initial_state() {
        let session = session();
        assert_eq!(session.state(), ConnectionState::Disconnected);
        assert!(!session.is_active());
        assert!(session.chat_metadata().is_none());
    }

    #[tokio::test]
    async fn test_send_without_session_is_not_connected() {
        let session = session();
        let err = session.send_audio(vec![0u8; 4]).await.unwrap_err();
        assert!(matches!(err, EviError::NotConnected));

        let err = session
            .send(OutboundFrame::user_input("hi").unwrap())
            .await
            .unwrap_err();
        assert!(matches!(err, EviError::NotConnected));
    }

    #[tokio::test]
    async fn test_stop_without_session_is_noop() {
        let session = session();
        assert!(session.stop().await.is_ok());
        assert!(session.stop().await.is_ok());
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_start_with_bad_base_url_is_invalid_url() {
        let session =
            EviSession::new(EviSessionConfig::new("k").with_base_url("ftp://example.com")).unwrap();
        let err = session
            .start(StreamTarget::config("cfg"), None)
            .await
            .unwrap_err();
        assert!(matches!(err, EviError::InvalidUrl(_)));
        assert_eq!(session.state(), ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn test_start_against_closed_port_fails() {
        let session = session();
        let err = session
            .start(StreamTarget::config("cfg"), None)
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            EviError::ConnectionFailed { status: None, .. } | EviError::Timeout(_)
        ));
        assert_eq!(session.state(), ConnectionState::Failed);
        assert!(!session.is_active());
    }

    #[test]
    fn test_display_url_strips_query() {
        let url = Url::parse("wss://api.hume.ai/v0/evi/chat?config_id=abc").unwrap();
        assert_eq!(display_url(&url), "wss://api.hume.ai/v0/evi/chat");
    }

    #[test]
    fn test_preview_truncates() {
        let long = "x".repeat(500);
        assert_eq!(preview(&long).len(), TRACE_PREVIEW_CHARS);
        assert_eq!(preview("short"), "short");
    }
}
