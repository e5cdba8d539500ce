//! Scripted in-process EVI WebSocket server and a recording session handler.

#![allow(dead_code)]

use async_trait::async_trait;
use futures_util::{SinkExt, StreamExt};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::time::timeout;
use tokio_tungstenite::accept_hdr_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::handshake::server::{ErrorResponse, Request, Response};
use tokio_tungstenite::tungstenite::http::{self, HeaderMap};
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use hume_evi_client::core::evi::{DisconnectReason, EviResponse, SessionHandler};

/// How long tests wait for an expected event.
pub const EVENT_TIMEOUT: Duration = Duration::from_secs(5);

// =============================================================================
// Mock Server
// =============================================================================

/// What the server does once its scripted frames are sent.
#[derive(Debug, Clone)]
pub enum Finish {
    /// Keep the connection open and record what the client sends.
    Hold,
    /// Send a close frame.
    Close { code: u16, reason: &'static str },
    /// Drop the TCP connection without a close handshake.
    Drop,
}

/// Per-connection behaviour.
#[derive(Debug, Clone)]
pub struct Script {
    pub frames: Vec<Message>,
    pub finish: Finish,
    /// Reject the upgrade with this status and body.
    pub reject: Option<(u16, &'static str)>,
}

impl Script {
    pub fn hold(frames: Vec<Message>) -> Self {
        Self {
            frames,
            finish: Finish::Hold,
            reject: None,
        }
    }

    pub fn then(mut self, finish: Finish) -> Self {
        self.finish = finish;
        self
    }

    pub fn rejecting(status: u16, body: &'static str) -> Self {
        Self {
            frames: Vec::new(),
            finish: Finish::Hold,
            reject: Some((status, body)),
        }
    }
}

/// Upgrade request as seen by the server.
#[derive(Debug, Clone)]
pub struct CapturedRequest {
    pub path: String,
    pub query: Option<String>,
    pub headers: HeaderMap,
}

pub struct MockEviServer {
    /// REST-style base address; the client derives `ws://.../v0/evi/chat`.
    pub base_url: String,
    pub requests: mpsc::UnboundedReceiver<CapturedRequest>,
    pub inbound: mpsc::UnboundedReceiver<Message>,
}

impl MockEviServer {
    /// Bind to an ephemeral port; every accepted connection runs `script`.
    pub async fn start(script: Script) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (request_tx, requests) = mpsc::unbounded_channel();
        let (inbound_tx, inbound) = mpsc::unbounded_channel();

        tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                tokio::spawn(handle_connection(
                    stream,
                    script.clone(),
                    request_tx.clone(),
                    inbound_tx.clone(),
                ));
            }
        });

        Self {
            base_url: format!("http://{addr}/v0"),
            requests,
            inbound,
        }
    }

    pub async fn next_request(&mut self) -> CapturedRequest {
        timeout(EVENT_TIMEOUT, self.requests.recv())
            .await
            .expect("timed out waiting for upgrade request")
            .expect("server stopped")
    }

    pub async fn next_inbound(&mut self) -> Message {
        timeout(EVENT_TIMEOUT, self.inbound.recv())
            .await
            .expect("timed out waiting for client frame")
            .expect("server stopped")
    }
}

async fn handle_connection(
    stream: TcpStream,
    script: Script,
    request_tx: mpsc::UnboundedSender<CapturedRequest>,
    inbound_tx: mpsc::UnboundedSender<Message>,
) {
    let reject = script.reject;
    let callback = move |request: &Request, response: Response| -> Result<Response, ErrorResponse> {
        let _ = request_tx.send(CapturedRequest {
            path: request.uri().path().to_string(),
            query: request.uri().query().map(str::to_string),
            headers: request.headers().clone(),
        });
        match reject {
            Some((status, body)) => Err(http::Response::builder()
                .status(status)
                .body(Some(body.to_string()))
                .unwrap()),
            None => Ok(response),
        }
    };

    let Ok(ws_stream) = accept_hdr_async(stream, callback).await else {
        return;
    };
    let (mut write, mut read) = ws_stream.split();

    for frame in script.frames {
        if write.send(frame).await.is_err() {
            return;
        }
    }

    match script.finish {
        Finish::Hold => {}
        Finish::Close { code, reason } => {
            let close = Message::Close(Some(CloseFrame {
                code: CloseCode::from(code),
                reason: reason.into(),
            }));
            let _ = write.send(close).await;
        }
        Finish::Drop => return,
    }

    while let Some(Ok(message)) = read.next().await {
        let closing = matches!(message, Message::Close(_));
        let _ = inbound_tx.send(message);
        if closing {
            break;
        }
    }
}

/// Accepts TCP connections but never answers the upgrade.
///
/// Returns the base address and a count of accepted connections.
pub async fn start_silent_server() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let accepted = Arc::new(AtomicUsize::new(0));
    let counter = accepted.clone();

    tokio::spawn(async move {
        let mut held = Vec::new();
        while let Ok((stream, _)) = listener.accept().await {
            counter.fetch_add(1, Ordering::SeqCst);
            held.push(stream);
        }
    });

    (format!("http://{addr}/v0"), accepted)
}

// =============================================================================
// Recording Handler
// =============================================================================

#[derive(Debug)]
pub enum Event {
    Connected,
    Response(EviResponse),
    Disconnected(DisconnectReason),
}

/// Forwards every callback to a channel.
pub struct RecordingHandler {
    events: mpsc::UnboundedSender<Event>,
}

impl RecordingHandler {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Event>) {
        let (events, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { events }), rx)
    }
}

#[async_trait]
impl SessionHandler for RecordingHandler {
    async fn on_connect(&self) {
        let _ = self.events.send(Event::Connected);
    }

    async fn on_disconnect(&self, reason: DisconnectReason) {
        let _ = self.events.send(Event::Disconnected(reason));
    }

    async fn on_response(&self, response: EviResponse) {
        let _ = self.events.send(Event::Response(response));
    }
}

pub async fn next_event(events: &mut mpsc::UnboundedReceiver<Event>) -> Event {
    timeout(EVENT_TIMEOUT, events.recv())
        .await
        .expect("timed out waiting for handler event")
        .expect("handler dropped")
}

pub async fn next_response(events: &mut mpsc::UnboundedReceiver<Event>) -> EviResponse {
    match next_event(events).await {
        Event::Response(response) => response,
        other => panic!("expected a response, got {other:?}"),
    }
}

pub async fn next_disconnect(events: &mut mpsc::UnboundedReceiver<Event>) -> DisconnectReason {
    match next_event(events).await {
        Event::Disconnected(reason) => reason,
        other => panic!("expected a disconnect, got {other:?}"),
    }
}

/// Assert no further event arrives within a short window.
pub async fn assert_quiet(events: &mut mpsc::UnboundedReceiver<Event>) {
    match timeout(Duration::from_millis(300), events.recv()).await {
        Err(_) | Ok(None) => {}
        Ok(Some(event)) => panic!("unexpected handler event: {event:?}"),
    }
}
