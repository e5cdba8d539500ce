//! Typed-envelope message builder.
//!
//! [`create_message`] wraps a payload in `{"type": ..., "payload": ...}`,
//! normalizing it to JSON first. Byte payloads that already hold JSON keep
//! their exact text: key order and number literals are not reinterpreted.

use serde::Serialize;
use serde_json::Value;
use serde_json::value::RawValue;

use crate::core::evi::{EviError, EviResult};

/// A message envelope: a type tag plus a JSON payload.
#[derive(Debug, Clone, Serialize)]
pub struct WebsocketMessage {
    #[serde(rename = "type")]
    pub message_type: String,
    pub payload: Box<RawValue>,
}

impl WebsocketMessage {
    /// The payload's JSON text.
    pub fn payload_json(&self) -> &str {
        self.payload.get()
    }

    /// The payload parsed into a [`Value`].
    pub fn payload_value(&self) -> EviResult<Value> {
        Ok(serde_json::from_str(self.payload.get())?)
    }
}

/// Payload accepted by [`create_message`].
#[derive(Debug, Clone, PartialEq)]
pub enum Payload {
    /// Encoded as JSON `null`.
    Null,
    /// Encoded as a JSON string.
    Text(String),
    /// Embedded verbatim when it is valid JSON, otherwise encoded as a JSON
    /// string of its (lossy) UTF-8 text.
    Bytes(Vec<u8>),
    /// Already-structured JSON.
    Json(Value),
}

impl Payload {
    /// Marshal any serializable value into a JSON payload.
    pub fn from_serialize<T: Serialize + ?Sized>(value: &T) -> EviResult<Self> {
        serde_json::to_value(value)
            .map(Payload::Json)
            .map_err(|e| EviError::Serialization(format!("failed to marshal payload: {e}")))
    }

    fn into_raw(self) -> EviResult<Box<RawValue>> {
        let raw = match self {
            Payload::Null => serde_json::value::to_raw_value(&Value::Null),
            Payload::Text(text) => serde_json::value::to_raw_value(&text),
            Payload::Bytes(bytes) => match String::from_utf8(bytes) {
                Ok(text) => match RawValue::from_string(text.clone()) {
                    Ok(raw) => return Ok(raw),
                    Err(_) => serde_json::value::to_raw_value(&text),
                },
                Err(e) => {
                    serde_json::value::to_raw_value(&String::from_utf8_lossy(e.as_bytes()))
                }
            },
            Payload::Json(value) => serde_json::value::to_raw_value(&value),
        };

        raw.map_err(|e| EviError::Serialization(format!("failed to marshal payload: {e}")))
    }
}

impl From<&str> for Payload {
    fn from(text: &str) -> Self {
        Payload::Text(text.to_string())
    }
}

impl From<String> for Payload {
    fn from(text: String) -> Self {
        Payload::Text(text)
    }
}

impl From<Vec<u8>> for Payload {
    fn from(bytes: Vec<u8>) -> Self {
        Payload::Bytes(bytes)
    }
}

impl From<Value> for Payload {
    fn from(value: Value) -> Self {
        Payload::Json(value)
    }
}

/// Build a `{"type", "payload"}` envelope.
pub fn create_message(
    message_type: impl Into<String>,
    payload: impl Into<Payload>,
) -> EviResult<WebsocketMessage> {
    Ok(WebsocketMessage {
        message_type: message_type.into(),
        payload: payload.into().into_raw()?,
    })
}
