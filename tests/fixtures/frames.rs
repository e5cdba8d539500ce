//! Inbound EVI frames as the server sends them.

use serde_json::json;
use tokio_tungstenite::tungstenite::Message;

pub fn text(value: serde_json::Value) -> Message {
    Message::Text(value.to_string().into())
}

pub fn chat_metadata() -> Message {
    text(json!({
        "type": "chat_metadata",
        "chat_group_id": "group_123",
        "chat_id": "chat_456",
        "request_id": "req_789"
    }))
}

pub fn assistant_message(content: &str) -> Message {
    text(json!({
        "type": "assistant_message",
        "id": "msg_1",
        "message": {"role": "assistant", "content": content},
        "from_text": false
    }))
}

pub fn audio_output(index: u64) -> Message {
    text(json!({
        "type": "audio_output",
        "id": "audio_1",
        "index": index,
        "data": "UklGRg=="
    }))
}

pub fn assistant_end() -> Message {
    text(json!({"type": "assistant_end"}))
}

pub fn unknown_frame() -> Message {
    text(json!({"type": "tool_call", "name": "lookup", "tool_call_id": "t1"}))
}
