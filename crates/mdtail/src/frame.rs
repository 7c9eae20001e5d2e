use serde::Deserialize;
use tokio_tungstenite::tungstenite::Message;

/// Structured wrapper a producer may use to carry a chunk. Payloads that do
/// not match this shape are treated as raw text (see [`chunk_from_raw`]).
#[derive(Debug, Deserialize)]
struct ChunkEnvelope {
    chunk: String,
}

/// Extract the text chunk carried by one inbound frame.
///
/// Control frames (ping/pong/close) carry no chunk; close handling lives in
/// the connection task, not here.
pub fn chunk_from_message(message: &Message) -> Option<String> {
    let raw = match message {
        Message::Text(text) => text.clone(),
        Message::Binary(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        _ => return None,
    };
    Some(chunk_from_raw(raw))
}

/// Decode one raw payload into a chunk. Total: never fails outward.
///
/// Prefers the `{"chunk": "..."}` envelope; anything else (invalid JSON,
/// missing field, non-string field) is appended verbatim. The asymmetric
/// fallback lets the same endpoint serve pre-wrapped or bare text streams.
pub fn chunk_from_raw(raw: String) -> String {
    match serde_json::from_str::<ChunkEnvelope>(&raw) {
        Ok(envelope) => envelope.chunk,
        Err(_) => raw,
    }
}

/// Serialize the fixed outbound command envelope.
pub fn command_frame(command: &str) -> String {
    serde_json::json!({ "type": "command", "command": command }).to_string()
}
