//! JSON codec for the tutor protocol
//!
//! Decoding never fails: anything that cannot be mapped to a typed event
//! becomes [`InboundEvent::Raw`] so the dispatch pipeline keeps running.

use super::{AvatarState, InboundEvent, OutboundCommand};
use crate::error::Result;
use base64::Engine;
use serde_json::Value;
use tracing::{debug, warn};
use tutor_socket::Frame;

/// Encode a command into the frame it travels in.
///
/// `UserAudio` becomes a binary frame holding the raw bytes; every other
/// command is a JSON text frame.
pub fn encode(command: OutboundCommand) -> Result<Frame> {
    match command {
        OutboundCommand::UserAudio { bytes } => Ok(Frame::Binary(bytes)),
        other => Ok(Frame::Text(serde_json::to_string(&other)?)),
    }
}

/// Decode an inbound frame
pub fn decode(frame: &Frame) -> InboundEvent {
    match frame {
        Frame::Text(text) => decode_text(text),
        Frame::Binary(bytes) => {
            warn!("Unexpected binary frame from backend ({} bytes)", bytes.len());
            InboundEvent::Raw {
                data: format!("<binary frame: {} bytes>", bytes.len()),
            }
        }
    }
}

/// Decode a text frame
pub fn decode_text(text: &str) -> InboundEvent {
    let value: Value = match serde_json::from_str(text) {
        Ok(value) => value,
        Err(e) => {
            debug!("Frame is not JSON ({}), passing through as raw", e);
            return raw(text);
        }
    };

    match value.get("type").and_then(Value::as_str).unwrap_or_default() {
        "token" => InboundEvent::Token {
            text: string_field(&value, "text"),
        },
        "avatar" => InboundEvent::AvatarState {
            state: value
                .get("state")
                .and_then(Value::as_str)
                .map(AvatarState::parse)
                .unwrap_or_default(),
        },
        "assistant_text" => InboundEvent::AssistantText {
            text: string_field(&value, "text"),
        },
        "ready" => InboundEvent::Ready {
            session_id: value
                .get("session_id")
                .and_then(Value::as_str)
                .filter(|id| !id.is_empty())
                .map(str::to_owned),
            example_concepts: concepts(&value),
        },
        "tts_chunk" => decode_audio(&value, text),
        "error" => InboundEvent::Error {
            message: string_field(&value, "message"),
        },
        _ => raw(text),
    }
}

fn decode_audio(value: &Value, text: &str) -> InboundEvent {
    let data = value.get("data").and_then(Value::as_str).unwrap_or_default();

    match base64::engine::general_purpose::STANDARD.decode(data) {
        Ok(payload) => InboundEvent::AudioChunk {
            payload: payload.into(),
        },
        Err(e) => {
            warn!("Invalid base64 audio payload: {}", e);
            raw(text)
        }
    }
}

/// `example_concepts` is only accepted as a list of strings
fn concepts(value: &Value) -> Option<Vec<String>> {
    let items = value.get("example_concepts")?.as_array()?;
    items
        .iter()
        .map(|item| item.as_str().map(str::to_owned))
        .collect()
}

fn string_field(value: &Value, key: &str) -> String {
    value
        .get(key)
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_owned()
}

fn raw(text: &str) -> InboundEvent {
    InboundEvent::Raw {
        data: text.to_owned(),
    }
}
