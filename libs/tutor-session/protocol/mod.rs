//! Wire protocol between the client and the tutor backend
//!
//! Text frames carry JSON objects with a `type` discriminator. Outbound audio
//! is the one exception: it travels as a bare binary frame.

pub mod codec;

pub use codec::{decode, decode_text, encode};

use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Avatar expression shown by the presentation layer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AvatarState {
    #[default]
    Idle,
    Listening,
    Talking,
}

impl AvatarState {
    /// Parse a wire value. Anything unrecognized is `Idle`.
    pub fn parse(value: &str) -> Self {
        match value {
            "listening" => AvatarState::Listening,
            "talking" => AvatarState::Talking,
            _ => AvatarState::Idle,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            AvatarState::Idle => "idle",
            AvatarState::Listening => "listening",
            AvatarState::Talking => "talking",
        }
    }
}

impl std::fmt::Display for AvatarState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Decoded message from the backend
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundEvent {
    /// One streamed piece of the assistant's reply (`token`)
    Token { text: String },
    /// Avatar expression change (`avatar`)
    AvatarState { state: AvatarState },
    /// Full assistant text, replacing whatever was streamed (`assistant_text`)
    AssistantText { text: String },
    /// Session initialised (`ready`). `example_concepts` is `None` when the
    /// field was absent or not a list of strings
    Ready {
        session_id: Option<String>,
        example_concepts: Option<Vec<String>>,
    },
    /// Synthesized speech, base64-decoded (`tts_chunk`). Shared so the
    /// snapshot and the decoder hold the same bytes
    AudioChunk { payload: Arc<[u8]> },
    /// Backend-reported error (`error`)
    Error { message: String },
    /// Frame that could not be decoded into any of the above
    Raw { data: String },
}

impl InboundEvent {
    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            InboundEvent::Token { .. } => "token",
            InboundEvent::AvatarState { .. } => "avatar",
            InboundEvent::AssistantText { .. } => "assistant_text",
            InboundEvent::Ready { .. } => "ready",
            InboundEvent::AudioChunk { .. } => "tts_chunk",
            InboundEvent::Error { .. } => "error",
            InboundEvent::Raw { .. } => "raw",
        }
    }
}

/// Command sent to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundCommand {
    StartSession,
    StartConcept { concept: String },
    UserText { text: String },
    /// Sent as a binary frame, never as JSON
    #[serde(skip)]
    UserAudio { bytes: Vec<u8> },
}

impl OutboundCommand {
    /// Commands that begin a new turn and reset the assistant text
    pub fn is_user_action(&self) -> bool {
        !matches!(self, OutboundCommand::StartSession)
    }

    /// Short name for logging
    pub fn kind(&self) -> &'static str {
        match self {
            OutboundCommand::StartSession => "start_session",
            OutboundCommand::StartConcept { .. } => "start_concept",
            OutboundCommand::UserText { .. } => "user_text",
            OutboundCommand::UserAudio { .. } => "user_audio",
        }
    }
}
