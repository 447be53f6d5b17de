use crate::config::ConfigError;
use thiserror::Error;
use tutor_socket::SocketError;

/// Main error type for the tutor session
#[derive(Error, Debug)]
pub enum SessionError {
    /// Transport could not be built or failed
    #[error("Transport error: {0}")]
    Transport(#[from] SocketError),

    /// Outbound command could not be serialized
    #[error("Failed to encode command: {0}")]
    Encode(#[from] serde_json::Error),

    /// Audio payload could not be decoded into a playable buffer
    #[error("Audio decode failed: {0}")]
    AudioDecode(String),

    /// Audio output failed while playing
    #[error("Playback failed: {0}")]
    Playback(String),

    /// Invalid or unreadable configuration
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The session task is gone
    #[error("Session task stopped")]
    SessionStopped,
}

/// Result type for session operations
pub type Result<T> = std::result::Result<T, SessionError>;
