use thiserror::Error;

/// Main error type for the transport
#[derive(Error, Debug)]
pub enum SocketError {
    /// WebSocket protocol or I/O error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// Connection attempt failed (refused, handshake rejected, ...)
    #[error("Connection failed: {0}")]
    ConnectFailed(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Result type for transport operations
pub type Result<T> = std::result::Result<T, SocketError>;
