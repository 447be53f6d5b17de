use crate::traits::*;

/// Configuration for a [`Transport`](crate::Transport)
///
/// Built by [`TransportBuilder`](crate::TransportBuilder); handed to the
/// transport task, which owns it for the lifetime of the connection.
pub struct TransportConfig {
    /// WebSocket URL (ws:// or wss://)
    pub(crate) url: String,

    /// Reconnection strategy consulted after every unexpected close
    pub(crate) reconnect_strategy: Box<dyn ReconnectionStrategy>,
}

impl TransportConfig {
    /// Get a reference to the URL
    pub fn url(&self) -> &str {
        &self.url
    }
}

impl std::fmt::Debug for TransportConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TransportConfig")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}
