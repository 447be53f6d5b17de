pub mod states;

use crate::config::TransportConfig;
use crate::transport::{Transport, TransportEvents};
use crate::traits::*;
use states::*;
use std::marker::PhantomData;
use std::time::Duration;

/// Default delay before re-establishing a dropped connection
pub const DEFAULT_RECONNECT_DELAY: Duration = Duration::from_secs(2);

/// Type-state builder for [`Transport`]
///
/// The endpoint is required; the reconnection strategy defaults to a
/// [`FixedDelay`] of [`DEFAULT_RECONNECT_DELAY`] with unlimited attempts.
pub struct TransportBuilder<U>
where
    U: UrlState,
{
    _url_state: PhantomData<U>,
    url: Option<String>,
    reconnect_strategy: Option<Box<dyn ReconnectionStrategy>>,
}

impl TransportBuilder<NoUrl> {
    /// Create a new builder instance
    pub fn new() -> Self {
        Self {
            _url_state: PhantomData,
            url: None,
            reconnect_strategy: None,
        }
    }

    pub fn url(self, url: impl Into<String>) -> TransportBuilder<HasUrl> {
        TransportBuilder {
            _url_state: PhantomData,
            url: Some(url.into()),
            reconnect_strategy: self.reconnect_strategy,
        }
    }
}

impl Default for TransportBuilder<NoUrl> {
    fn default() -> Self {
        Self::new()
    }
}

impl<U> TransportBuilder<U>
where
    U: UrlState,
{
    pub fn reconnect_strategy(mut self, strategy: impl ReconnectionStrategy + 'static) -> Self {
        self.reconnect_strategy = Some(Box::new(strategy));
        self
    }

    /// Shorthand for `reconnect_strategy(FixedDelay::new(delay, None))`
    pub fn reconnect_delay(self, delay: Duration) -> Self {
        self.reconnect_strategy(FixedDelay::new(delay, None))
    }
}

// Build method - only available once the URL is set
impl TransportBuilder<HasUrl> {
    /// Spawn the transport task.
    ///
    /// Must be called from within a Tokio runtime. The transport starts in
    /// `Disconnected`; call [`Transport::open`] to connect.
    pub async fn build(self) -> Result<(Transport, TransportEvents)> {
        let url = self
            .url
            .ok_or_else(|| SocketError::Configuration("URL must be set".into()))?;

        if !(url.starts_with("ws://") || url.starts_with("wss://")) {
            return Err(SocketError::Configuration(format!(
                "endpoint must be a ws:// or wss:// URL, got '{}'",
                url
            )));
        }

        let reconnect_strategy = self
            .reconnect_strategy
            .unwrap_or_else(|| Box::new(FixedDelay::new(DEFAULT_RECONNECT_DELAY, None)));

        let config = TransportConfig {
            url,
            reconnect_strategy,
        };

        Ok(Transport::spawn(config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn rejects_non_websocket_endpoint() {
        let result = TransportBuilder::new().url("http://127.0.0.1:8765").build().await;
        assert!(matches!(result, Err(SocketError::Configuration(_))));
    }

    #[tokio::test]
    async fn builds_disconnected_transport() {
        let (transport, _events) = TransportBuilder::new()
            .url("ws://127.0.0.1:9/ws")
            .reconnect_delay(Duration::from_millis(50))
            .build()
            .await
            .unwrap();

        assert_eq!(transport.url(), "ws://127.0.0.1:9/ws");
        assert!(!transport.is_connected());
    }
}
