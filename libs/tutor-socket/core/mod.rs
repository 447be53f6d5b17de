//! # Transport core
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use tutor_socket::{FixedDelay, Frame, TransportBuilder, TransportEvent};
//!
//! #[tokio::main]
//! async fn main() -> tutor_socket::Result<()> {
//!     let (transport, mut events) = TransportBuilder::new()
//!         .url("ws://127.0.0.1:8765/ws")
//!         .reconnect_strategy(FixedDelay::new(Duration::from_secs(2), None))
//!         .build()
//!         .await?;
//!
//!     transport.open();
//!     while let Some(event) = events.recv().await {
//!         if let TransportEvent::Open = event {
//!             transport.send(Frame::Text(r#"{"type":"start_session"}"#.into()));
//!         }
//!     }
//!     Ok(())
//! }
//! ```

pub mod builder;
pub mod config;
pub mod connection_state;
pub mod reconnector;
pub mod transport;

pub use builder::{states, TransportBuilder};
pub use config::TransportConfig;
pub use connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
pub use reconnector::Reconnector;
pub use transport::{Metrics, Transport, TransportEvent, TransportEvents};

pub use crate::traits::*;
