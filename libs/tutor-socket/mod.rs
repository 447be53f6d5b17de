//! # TutorSocket
//!
//! The duplex connection used by the tutor session: one WebSocket to a fixed
//! local endpoint, with a fixed-delay reconnect policy and an explicit
//! teardown that cancels any pending reconnect.
//!
//! ## Features
//!
//! - **Single owner**: the socket lives inside one spawned task; the handle only
//!   enqueues commands
//! - **Type-state builder**: the endpoint must be set before a transport can be built
//! - **Lifecycle events**: open, closed, error and message events in arrival order
//! - **Silent drop**: frames sent while not connected are discarded and counted

pub mod traits;
pub mod core;

// Re-export all traits
pub use traits::*;

// Re-export core transport functionality
pub use self::core::{
    builder, config, connection_state, reconnector, transport,
    builder::{states, TransportBuilder},
    config::TransportConfig,
    connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState},
    reconnector::Reconnector,
    transport::{Metrics, Transport, TransportEvent, TransportEvents},
};

/// Type alias for Result with SocketError
pub type Result<T> = std::result::Result<T, traits::SocketError>;
