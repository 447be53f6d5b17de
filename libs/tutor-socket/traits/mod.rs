//! # TutorSocket Traits
//!
//! Core traits and types shared by the transport:
//!
//! - **Frame**: one text or binary unit exchanged with the backend
//! - **ReconnectionStrategy**: controls the delay before a reconnect attempt
//! - **SocketError**: transport error taxonomy

pub mod error;
pub mod frame;
pub mod reconnect;

// Re-export commonly used types
pub use error::{Result, SocketError};
pub use frame::Frame;
pub use reconnect::{FixedDelay, NeverReconnect, ReconnectionStrategy};
