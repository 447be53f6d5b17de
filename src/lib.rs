//! Local Tutor client - main library
//!
//! Keeps one live connection to the local tutor backend and turns its
//! message stream into state a presentation layer can render.
//!
//! ## Architecture
//!
//! - **bin_common**: Common utilities for binary executables (config path resolution)
//! - **tutor_session**: Protocol, dispatcher, playback and the session task (re-exported from workspace)
//! - **tutor_socket**: WebSocket transport with reconnection (re-exported from workspace)
//!
//! ## Usage in Binaries
//!
//! ```rust
//! use local_tutor::bin_common::{load_config_from_env, ConfigType};
//! use local_tutor::tutor_session::{SessionConfig, SessionManager};
//! ```

// Re-export workspace libraries for convenience
pub use tutor_session;
pub use tutor_socket;

// Binary common utilities
pub mod bin_common {
    //! Common utilities for binary executables

    pub mod cli;

    pub use cli::{load_config_from_env, parse_args, ConfigType};
}
