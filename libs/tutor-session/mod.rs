//! # Tutor Session
//!
//! Client-side session manager for the local tutor backend.
//!
//! ## Architecture
//!
//! ```text
//! user action ──> Dispatcher (new-turn reset) ──> codec::encode ──> Transport ──> backend
//! backend ──> Transport ──> codec::decode ──> Dispatcher ──> SessionState ──> presentation
//!                                                 │
//!                                                 └──> PlaybackSequencer ──> decode ──> play
//! ```
//!
//! - **protocol**: wire types and the JSON codec
//! - **session**: derived state, the dispatcher state machine, and the
//!   session task that owns the transport
//! - **playback**: sequence-numbered audio decode and playback
//! - **config** / **logging**: ambient setup used by binaries

pub mod config;
pub mod error;
pub mod logging;
pub mod playback;
pub mod protocol;
pub mod session;

pub use config::{ConfigError, SessionConfig};
pub use error::{Result, SessionError};
pub use logging::init_tracing;
pub use playback::{
    AudioDecoder, AudioOutput, ClockedOutput, DecodedAudio, PlaybackEvent, PlaybackOutcome,
    PlaybackSequencer, SymphoniaDecoder,
};
pub use protocol::{AvatarState, InboundEvent, OutboundCommand};
pub use session::{Dispatcher, SessionHandle, SessionManager, SessionSnapshot, SessionState};
