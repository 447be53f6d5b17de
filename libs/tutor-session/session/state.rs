use crate::protocol::AvatarState;
use serde::Serialize;

/// State derived from the backend's event stream
///
/// Only the [`Dispatcher`](super::Dispatcher) mutates it; presentation reads
/// copies through the session snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SessionState {
    pub session_id: Option<String>,
    pub avatar_state: AvatarState,
    /// Reply text of the current turn
    pub assistant_text: String,
    /// Example concepts offered by the backend
    pub concepts: Vec<String>,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_ready(&self) -> bool {
        self.session_id.is_some()
    }
}
