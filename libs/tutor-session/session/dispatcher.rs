use super::state::SessionState;
use crate::playback::{
    AudioDecoder, AudioOutput, PlaybackEvent, PlaybackOutcome, PlaybackSequencer,
};
use crate::protocol::{AvatarState, InboundEvent, OutboundCommand};
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedReceiver;
use tracing::{debug, error, info, warn};

/// State machine applying decoded events to the [`SessionState`]
///
/// Events are applied strictly in the order they are passed in. Audio is
/// handed to the [`PlaybackSequencer`]; its completions come back through
/// [`Dispatcher::on_playback`] and drive the avatar while audio is audible.
pub struct Dispatcher {
    state: SessionState,
    sequencer: PlaybackSequencer,
    session_started: bool,
    backend_errors: u64,
    last_backend_error: Option<String>,
    anomalies: u64,
    last_playback_error: Option<String>,
}

impl Dispatcher {
    pub fn new(
        decoder: Arc<dyn AudioDecoder>,
        output: Arc<dyn AudioOutput>,
    ) -> (Self, UnboundedReceiver<PlaybackEvent>) {
        let (sequencer, playback_events) = PlaybackSequencer::new(decoder, output);
        let dispatcher = Self {
            state: SessionState::new(),
            sequencer,
            session_started: false,
            backend_errors: 0,
            last_backend_error: None,
            anomalies: 0,
            last_playback_error: None,
        };
        (dispatcher, playback_events)
    }

    /// Apply one inbound event
    pub fn dispatch(&mut self, event: InboundEvent) {
        match event {
            InboundEvent::Token { text } => {
                self.state.assistant_text.push_str(&text);
                self.state.avatar_state = AvatarState::Talking;
            }
            InboundEvent::AvatarState { state } => {
                debug!("Avatar -> {}", state);
                self.state.avatar_state = state;
            }
            InboundEvent::AssistantText { text } => {
                self.state.assistant_text = text;
            }
            InboundEvent::Ready {
                session_id,
                example_concepts,
            } => {
                info!(
                    "Session ready: {}",
                    session_id.as_deref().unwrap_or("<no id>")
                );
                self.state.session_id = session_id;
                if let Some(concepts) = example_concepts {
                    self.state.concepts = concepts;
                }
            }
            InboundEvent::AudioChunk { payload } => {
                if payload.is_empty() {
                    debug!("Ignoring empty audio chunk");
                    return;
                }
                self.sequencer.submit(payload);
            }
            InboundEvent::Error { message } => {
                error!("Backend error: {}", message);
                self.backend_errors += 1;
                self.last_backend_error = Some(message);
            }
            InboundEvent::Raw { data } => {
                warn!("Undecodable frame from backend: {}", truncate(&data, 120));
                self.anomalies += 1;
            }
        }
    }

    /// Apply a decode or playback completion
    pub fn on_playback(&mut self, event: PlaybackEvent) -> PlaybackOutcome {
        let outcome = self.sequencer.handle(event);
        match &outcome {
            PlaybackOutcome::Started(_) => self.state.avatar_state = AvatarState::Talking,
            PlaybackOutcome::Ended(_) => self.state.avatar_state = AvatarState::Idle,
            PlaybackOutcome::Failed { reason, .. } => {
                self.last_playback_error = Some(reason.clone());
            }
            PlaybackOutcome::Discarded(_) | PlaybackOutcome::Ignored => {}
        }
        outcome
    }

    /// Prepare for an outbound command. User actions start a new turn.
    pub fn begin_turn(&mut self, command: &OutboundCommand) {
        if command.is_user_action() {
            self.state.assistant_text.clear();
        }
    }

    /// Connection reached `Connected`. Returns the command to send, if any.
    ///
    /// `StartSession` goes out until one has been queued on a live
    /// connection, and on every connect when `restart_on_reconnect` is set.
    /// Call [`Dispatcher::session_started`] once it is queued.
    pub fn on_connected(&self, restart_on_reconnect: bool) -> Option<OutboundCommand> {
        if self.session_started && !restart_on_reconnect {
            return None;
        }
        Some(OutboundCommand::StartSession)
    }

    /// `StartSession` was queued on the current connection
    pub fn session_started(&mut self) {
        self.session_started = true;
    }

    /// Connection lost. A session that never became ready is started again
    /// on the next connect.
    pub fn on_disconnected(&mut self) {
        if self.session_started && !self.state.is_ready() {
            debug!("Connection lost before ready, session will be restarted");
            self.session_started = false;
        }
    }

    /// Stop any audible playback
    pub fn shutdown(&mut self) {
        self.sequencer.stop();
    }

    pub fn state(&self) -> &SessionState {
        &self.state
    }

    pub fn backend_errors(&self) -> u64 {
        self.backend_errors
    }

    pub fn last_backend_error(&self) -> Option<&str> {
        self.last_backend_error.as_deref()
    }

    /// Frames that decoded to `Raw`
    pub fn anomalies(&self) -> u64 {
        self.anomalies
    }

    pub fn last_playback_error(&self) -> Option<&str> {
        self.last_playback_error.as_deref()
    }
}

fn truncate(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
