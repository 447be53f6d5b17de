use super::dispatcher::Dispatcher;
use super::state::SessionState;
use crate::config::SessionConfig;
use crate::error::{Result, SessionError};
use crate::playback::{AudioDecoder, AudioOutput, ClockedOutput, PlaybackEvent, SymphoniaDecoder};
use crate::protocol::{self, InboundEvent, OutboundCommand};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use tutor_socket::{Metrics, Transport, TransportBuilder, TransportEvent, TransportEvents};

/// Everything the presentation layer reads
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionSnapshot {
    pub state: SessionState,
    pub connected: bool,
    /// Last transport error, cleared once a connection succeeds
    pub error: Option<String>,
    /// Most recent decoded inbound event
    pub last_event: Option<InboundEvent>,
    /// Number of `error` messages received from the backend
    pub backend_errors: u64,
    pub last_backend_error: Option<String>,
    /// Number of frames that could not be decoded
    pub protocol_anomalies: u64,
    pub last_playback_error: Option<String>,
}

#[derive(Debug)]
enum SessionCommand {
    Send(OutboundCommand),
    Connect,
    Metrics(oneshot::Sender<Metrics>),
}

/// Handle to a running session
///
/// All actions are enqueued to the session task and return immediately.
/// Dropping the handle tears the session down.
pub struct SessionHandle {
    commands: UnboundedSender<SessionCommand>,
    snapshot: watch::Receiver<SessionSnapshot>,
    task: Option<JoinHandle<()>>,
}

impl SessionHandle {
    /// Send a command to the backend
    ///
    /// User actions reset the assistant text first. The command is dropped
    /// when the connection is down.
    pub fn send(&self, command: OutboundCommand) -> Result<()> {
        self.enqueue(SessionCommand::Send(command))
    }

    pub fn start_concept(&self, concept: impl Into<String>) -> Result<()> {
        self.send(OutboundCommand::StartConcept {
            concept: concept.into(),
        })
    }

    pub fn send_text(&self, text: impl Into<String>) -> Result<()> {
        self.send(OutboundCommand::UserText { text: text.into() })
    }

    /// Send recorded audio as a binary frame
    pub fn send_audio(&self, bytes: Vec<u8>) -> Result<()> {
        self.send(OutboundCommand::UserAudio { bytes })
    }

    /// Connect now. No-op if already connected or connecting.
    pub fn connect(&self) -> Result<()> {
        self.enqueue(SessionCommand::Connect)
    }

    /// Current snapshot
    pub fn snapshot(&self) -> SessionSnapshot {
        self.snapshot.borrow().clone()
    }

    pub fn is_connected(&self) -> bool {
        self.snapshot.borrow().connected
    }

    /// Receiver notified on every snapshot change
    pub fn subscribe(&self) -> watch::Receiver<SessionSnapshot> {
        self.snapshot.clone()
    }

    /// Wait until `predicate` holds for the snapshot, or `timeout` elapses
    pub async fn wait_until(
        &self,
        timeout: Duration,
        mut predicate: impl FnMut(&SessionSnapshot) -> bool,
    ) -> Option<SessionSnapshot> {
        let mut rx = self.snapshot.clone();
        let snapshot = match tokio::time::timeout(timeout, rx.wait_for(|s| predicate(s))).await {
            Ok(Ok(snapshot)) => Some(snapshot.clone()),
            _ => None,
        };
        snapshot
    }

    /// Transport counters
    pub async fn metrics(&self) -> Result<Metrics> {
        let (tx, rx) = oneshot::channel();
        self.enqueue(SessionCommand::Metrics(tx))?;
        rx.await.map_err(|_| SessionError::SessionStopped)
    }

    /// Close the connection, cancel any pending reconnect, stop playback and
    /// wait for the session task to exit
    pub async fn teardown(mut self) {
        let task = self.task.take();
        // Closing the command channel is the teardown signal
        drop(self);
        if let Some(task) = task {
            let _ = task.await;
        }
    }

    fn enqueue(&self, command: SessionCommand) -> Result<()> {
        self.commands
            .send(command)
            .map_err(|_| SessionError::SessionStopped)
    }
}

/// Starts sessions
///
/// ```no_run
/// use tutor_session::{SessionConfig, SessionManager};
///
/// # async fn example() -> tutor_session::Result<()> {
/// let session = SessionManager::new(SessionConfig::default()).start().await?;
/// session.start_concept("Gravity")?;
/// session.teardown().await;
/// # Ok(())
/// # }
/// ```
pub struct SessionManager {
    config: SessionConfig,
    decoder: Arc<dyn AudioDecoder>,
    output: Arc<dyn AudioOutput>,
}

impl SessionManager {
    /// Manager using the WAV decoder and the headless clocked output
    pub fn new(config: SessionConfig) -> Self {
        Self {
            config,
            decoder: Arc::new(SymphoniaDecoder::new()),
            output: Arc::new(ClockedOutput::new()),
        }
    }

    pub fn with_decoder(mut self, decoder: Arc<dyn AudioDecoder>) -> Self {
        self.decoder = decoder;
        self
    }

    pub fn with_output(mut self, output: Arc<dyn AudioOutput>) -> Self {
        self.output = output;
        self
    }

    /// Spawn the session task and start connecting
    pub async fn start(self) -> Result<SessionHandle> {
        self.config.validate()?;

        let (transport, transport_events) = TransportBuilder::new()
            .url(self.config.endpoint.clone())
            .reconnect_delay(self.config.reconnect_delay())
            .build()
            .await?;

        let (dispatcher, playback_events) = Dispatcher::new(self.decoder, self.output);
        let (command_tx, command_rx) = unbounded_channel();
        let (snapshot_tx, snapshot_rx) = watch::channel(SessionSnapshot::default());

        let task = SessionTask {
            transport,
            transport_events,
            dispatcher,
            playback_events,
            commands: command_rx,
            snapshot: snapshot_tx,
            restart_on_reconnect: self.config.restart_on_reconnect,
            connected: false,
            error: None,
            last_event: None,
        };

        info!("Starting session against {}", self.config.endpoint);
        let handle = tokio::spawn(task.run());

        Ok(SessionHandle {
            commands: command_tx,
            snapshot: snapshot_rx,
            task: Some(handle),
        })
    }
}

enum Wake {
    Transport(Option<TransportEvent>),
    Playback(PlaybackEvent),
    Command(Option<SessionCommand>),
}

/// The single task that applies every event and owns the transport handle
struct SessionTask {
    transport: Transport,
    transport_events: TransportEvents,
    dispatcher: Dispatcher,
    playback_events: UnboundedReceiver<PlaybackEvent>,
    commands: UnboundedReceiver<SessionCommand>,
    snapshot: watch::Sender<SessionSnapshot>,
    restart_on_reconnect: bool,
    connected: bool,
    error: Option<String>,
    last_event: Option<InboundEvent>,
}

impl SessionTask {
    async fn run(mut self) {
        self.transport.open();

        loop {
            let wake = tokio::select! {
                event = self.transport_events.recv() => Wake::Transport(event),
                Some(event) = self.playback_events.recv() => Wake::Playback(event),
                command = self.commands.recv() => Wake::Command(command),
            };

            match wake {
                Wake::Transport(Some(event)) => self.on_transport(event),
                Wake::Transport(None) => {
                    warn!("Transport task exited unexpectedly");
                    break;
                }
                Wake::Playback(event) => {
                    self.dispatcher.on_playback(event);
                }
                Wake::Command(Some(SessionCommand::Send(command))) => {
                    self.send(command);
                }
                Wake::Command(Some(SessionCommand::Connect)) => self.transport.open(),
                Wake::Command(Some(SessionCommand::Metrics(reply))) => {
                    let _ = reply.send(self.transport.metrics());
                }
                Wake::Command(None) => {
                    debug!("Session handle dropped");
                    break;
                }
            }

            self.publish();
        }

        self.shutdown().await;
    }

    fn on_transport(&mut self, event: TransportEvent) {
        match event {
            TransportEvent::Open => {
                self.connected = true;
                self.error = None;
                if let Some(command) = self.dispatcher.on_connected(self.restart_on_reconnect) {
                    if self.send(command) {
                        self.dispatcher.session_started();
                    }
                }
            }
            TransportEvent::Closed { was_clean } => {
                info!("Disconnected from backend (clean: {})", was_clean);
                self.connected = false;
                self.dispatcher.on_disconnected();
            }
            TransportEvent::Error(reason) => {
                self.error = Some(reason);
            }
            TransportEvent::Message(frame) => {
                let event = protocol::decode(&frame);
                debug!("Received {}", event.kind());
                self.last_event = Some(event.clone());
                self.dispatcher.dispatch(event);
            }
            TransportEvent::ReconnectScheduled(delay) => {
                debug!("Reconnect scheduled in {:?}", delay);
            }
            TransportEvent::Reconnecting(attempt) => {
                debug!("Reconnect attempt {}", attempt);
            }
        }
    }

    /// Returns whether the frame was queued on a live connection
    fn send(&mut self, command: OutboundCommand) -> bool {
        self.dispatcher.begin_turn(&command);

        let kind = command.kind();
        match protocol::encode(command) {
            Ok(frame) => {
                let queued = self.transport.send(frame);
                if queued {
                    debug!("Sent {}", kind);
                } else {
                    debug!("Dropped {}, not connected", kind);
                }
                queued
            }
            Err(e) => {
                error!("Failed to encode {}: {}", kind, e);
                false
            }
        }
    }

    fn publish(&self) {
        let next = SessionSnapshot {
            state: self.dispatcher.state().clone(),
            connected: self.connected,
            error: self.error.clone(),
            last_event: self.last_event.clone(),
            backend_errors: self.dispatcher.backend_errors(),
            last_backend_error: self.dispatcher.last_backend_error().map(str::to_owned),
            protocol_anomalies: self.dispatcher.anomalies(),
            last_playback_error: self.dispatcher.last_playback_error().map(str::to_owned),
        };

        self.snapshot.send_if_modified(|current| {
            if *current == next {
                return false;
            }
            *current = next;
            true
        });
    }

    async fn shutdown(mut self) {
        info!("Tearing down session");
        self.dispatcher.shutdown();
        self.connected = false;
        self.publish();
        self.transport.shutdown().await;
    }
}
