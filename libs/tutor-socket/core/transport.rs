use crate::config::TransportConfig;
use crate::connection_state::{AtomicConnectionState, AtomicMetrics, ConnectionState};
use crate::reconnector::{CloseCause, Reconnector};
use crate::traits::*;
use futures::{SinkExt, StreamExt};
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::time::Sleep;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};
use tracing::{debug, error, info, warn};

type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Internal command messages for transport control
#[derive(Debug)]
enum TransportCommand {
    /// Connect if not already open or opening
    Open,
    /// Write a frame to the socket
    Send(Frame),
    /// Close the connection and cancel any pending reconnect
    Close,
}

/// Lifecycle and data events, delivered in the order they happen
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// Handshake with the peer completed
    Open,
    /// Connection is gone. `was_clean` is true when a close frame was exchanged
    Closed { was_clean: bool },
    /// Connection-level error (connect refused, socket error)
    Error(String),
    /// Inbound text or binary frame
    Message(Frame),
    /// A reconnect attempt will be made after this delay
    ReconnectScheduled(Duration),
    /// Reconnect attempt started (1-indexed since the last successful connect)
    Reconnecting(usize),
}

/// Transport metrics snapshot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Metrics {
    pub frames_sent: u64,
    pub frames_received: u64,
    pub frames_dropped: u64,
    pub reconnect_count: u64,
    pub connection_state: ConnectionState,
}

/// Receiving half of the transport's event stream
#[derive(Debug)]
pub struct TransportEvents {
    rx: UnboundedReceiver<TransportEvent>,
}

impl TransportEvents {
    /// Receive the next event. Returns `None` once the transport task exited
    pub async fn recv(&mut self) -> Option<TransportEvent> {
        self.rx.recv().await
    }

    /// Try to receive an event (non-blocking)
    pub fn try_recv(&mut self) -> Option<TransportEvent> {
        self.rx.try_recv().ok()
    }
}

/// Handle to the duplex connection
///
/// The socket itself is owned by a spawned task; this handle only enqueues
/// commands and reads the shared atomic state. All methods are non-blocking.
pub struct Transport {
    url: String,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    command_tx: UnboundedSender<TransportCommand>,
    task_handle: Option<tokio::task::JoinHandle<()>>,
}

impl Transport {
    /// Spawn the transport task. Called by the builder.
    pub(crate) fn spawn(config: TransportConfig) -> (Self, TransportEvents) {
        let state = Arc::new(AtomicConnectionState::new(ConnectionState::Disconnected));
        let metrics = Arc::new(AtomicMetrics::new());

        let (command_tx, command_rx) = unbounded_channel();
        let (event_tx, event_rx) = unbounded_channel();

        let url = config.url.clone();
        let task = TransportTask {
            url: config.url,
            reconnector: Reconnector::new(config.reconnect_strategy),
            state: Arc::clone(&state),
            metrics: Arc::clone(&metrics),
            commands: command_rx,
            events: event_tx,
        };
        let task_handle = tokio::spawn(task.run());

        let transport = Self {
            url,
            state,
            metrics,
            command_tx,
            task_handle: Some(task_handle),
        };

        (transport, TransportEvents { rx: event_rx })
    }

    /// Connect to the endpoint. No-op if already open or opening.
    pub fn open(&self) {
        if self.state.get().is_active() {
            debug!("Open ignored, connection is {:?}", self.state.get());
            return;
        }
        let _ = self.command_tx.send(TransportCommand::Open);
    }

    /// Send a frame.
    ///
    /// Frames are dropped silently (logged at debug, counted in metrics) when
    /// the connection is not `Connected`. Returns whether the frame was queued.
    pub fn send(&self, frame: Frame) -> bool {
        if !self.state.is_connected() {
            debug!("Dropping {} byte frame, not connected", frame.len());
            self.metrics.increment_dropped();
            return false;
        }

        if self.command_tx.send(TransportCommand::Send(frame)).is_err() {
            self.metrics.increment_dropped();
            return false;
        }
        true
    }

    /// Close the connection and cancel any pending reconnect
    pub fn close(&self) {
        let _ = self.state.transition(ConnectionState::Connected, ConnectionState::Closing)
            || self.state.transition(ConnectionState::Connecting, ConnectionState::Closing);
        let _ = self.command_tx.send(TransportCommand::Close);
    }

    /// Get current connection state
    #[inline]
    pub fn connection_state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Check if connected
    #[inline]
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    /// Get current metrics
    pub fn metrics(&self) -> Metrics {
        Metrics {
            frames_sent: self.metrics.frames_sent(),
            frames_received: self.metrics.frames_received(),
            frames_dropped: self.metrics.frames_dropped(),
            reconnect_count: self.metrics.reconnect_count(),
            connection_state: self.state.get(),
        }
    }

    /// Close the connection and wait for the transport task to exit
    pub async fn shutdown(mut self) {
        info!("Shutting down transport for {}", self.url);
        self.close();

        let handle = self.task_handle.take();
        // Dropping the command sender ends the task once the close is handled
        drop(self);
        if let Some(handle) = handle {
            let _ = handle.await;
        }
    }
}

/// How an established connection ended
enum Ended {
    Requested,
    HandleDropped,
    Dropped { was_clean: bool },
    Failed(SocketError),
}

/// What the main loop should do after a connection attempt
enum Flow {
    Idle,
    Reconnect(Duration),
    Exit,
}

enum Wake {
    Timer,
    Command(Option<TransportCommand>),
}

enum ConnectStep {
    Done(std::result::Result<WsStream, tungstenite::Error>),
    Command(Option<TransportCommand>),
}

enum ServeStep {
    Inbound(Option<std::result::Result<Message, tungstenite::Error>>),
    Command(Option<TransportCommand>),
}

/// The task that owns the socket and the reconnect timer
struct TransportTask {
    url: String,
    reconnector: Reconnector,
    state: Arc<AtomicConnectionState>,
    metrics: Arc<AtomicMetrics>,
    commands: UnboundedReceiver<TransportCommand>,
    events: UnboundedSender<TransportEvent>,
}

impl TransportTask {
    async fn run(mut self) {
        let mut timer: Option<Pin<Box<Sleep>>> = None;

        loop {
            let wake = match timer.as_mut() {
                Some(sleep) => tokio::select! {
                    _ = sleep.as_mut() => Wake::Timer,
                    command = self.commands.recv() => Wake::Command(command),
                },
                None => Wake::Command(self.commands.recv().await),
            };

            let flow = match wake {
                Wake::Timer => {
                    timer = None;
                    if !self.reconnector.fire(self.state.get()) {
                        continue;
                    }
                    let attempt = self.reconnector.attempt();
                    self.metrics.increment_reconnects();
                    info!("Reconnecting to {} (attempt {})", self.url, attempt);
                    self.emit(TransportEvent::Reconnecting(attempt));
                    self.connect_and_serve().await
                }
                Wake::Command(Some(TransportCommand::Open)) => {
                    if self.reconnector.cancel() {
                        debug!("Open requested, connecting now instead of waiting for timer");
                    }
                    timer = None;
                    self.connect_and_serve().await
                }
                Wake::Command(Some(TransportCommand::Close)) => {
                    timer = None;
                    if self.reconnector.cancel() {
                        info!("Cancelled pending reconnect to {}", self.url);
                    }
                    self.state.set(ConnectionState::Disconnected);
                    continue;
                }
                Wake::Command(Some(TransportCommand::Send(frame))) => {
                    debug!("Dropping {} byte frame, not connected", frame.len());
                    self.metrics.increment_dropped();
                    continue;
                }
                Wake::Command(None) => {
                    debug!("Transport handle dropped");
                    break;
                }
            };

            match flow {
                Flow::Idle => {}
                Flow::Reconnect(delay) => timer = Some(Box::pin(tokio::time::sleep(delay))),
                Flow::Exit => break,
            }
        }

        self.state.set(ConnectionState::Disconnected);
        info!("Transport task exiting");
    }

    /// Connect, then serve the connection until it ends
    async fn connect_and_serve(&mut self) -> Flow {
        self.state.set(ConnectionState::Connecting);

        let connect = connect_async(self.url.clone());
        tokio::pin!(connect);

        let stream = loop {
            let step = tokio::select! {
                result = &mut connect => ConnectStep::Done(result.map(|(stream, _)| stream)),
                command = self.commands.recv() => ConnectStep::Command(command),
            };

            match step {
                ConnectStep::Done(Ok(stream)) => break stream,
                ConnectStep::Done(Err(e)) => {
                    let error = SocketError::ConnectFailed(e.to_string());
                    warn!("Failed to connect to {}: {}", self.url, error);
                    self.state.set(ConnectionState::Disconnected);
                    self.emit(TransportEvent::Error(error.to_string()));
                    self.emit(TransportEvent::Closed { was_clean: false });
                    return self.schedule(CloseCause::Unexpected);
                }
                ConnectStep::Command(Some(TransportCommand::Open)) => {
                    debug!("Open ignored, already connecting");
                }
                ConnectStep::Command(Some(TransportCommand::Send(frame))) => {
                    debug!("Dropping {} byte frame, still connecting", frame.len());
                    self.metrics.increment_dropped();
                }
                ConnectStep::Command(Some(TransportCommand::Close)) => {
                    info!("Close requested while connecting to {}", self.url);
                    self.state.set(ConnectionState::Disconnected);
                    self.emit(TransportEvent::Closed { was_clean: true });
                    return self.schedule(CloseCause::Requested);
                }
                ConnectStep::Command(None) => return Flow::Exit,
            }
        };

        info!("Connected to {}", self.url);
        self.state.set(ConnectionState::Connected);
        self.reconnector.on_connected();
        self.emit(TransportEvent::Open);

        match self.serve(stream).await {
            Ended::Requested => {
                info!("Connection to {} closed on request", self.url);
                self.state.set(ConnectionState::Disconnected);
                self.emit(TransportEvent::Closed { was_clean: true });
                self.schedule(CloseCause::Requested)
            }
            Ended::HandleDropped => {
                self.state.set(ConnectionState::Disconnected);
                Flow::Exit
            }
            Ended::Dropped { was_clean } => {
                warn!("Connection to {} closed by peer (clean: {})", self.url, was_clean);
                self.state.set(ConnectionState::Disconnected);
                self.emit(TransportEvent::Closed { was_clean });
                self.schedule(CloseCause::Unexpected)
            }
            Ended::Failed(error) => {
                error!("Connection error on {}: {}", self.url, error);
                self.state.set(ConnectionState::Disconnected);
                self.emit(TransportEvent::Error(error.to_string()));
                self.emit(TransportEvent::Closed { was_clean: false });
                self.schedule(CloseCause::Unexpected)
            }
        }
    }

    /// Main message loop for an established connection
    async fn serve(&mut self, stream: WsStream) -> Ended {
        let (mut write, mut read) = stream.split();

        loop {
            let step = tokio::select! {
                msg = read.next() => ServeStep::Inbound(msg),
                command = self.commands.recv() => ServeStep::Command(command),
            };

            match step {
                ServeStep::Inbound(Some(Ok(Message::Close(frame)))) => {
                    debug!("Peer sent close frame: {:?}", frame);
                    return Ended::Dropped { was_clean: true };
                }
                ServeStep::Inbound(Some(Ok(msg))) => {
                    if let Some(frame) = Frame::from_message(msg) {
                        self.metrics.increment_received();
                        self.emit(TransportEvent::Message(frame));
                    }
                }
                ServeStep::Inbound(Some(Err(e))) => {
                    return Ended::Failed(SocketError::WebSocket(e.to_string()));
                }
                ServeStep::Inbound(None) => return Ended::Dropped { was_clean: false },
                ServeStep::Command(Some(TransportCommand::Send(frame))) => {
                    if let Err(e) = write.send(Message::from(frame)).await {
                        return Ended::Failed(SocketError::WebSocket(format!("send failed: {}", e)));
                    }
                    self.metrics.increment_sent();
                }
                ServeStep::Command(Some(TransportCommand::Open)) => {
                    debug!("Open ignored, already connected");
                }
                ServeStep::Command(Some(TransportCommand::Close)) => {
                    let _ = write.close().await;
                    return Ended::Requested;
                }
                ServeStep::Command(None) => {
                    let _ = write.close().await;
                    return Ended::HandleDropped;
                }
            }
        }
    }

    fn schedule(&mut self, cause: CloseCause) -> Flow {
        match self.reconnector.on_close(cause) {
            Some(delay) => {
                info!("Reconnecting to {} in {:?}", self.url, delay);
                self.emit(TransportEvent::ReconnectScheduled(delay));
                Flow::Reconnect(delay)
            }
            None => Flow::Idle,
        }
    }

    fn emit(&self, event: TransportEvent) {
        if self.events.send(event).is_err() {
            debug!("Transport event receiver dropped");
        }
    }
}
