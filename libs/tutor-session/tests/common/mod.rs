//! Common test utilities for session integration tests
//!
//! Provides a scripted mock of the tutor backend.

#![allow(dead_code)]

use base64::Engine;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::Notify;
use tokio_tungstenite::tungstenite::Message;

/// Macro for verbose test output (controlled by TEST_VERBOSE env var)
#[macro_export]
macro_rules! verbose_println {
    ($($arg:tt)*) => {
        if std::env::var("TEST_VERBOSE").is_ok() {
            println!($($arg)*);
        }
    };
}

/// Mock tutor backend
///
/// Replies:
/// - `start_session`: `avatar idle`, then `ready` with session `s1` and concepts `["X"]`
/// - `start_concept`: tokens `"Hel"`, `"lo"`
/// - `user_text "garbage"`: a non-JSON frame, then token `"ok"`
/// - `user_text "fail"`: a backend `error`
/// - `user_text "speak"`: a `tts_chunk` holding 100 ms of WAV audio
/// - any other `user_text`: `assistant_text "You said: <text>"`
/// - binary frames: `assistant_text "heard N bytes"`
///
/// Servers built with [`MockTutorServer::dropping_first`] close the first
/// connections right after the handshake, without reading anything.
pub struct MockTutorServer {
    pub addr: SocketAddr,
    accepted: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    kick: Arc<Notify>,
    shutdown: Arc<Notify>,
}

impl MockTutorServer {
    pub async fn start() -> Self {
        Self::bind("127.0.0.1:0").await
    }

    /// Start on a specific address, e.g. one a client is already retrying
    pub async fn bind(addr: impl tokio::net::ToSocketAddrs) -> Self {
        Self::bind_with(addr, 0).await
    }

    /// Start a server that hangs up on its first `drops` connections
    pub async fn dropping_first(drops: usize) -> Self {
        Self::bind_with("127.0.0.1:0", drops).await
    }

    async fn bind_with(addr: impl tokio::net::ToSocketAddrs, drops: usize) -> Self {
        let listener = TcpListener::bind(addr).await.unwrap();
        let addr = listener.local_addr().unwrap();
        let accepted = Arc::new(AtomicUsize::new(0));
        let received = Arc::new(Mutex::new(Vec::new()));
        let kick = Arc::new(Notify::new());
        let shutdown = Arc::new(Notify::new());

        let server = Self {
            addr,
            accepted: Arc::clone(&accepted),
            received: Arc::clone(&received),
            kick: Arc::clone(&kick),
            shutdown: Arc::clone(&shutdown),
        };

        tokio::spawn(async move {
            loop {
                tokio::select! {
                    result = listener.accept() => {
                        let Ok((stream, _)) = result else { break };
                        let accepted = Arc::clone(&accepted);
                        let received = Arc::clone(&received);
                        let kick = Arc::clone(&kick);
                        let shutdown = Arc::clone(&shutdown);
                        tokio::spawn(async move {
                            handle_connection(stream, drops, accepted, received, kick, shutdown)
                                .await;
                        });
                    }
                    _ = shutdown.notified() => break,
                }
            }
        });

        server
    }

    pub fn ws_url(&self) -> String {
        format!("ws://{}/ws", self.addr)
    }

    /// Number of completed WebSocket handshakes
    pub fn accepted(&self) -> usize {
        self.accepted.load(Ordering::SeqCst)
    }

    /// Message types received so far, in order (`binary:N` for binary frames)
    pub fn received(&self) -> Vec<String> {
        self.received.lock().clone()
    }

    /// Drop every open connection without a close handshake
    pub fn kick(&self) {
        self.kick.notify_waiters();
    }

    pub fn shutdown(&self) {
        self.shutdown.notify_waiters();
    }
}

impl Drop for MockTutorServer {
    fn drop(&mut self) {
        self.shutdown();
    }
}

async fn handle_connection(
    stream: tokio::net::TcpStream,
    drops: usize,
    accepted: Arc<AtomicUsize>,
    received: Arc<Mutex<Vec<String>>>,
    kick: Arc<Notify>,
    shutdown: Arc<Notify>,
) {
    let Ok(ws_stream) = tokio_tungstenite::accept_async(stream).await else {
        return;
    };
    let index = accepted.fetch_add(1, Ordering::SeqCst);
    if index < drops {
        return;
    }

    let (mut write, mut read) = ws_stream.split();

    loop {
        let msg = tokio::select! {
            msg = read.next() => msg,
            _ = kick.notified() => return,
            _ = shutdown.notified() => return,
        };

        let replies = match msg {
            Some(Ok(Message::Text(text))) => {
                let value: serde_json::Value = serde_json::from_str(&text).unwrap_or_default();
                let kind = value["type"].as_str().unwrap_or_default().to_string();
                received.lock().push(kind.clone());
                script(&kind, &value)
            }
            Some(Ok(Message::Binary(bytes))) => {
                received.lock().push(format!("binary:{}", bytes.len()));
                vec![serde_json::json!({
                    "type": "assistant_text",
                    "text": format!("heard {} bytes", bytes.len()),
                })
                .to_string()]
            }
            Some(Ok(Message::Close(_))) | Some(Err(_)) | None => return,
            Some(Ok(_)) => continue,
        };

        for reply in replies {
            if write.send(Message::Text(reply)).await.is_err() {
                return;
            }
        }
    }
}

fn script(kind: &str, value: &serde_json::Value) -> Vec<String> {
    use serde_json::json;

    match kind {
        "start_session" => vec![
            json!({"type": "avatar", "state": "idle"}).to_string(),
            json!({"type": "ready", "session_id": "s1", "example_concepts": ["X"]}).to_string(),
        ],
        "start_concept" => vec![
            json!({"type": "token", "text": "Hel"}).to_string(),
            json!({"type": "token", "text": "lo"}).to_string(),
        ],
        "user_text" => match value["text"].as_str().unwrap_or_default() {
            "garbage" => vec![
                "not json".to_string(),
                json!({"type": "token", "text": "ok"}).to_string(),
            ],
            "fail" => vec![json!({"type": "error", "message": "model offline"}).to_string()],
            "speak" => vec![json!({
                "type": "tts_chunk",
                "data": base64::engine::general_purpose::STANDARD.encode(wav_silence(16_000, 1_600)),
            })
            .to_string()],
            text => vec![
                json!({"type": "assistant_text", "text": format!("You said: {}", text)})
                    .to_string(),
            ],
        },
        _ => Vec::new(),
    }
}

/// Mono 16-bit PCM WAV of silence
pub fn wav_silence(sample_rate: u32, frames: u32) -> Vec<u8> {
    let data_size = frames * 2;
    let mut buf = Vec::with_capacity(44 + data_size as usize);
    buf.extend_from_slice(b"RIFF");
    buf.extend_from_slice(&(36 + data_size).to_le_bytes());
    buf.extend_from_slice(b"WAVE");
    buf.extend_from_slice(b"fmt ");
    buf.extend_from_slice(&16u32.to_le_bytes());
    buf.extend_from_slice(&1u16.to_le_bytes()); // PCM
    buf.extend_from_slice(&1u16.to_le_bytes()); // mono
    buf.extend_from_slice(&sample_rate.to_le_bytes());
    buf.extend_from_slice(&(sample_rate * 2).to_le_bytes());
    buf.extend_from_slice(&2u16.to_le_bytes());
    buf.extend_from_slice(&16u16.to_le_bytes());
    buf.extend_from_slice(b"data");
    buf.extend_from_slice(&data_size.to_le_bytes());
    buf.resize(buf.len() + data_size as usize, 0);
    buf
}

/// A URL nothing listens on
pub async fn unused_url() -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    drop(listener);
    format!("ws://{}/ws", addr)
}
