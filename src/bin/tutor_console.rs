//! Tutor Console - terminal client for the local tutor backend
//!
//! Connects to the backend, prints the tutor's replies as they stream in and
//! forwards what you type.
//!
//! Usage:
//!   ./tutor_console
//!   ./tutor_console path/to/session.yaml
//!   TUTOR_WS_URL=ws://127.0.0.1:9000/ws ./tutor_console
//!
//! Commands:
//!   /concept <name>   start a lesson on a concept
//!   /audio <path>     send a recorded audio file
//!   /concepts         list the example concepts
//!   /metrics          show transport counters
//!   /quit             exit (Ctrl+C works too)
//!   anything else     sent as a question

use anyhow::{Context, Result};
use local_tutor::bin_common::{load_config_from_env, parse_args, ConfigType};
use local_tutor::tutor_session::{
    init_tracing, SessionConfig, SessionHandle, SessionManager, SessionSnapshot,
};
use std::io::Write;
use std::path::{Path, PathBuf};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file
    dotenv::dotenv().ok();

    let config = load_config()?;

    init_tracing(&config.log_level);
    config.log();

    print_banner(&config.endpoint);

    let session = SessionManager::new(config).start().await?;
    let mut updates = session.subscribe();
    let mut previous = SessionSnapshot::default();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("Ctrl+C received, shutting down");
                break;
            }
            changed = updates.changed() => {
                if changed.is_err() {
                    warn!("Session task stopped");
                    break;
                }
                let snapshot = updates.borrow_and_update().clone();
                render(&previous, &snapshot);
                previous = snapshot;
            }
            line = lines.next_line() => {
                match line.context("failed to read stdin")? {
                    Some(line) => {
                        if !handle_input(&session, &previous, line.trim()).await {
                            break;
                        }
                    }
                    None => break,
                }
            }
        }
    }

    session.teardown().await;
    println!("\nBye.");
    Ok(())
}

fn load_config() -> Result<SessionConfig> {
    let (config_path, explicit) = match parse_args().first() {
        Some(path) => (PathBuf::from(path), true),
        None => (load_config_from_env(ConfigType::Session), false),
    };
    if explicit || config_path.exists() {
        return SessionConfig::load(&config_path)
            .with_context(|| format!("failed to load {}", config_path.display()));
    }

    let mut config = SessionConfig::default();
    config.apply_overrides(|key| std::env::var(key).ok());
    config.validate()?;
    Ok(config)
}

/// Returns false when the user asked to quit. Failed commands are reported
/// and the console keeps running.
async fn handle_input(
    session: &SessionHandle,
    snapshot: &SessionSnapshot,
    line: &str,
) -> bool {
    match run_command(session, snapshot, line).await {
        Ok(keep_going) => keep_going,
        Err(e) => {
            println!("[error: {:#}]", e);
            true
        }
    }
}

async fn run_command(
    session: &SessionHandle,
    snapshot: &SessionSnapshot,
    line: &str,
) -> Result<bool> {
    if line.is_empty() {
        return Ok(true);
    }

    let (command, arg) = match line.split_once(' ') {
        Some((command, arg)) => (command, arg.trim()),
        None => (line, ""),
    };

    match command {
        "/quit" | "/exit" => return Ok(false),
        "/concepts" => {
            if snapshot.state.concepts.is_empty() {
                println!("(no example concepts yet)");
            }
            for concept in &snapshot.state.concepts {
                println!("  - {}", concept);
            }
        }
        "/concept" if !arg.is_empty() => {
            println!();
            session.start_concept(arg)?;
        }
        "/audio" if !arg.is_empty() => {
            let bytes = tokio::fs::read(Path::new(arg))
                .await
                .with_context(|| format!("failed to read {}", arg))?;
            println!("Sending {} bytes of audio", bytes.len());
            session.send_audio(bytes)?;
        }
        "/metrics" => {
            let metrics = session.metrics().await?;
            println!(
                "sent {} | received {} | dropped {} | reconnects {} | {:?}",
                metrics.frames_sent,
                metrics.frames_received,
                metrics.frames_dropped,
                metrics.reconnect_count,
                metrics.connection_state
            );
        }
        "/concept" | "/audio" => println!("usage: {} <argument>", command),
        _ => {
            println!();
            session.send_text(line)?;
        }
    }

    Ok(true)
}

fn render(previous: &SessionSnapshot, current: &SessionSnapshot) {
    if current.connected != previous.connected {
        if current.connected {
            println!("[connected]");
        } else {
            println!("[disconnected, retrying]");
        }
    }

    if current.error != previous.error {
        if let Some(error) = &current.error {
            println!("[connection error: {}]", error);
        }
    }

    if current.state.session_id != previous.state.session_id {
        if let Some(id) = &current.state.session_id {
            println!("[session {}]", id);
        }
    }

    if current.state.concepts != previous.state.concepts && !current.state.concepts.is_empty() {
        println!("Try: {}", current.state.concepts.join(", "));
    }

    if current.state.avatar_state != previous.state.avatar_state {
        info!("Avatar: {}", current.state.avatar_state);
    }

    let before = &previous.state.assistant_text;
    let now = &current.state.assistant_text;
    if now != before {
        match now.strip_prefix(before.as_str()) {
            Some(suffix) if !before.is_empty() => print!("{}", suffix),
            _ if now.is_empty() => {}
            _ => print!("\ntutor> {}", now),
        }
        let _ = std::io::stdout().flush();
    }

    if current.backend_errors != previous.backend_errors {
        if let Some(error) = &current.last_backend_error {
            println!("\n[tutor error: {}]", error);
        }
    }

    if current.last_playback_error != previous.last_playback_error {
        if let Some(error) = &current.last_playback_error {
            println!("\n[audio error: {}]", error);
        }
    }
}

fn print_banner(endpoint: &str) {
    println!("╔══════════════════════════════════════════╗");
    println!("║              LOCAL TUTOR                 ║");
    println!("╚══════════════════════════════════════════╝");
    println!("Backend: {}", endpoint);
    println!("Type a question, /concept <name>, /concepts, /audio <path>, /metrics or /quit");
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn offline_session() -> SessionHandle {
        let config = SessionConfig {
            endpoint: "ws://127.0.0.1:9/ws".into(),
            ..Default::default()
        };
        SessionManager::new(config).start().await.unwrap()
    }

    #[tokio::test]
    async fn failed_commands_keep_console_running() {
        let session = offline_session().await;
        let snapshot = SessionSnapshot::default();

        assert!(handle_input(&session, &snapshot, "/audio /no/such/recording.wav").await);
        assert!(handle_input(&session, &snapshot, "/concept Gravity").await);
        assert!(handle_input(&session, &snapshot, "why is the sky blue?").await);

        session.teardown().await;
    }

    #[tokio::test]
    async fn quit_ends_console() {
        let session = offline_session().await;

        assert!(!handle_input(&session, &SessionSnapshot::default(), "/quit").await);
        session.teardown().await;
    }
}
