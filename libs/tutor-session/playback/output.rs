use super::{AudioOutput, DecodedAudio};
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use tracing::debug;

/// Headless output that holds playback for the buffer's duration
///
/// Used where no sound device is wanted (console client, tests). Playback
/// ends naturally once the clock runs out; dropping the future stops it.
#[derive(Debug, Clone, Copy, Default)]
pub struct ClockedOutput;

impl ClockedOutput {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AudioOutput for ClockedOutput {
    async fn play(&self, audio: DecodedAudio) -> Result<()> {
        if audio.is_empty() {
            return Err(SessionError::Playback("empty audio buffer".into()));
        }

        let duration = audio.duration();
        debug!(
            "Playing {} frames at {} Hz ({:?})",
            audio.frames(),
            audio.sample_rate,
            duration
        );
        tokio::time::sleep(duration).await;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test(start_paused = true)]
    async fn holds_for_buffer_duration() {
        let audio = DecodedAudio {
            sample_rate: 16_000,
            channels: 1,
            samples: vec![0.0; 8_000],
        };

        let started = tokio::time::Instant::now();
        ClockedOutput::new().play(audio).await.unwrap();
        assert!(started.elapsed() >= Duration::from_millis(500));
    }

    #[tokio::test]
    async fn empty_buffer_is_a_playback_error() {
        let audio = DecodedAudio {
            sample_rate: 16_000,
            channels: 1,
            samples: Vec::new(),
        };
        assert!(matches!(
            ClockedOutput::new().play(audio).await,
            Err(SessionError::Playback(_))
        ));
    }
}
