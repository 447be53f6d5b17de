//! Audio playback for synthesized speech
//!
//! Decoding and output sit behind the [`AudioDecoder`] and [`AudioOutput`]
//! traits; the [`PlaybackSequencer`] drives both and makes sure only the most
//! recent chunk is ever heard.

pub mod decoder;
pub mod output;
pub mod sequencer;

#[cfg(test)]
pub(crate) mod testing;

pub use decoder::SymphoniaDecoder;
pub use output::ClockedOutput;
pub use sequencer::{PlaybackEvent, PlaybackOutcome, PlaybackRequest, PlaybackSequencer};

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;

/// PCM audio ready for output. Samples are interleaved.
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    pub sample_rate: u32,
    pub channels: usize,
    pub samples: Vec<f32>,
}

impl DecodedAudio {
    /// Number of sample frames (one sample per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            return 0;
        }
        self.samples.len() / self.channels
    }

    /// Playback length at the buffer's sample rate
    pub fn duration(&self) -> Duration {
        if self.sample_rate == 0 {
            return Duration::ZERO;
        }
        Duration::from_secs_f64(self.frames() as f64 / f64::from(self.sample_rate))
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }
}

/// Turns an encoded audio payload into PCM
#[async_trait]
pub trait AudioDecoder: Send + Sync {
    async fn decode(&self, payload: Arc<[u8]>) -> Result<DecodedAudio>;
}

/// Renders decoded audio
///
/// `play` resolves when playback ends naturally. Dropping the future stops
/// the sound.
#[async_trait]
pub trait AudioOutput: Send + Sync {
    async fn play(&self, audio: DecodedAudio) -> Result<()>;
}
