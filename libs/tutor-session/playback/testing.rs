//! Decoder and output doubles for playback tests
//!
//! Payloads are a single tag byte; the decoded buffer carries the tag in its
//! samples so the output can tell chunks apart.

use super::{AudioDecoder, AudioOutput, DecodedAudio};
use crate::error::{Result, SessionError};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

pub(crate) fn tagged(tag: u8) -> Vec<u8> {
    vec![tag]
}

/// Decoder whose completion for a given tag is held until released
#[derive(Default)]
pub(crate) struct GatedDecoder {
    gates: Mutex<HashMap<u8, oneshot::Receiver<()>>>,
    releases: Mutex<HashMap<u8, oneshot::Sender<()>>>,
}

impl GatedDecoder {
    /// Every tag decodes immediately
    pub(crate) fn open() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Listed tags wait for [`GatedDecoder::release`]
    pub(crate) fn gated(tags: &[u8]) -> Arc<Self> {
        let decoder = Self::default();
        for &tag in tags {
            let (tx, rx) = oneshot::channel();
            decoder.gates.lock().insert(tag, rx);
            decoder.releases.lock().insert(tag, tx);
        }
        Arc::new(decoder)
    }

    pub(crate) fn release(&self, tag: u8) {
        if let Some(tx) = self.releases.lock().remove(&tag) {
            let _ = tx.send(());
        }
    }
}

#[async_trait]
impl AudioDecoder for GatedDecoder {
    async fn decode(&self, payload: Arc<[u8]>) -> Result<DecodedAudio> {
        let tag = match &payload[..] {
            [tag] => *tag,
            _ => return Err(SessionError::AudioDecode("unrecognized payload".into())),
        };

        let gate = self.gates.lock().remove(&tag);
        if let Some(gate) = gate {
            let _ = gate.await;
        }

        Ok(DecodedAudio {
            sample_rate: 1_000,
            channels: 1,
            samples: vec![f32::from(tag); 10],
        })
    }
}

/// Output that records which chunks started, finished and were stopped
pub(crate) struct RecordingOutput {
    hold: Option<Duration>,
    started: Mutex<Vec<u8>>,
    played: Mutex<Vec<u8>>,
    stopped: Mutex<Vec<u8>>,
}

impl RecordingOutput {
    /// Playback ends naturally after `hold`
    pub(crate) fn holding(hold: Duration) -> Arc<Self> {
        Arc::new(Self::new(Some(hold)))
    }

    /// Playback only ends when stopped
    pub(crate) fn forever() -> Arc<Self> {
        Arc::new(Self::new(None))
    }

    fn new(hold: Option<Duration>) -> Self {
        Self {
            hold,
            started: Mutex::new(Vec::new()),
            played: Mutex::new(Vec::new()),
            stopped: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn played(&self) -> Vec<u8> {
        self.played.lock().clone()
    }

    pub(crate) fn stopped(&self) -> Vec<u8> {
        self.stopped.lock().clone()
    }

    pub(crate) async fn wait_started(&self, tag: u8) {
        wait_until(|| self.started.lock().contains(&tag)).await;
    }

    pub(crate) async fn wait_stopped(&self, tag: u8) {
        wait_until(|| self.stopped.lock().contains(&tag)).await;
    }
}

struct StopGuard<'a> {
    output: &'a RecordingOutput,
    tag: u8,
    finished: bool,
}

impl Drop for StopGuard<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.output.stopped.lock().push(self.tag);
        }
    }
}

#[async_trait]
impl AudioOutput for RecordingOutput {
    async fn play(&self, audio: DecodedAudio) -> Result<()> {
        let tag = audio.samples.first().copied().unwrap_or_default() as u8;
        self.started.lock().push(tag);

        let mut guard = StopGuard {
            output: self,
            tag,
            finished: false,
        };
        match self.hold {
            Some(hold) => tokio::time::sleep(hold).await,
            None => std::future::pending::<()>().await,
        }
        guard.finished = true;

        self.played.lock().push(tag);
        Ok(())
    }
}

async fn wait_until(mut condition: impl FnMut() -> bool) {
    tokio::time::timeout(Duration::from_secs(2), async {
        while !condition() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await
    .expect("condition not reached in time");
}
