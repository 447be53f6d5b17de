use super::{AudioDecoder, AudioOutput, DecodedAudio};
use std::sync::Arc;
use tokio::sync::mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

/// One audio chunk waiting to be decoded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlaybackRequest {
    pub seq: u64,
    pub payload: Arc<[u8]>,
}

/// Completion reported by a decode or playback task
///
/// These arrive on the receiver returned by [`PlaybackSequencer::new`] and
/// must be fed back through [`PlaybackSequencer::handle`].
#[derive(Debug, Clone, PartialEq)]
pub enum PlaybackEvent {
    Decoded { seq: u64, audio: DecodedAudio },
    DecodeFailed { seq: u64, reason: String },
    Finished { seq: u64 },
    Failed { seq: u64, reason: String },
}

/// What handling a [`PlaybackEvent`] did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// This chunk is now the audible one
    Started(u64),
    /// Newer audio arrived while this chunk was decoding
    Discarded(u64),
    /// The audible chunk played to the end
    Ended(u64),
    /// Decode or playback of this chunk failed
    Failed { seq: u64, reason: String },
    /// Completion of playback that was already stopped
    Ignored,
}

struct Playing {
    seq: u64,
    task: JoinHandle<()>,
}

/// Latest-wins audio sequencer
///
/// Every submitted chunk gets the next sequence number. Decoding runs in a
/// spawned task; when it completes, the buffer is only played if no newer
/// chunk has been submitted in the meantime. Starting a playback stops the
/// previous one, so at most one chunk is audible.
pub struct PlaybackSequencer {
    decoder: Arc<dyn AudioDecoder>,
    output: Arc<dyn AudioOutput>,
    latest: u64,
    playing: Option<Playing>,
    events: UnboundedSender<PlaybackEvent>,
}

impl PlaybackSequencer {
    pub fn new(
        decoder: Arc<dyn AudioDecoder>,
        output: Arc<dyn AudioOutput>,
    ) -> (Self, UnboundedReceiver<PlaybackEvent>) {
        let (events, rx) = unbounded_channel();
        let sequencer = Self {
            decoder,
            output,
            latest: 0,
            playing: None,
            events,
        };
        (sequencer, rx)
    }

    /// Number the payload and start decoding it. Returns the sequence number.
    pub fn submit(&mut self, payload: impl Into<Arc<[u8]>>) -> u64 {
        self.latest += 1;
        let request = PlaybackRequest {
            seq: self.latest,
            payload: payload.into(),
        };
        debug!(
            "Decoding audio chunk {} ({} bytes)",
            request.seq,
            request.payload.len()
        );

        let decoder = Arc::clone(&self.decoder);
        let events = self.events.clone();
        tokio::spawn(async move {
            let seq = request.seq;
            let event = match decoder.decode(request.payload).await {
                Ok(audio) => PlaybackEvent::Decoded { seq, audio },
                Err(e) => PlaybackEvent::DecodeFailed {
                    seq,
                    reason: e.to_string(),
                },
            };
            // Receiver is gone after teardown; the result is simply dropped
            let _ = events.send(event);
        });

        request.seq
    }

    /// Apply a completion event
    pub fn handle(&mut self, event: PlaybackEvent) -> PlaybackOutcome {
        match event {
            PlaybackEvent::Decoded { seq, audio } => {
                if seq != self.latest {
                    debug!(
                        "Discarding audio chunk {}, chunk {} is newer",
                        seq, self.latest
                    );
                    return PlaybackOutcome::Discarded(seq);
                }
                self.start(seq, audio);
                PlaybackOutcome::Started(seq)
            }
            PlaybackEvent::DecodeFailed { seq, reason } => {
                error!("Failed to decode audio chunk {}: {}", seq, reason);
                PlaybackOutcome::Failed { seq, reason }
            }
            PlaybackEvent::Finished { seq } => {
                if self.take_playing(seq) {
                    debug!("Audio chunk {} finished", seq);
                    PlaybackOutcome::Ended(seq)
                } else {
                    PlaybackOutcome::Ignored
                }
            }
            PlaybackEvent::Failed { seq, reason } => {
                if self.take_playing(seq) {
                    error!("Playback of audio chunk {} failed: {}", seq, reason);
                    PlaybackOutcome::Failed { seq, reason }
                } else {
                    PlaybackOutcome::Ignored
                }
            }
        }
    }

    /// Stop the audible chunk, if any
    pub fn stop(&mut self) {
        if let Some(playing) = self.playing.take() {
            info!("Stopping audio chunk {}", playing.seq);
            playing.task.abort();
        }
    }

    /// Highest sequence number handed out so far
    pub fn latest(&self) -> u64 {
        self.latest
    }

    /// Sequence number of the audible chunk
    pub fn playing(&self) -> Option<u64> {
        self.playing.as_ref().map(|p| p.seq)
    }

    fn start(&mut self, seq: u64, audio: DecodedAudio) {
        self.stop();

        let output = Arc::clone(&self.output);
        let events = self.events.clone();
        let task = tokio::spawn(async move {
            let event = match output.play(audio).await {
                Ok(()) => PlaybackEvent::Finished { seq },
                Err(e) => PlaybackEvent::Failed {
                    seq,
                    reason: e.to_string(),
                },
            };
            let _ = events.send(event);
        });

        self.playing = Some(Playing { seq, task });
    }

    fn take_playing(&mut self, seq: u64) -> bool {
        match &self.playing {
            Some(playing) if playing.seq == seq => {
                self.playing = None;
                true
            }
            _ => false,
        }
    }
}

impl Drop for PlaybackSequencer {
    fn drop(&mut self) {
        self.stop();
    }
}
