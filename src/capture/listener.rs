use tokio::sync::mpsc;
use tracing::{error, info, warn};

use super::session::{Recording, RecordingSession, SessionStatus};
use crate::audio::{rms_level, CaptureConfig, Frame};

/// Endpointing parameters for the continuous listen loop.
#[derive(Debug, Clone, Copy)]
pub struct ListenParams {
    /// Loudness value above which a frame counts as speech.
    pub threshold: f32,
    /// Silence grace period in milliseconds.
    pub timeout_ms: u64,
    /// Absolute recording cap in milliseconds.
    pub max_duration_ms: u64,
}

enum ListenState {
    Idle,
    RecordingActive(RecordingSession),
}

/// The continuous listen loop: watches the frame stream and carves out
/// one bounded recording per detected utterance.
///
/// At most one session is active at a time; a new utterance cannot
/// start until the previous one is finalized. Completed recordings are
/// handed downstream without blocking, so capture cadence is preserved
/// even when persistence or transcription is slow.
pub struct Listener {
    config: CaptureConfig,
    params: ListenParams,
    recordings: mpsc::Sender<Recording>,
}

impl Listener {
    pub fn new(
        config: CaptureConfig,
        params: ListenParams,
        recordings: mpsc::Sender<Recording>,
    ) -> Self {
        Self {
            config,
            params,
            recordings,
        }
    }

    /// Run until the frame stream closes. Returns the number of
    /// utterances finalized.
    ///
    /// A frame stream that closes mid-utterance discards the unfinished
    /// session without touching storage; whether the closure was a
    /// clean shutdown or a device loss is for the caller to decide.
    pub async fn run(self, mut frames: mpsc::Receiver<Frame>) -> usize {
        info!("Listening");

        let mut state = ListenState::Idle;
        let mut finalized = 0usize;

        while let Some(frame) = frames.recv().await {
            state = match state {
                ListenState::Idle => self.watch_for_speech(frame),
                ListenState::RecordingActive(session) => {
                    let (next, completed) = self.drive_session(session, frame);
                    if completed {
                        finalized += 1;
                    }
                    next
                }
            };
        }

        if matches!(state, ListenState::RecordingActive(_)) {
            info!("Frame stream closed mid-utterance; discarding unfinished recording");
        }

        finalized
    }

    fn watch_for_speech(&self, frame: Frame) -> ListenState {
        match rms_level(&frame.pcm, self.config.sample_width) {
            Ok(level) if level > self.params.threshold => {
                info!("Recording (loudness {:.1})", level);
                ListenState::RecordingActive(RecordingSession::begin(
                    frame,
                    self.config,
                    self.params.threshold,
                    self.params.timeout_ms,
                    self.params.max_duration_ms,
                ))
            }
            Ok(_) => ListenState::Idle,
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                ListenState::Idle
            }
        }
    }

    fn drive_session(&self, mut session: RecordingSession, frame: Frame) -> (ListenState, bool) {
        match session.step(frame) {
            Ok(SessionStatus::Recording) => (ListenState::RecordingActive(session), false),
            Ok(SessionStatus::Complete(recording)) => {
                self.hand_off(recording);
                (ListenState::Idle, true)
            }
            Err(e) => {
                warn!("Dropping malformed frame: {}", e);
                (ListenState::RecordingActive(session), false)
            }
        }
    }

    /// Hand a finalized recording to the persistence stage. The capture
    /// loop never blocks here: a saturated queue drops the utterance.
    fn hand_off(&self, recording: Recording) {
        match self.recordings.try_send(recording) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(_)) => {
                error!("Recording queue full; utterance dropped");
            }
            Err(mpsc::error::TrySendError::Closed(_)) => {
                warn!("Recording queue closed; utterance dropped");
            }
        }
    }
}
