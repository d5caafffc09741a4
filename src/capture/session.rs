use chrono::{DateTime, Utc};

use crate::audio::{rms_level, CaptureConfig, Frame};
use crate::error::AudioError;

/// A finalized utterance: contiguous PCM plus its capture timestamp.
/// Immutable after finalization; persisted exactly once.
#[derive(Debug, Clone)]
pub struct Recording {
    pub pcm: Vec<u8>,
    pub captured_at: DateTime<Utc>,
}

impl Recording {
    /// Filename key shared by the WAV file and the transcript derived
    /// from this utterance.
    pub fn timestamp_key(&self) -> String {
        self.captured_at.format("%Y%m%d%H%M%S").to_string()
    }
}

/// Outcome of feeding one frame to an active session.
#[derive(Debug)]
pub enum SessionStatus {
    /// The utterance is still going.
    Recording,
    /// The utterance ended; the finalized recording is handed back.
    Complete(Recording),
}

/// Accumulates frames for one utterance until silence or the hard cap
/// ends it.
///
/// The silence deadline renews every time a frame reaches the loudness
/// threshold, so an utterance extends indefinitely while speech
/// continues, while the max duration bounds memory and time. Timing is
/// keyed off frame timestamps rather than wall-clock reads, which keeps
/// endpointing deterministic under test.
pub struct RecordingSession {
    config: CaptureConfig,
    threshold: f32,
    timeout_ms: u64,
    max_duration_ms: u64,
    frames: Vec<u8>,
    started_ms: u64,
    silence_deadline_ms: u64,
}

impl RecordingSession {
    /// Start a session seeded with the frame that crossed the threshold.
    pub fn begin(
        trigger: Frame,
        config: CaptureConfig,
        threshold: f32,
        timeout_ms: u64,
        max_duration_ms: u64,
    ) -> Self {
        let started_ms = trigger.timestamp_ms;
        let mut frames = Vec::with_capacity(config.frame_bytes() * 32);
        frames.extend_from_slice(&trigger.pcm);

        Self {
            config,
            threshold,
            timeout_ms,
            max_duration_ms,
            frames,
            started_ms,
            silence_deadline_ms: started_ms + timeout_ms,
        }
    }

    /// Append one frame and decide whether the utterance is over.
    ///
    /// A malformed frame is reported without being appended; the
    /// session keeps its state and the caller drops the frame.
    pub fn step(&mut self, frame: Frame) -> Result<SessionStatus, AudioError> {
        let level = rms_level(&frame.pcm, self.config.sample_width)?;

        self.frames.extend_from_slice(&frame.pcm);
        if level >= self.threshold {
            self.silence_deadline_ms = frame.timestamp_ms + self.timeout_ms;
        }

        let elapsed_ms = frame.timestamp_ms.saturating_sub(self.started_ms);
        if frame.timestamp_ms > self.silence_deadline_ms || elapsed_ms >= self.max_duration_ms {
            let recording = Recording {
                pcm: std::mem::take(&mut self.frames),
                captured_at: Utc::now(),
            };
            return Ok(SessionStatus::Complete(recording));
        }

        Ok(SessionStatus::Recording)
    }
}
