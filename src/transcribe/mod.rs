//! HTTP clients for the speech-to-text and transcript-cleanup
//! collaborators. Both treat the `"."` sentinel as "discard this
//! utterance".

mod cleanup;
mod speech;

pub use cleanup::CleanupClient;
pub use speech::SpeechToTextClient;

/// Reply meaning "no usable speech in this utterance". Returned by the
/// transcription service for pure noise and by the cleanup model when a
/// transcript is judged too erroneous to keep.
pub const DISCARD_SENTINEL: &str = ".";
