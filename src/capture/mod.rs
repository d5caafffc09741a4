//! Voice-activity endpointing
//!
//! This module turns the continuous frame stream into discrete
//! utterances:
//! - `listener`: the Idle / RecordingActive loop watching loudness
//! - `session`: the dual-timeout state machine for one utterance
//! - `trim`: post-hoc truncation at the first sustained silence

mod listener;
mod session;
mod trim;

pub use listener::{ListenParams, Listener};
pub use session::{Recording, RecordingSession, SessionStatus};
pub use trim::trim_trailing_silence;
