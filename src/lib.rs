pub mod audio;
pub mod batch;
pub mod capture;
pub mod config;
pub mod engine;
pub mod error;
pub mod index;
pub mod transcribe;

pub use audio::{CaptureBackend, CaptureConfig, Frame, MicrophoneBackend};
pub use batch::{ArtifactRegistry, BatchDecision, BatchGate, TranscriptArtifact};
pub use capture::{ListenParams, Listener, Recording, RecordingSession, SessionStatus};
pub use config::Config;
pub use engine::Engine;
pub use error::{AudioError, PipelineError};
pub use index::{split_text, DocumentIndexer, VectorIndexClient};
pub use transcribe::{CleanupClient, SpeechToTextClient, DISCARD_SENTINEL};
