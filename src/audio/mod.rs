pub mod backend;
pub mod device;
pub mod loudness;
pub mod wav;

pub use backend::{CaptureBackend, CaptureConfig, Frame};
pub use device::MicrophoneBackend;
pub use loudness::rms_level;
pub use wav::write_pcm;
