use anyhow::Result;
use tokio::sync::mpsc;

/// One fixed-size block of PCM samples read from the input device.
/// Immutable once produced; later stages copy it into their own buffers.
#[derive(Debug, Clone)]
pub struct Frame {
    /// Raw audio bytes (little-endian 16-bit PCM, interleaved).
    pub pcm: Vec<u8>,
    /// Milliseconds since capture started.
    pub timestamp_ms: u64,
}

/// Fixed capture format shared by every stage of the pipeline.
#[derive(Debug, Clone, Copy)]
pub struct CaptureConfig {
    /// Sample rate in Hz.
    pub sample_rate: u32,
    /// Number of channels (1 = mono, 2 = stereo).
    pub channels: u16,
    /// Bytes per sample (16-bit PCM only).
    pub sample_width: usize,
    /// Samples per frame, per channel.
    pub frame_samples: usize,
}

impl CaptureConfig {
    /// Size of one frame in bytes.
    pub fn frame_bytes(&self) -> usize {
        self.frame_samples * self.channels as usize * self.sample_width
    }

    /// Wall-clock duration of one frame in seconds.
    pub fn frame_duration_secs(&self) -> f64 {
        self.frame_samples as f64 / self.sample_rate as f64
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal input stream on a dedicated thread
/// - Scripted: canned frames for tests
#[async_trait::async_trait]
pub trait CaptureBackend: Send {
    /// Start capturing audio.
    ///
    /// Returns a channel receiver that yields one fixed-size frame per
    /// `recv()`. The channel closing while `is_capturing()` still holds
    /// means the device was lost.
    async fn start(&mut self) -> Result<mpsc::Receiver<Frame>>;

    /// Stop capturing and release the device.
    async fn stop(&mut self) -> Result<()>;

    /// Whether capture has started and has not been asked to stop.
    fn is_capturing(&self) -> bool;

    /// Backend name for logging.
    fn name(&self) -> &str;
}
