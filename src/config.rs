use anyhow::{bail, Context, Result};
use serde::Deserialize;

use crate::audio::CaptureConfig;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub audio: AudioSettings,
    pub listen: ListenSettings,
    pub storage: StorageSettings,
    pub transcription: TranscriptionSettings,
    pub cleanup: CleanupSettings,
    pub index: IndexSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioSettings {
    /// Samples per captured frame.
    pub chunk: usize,
    /// Sample rate in Hz.
    pub rate: u32,
    pub channels: u16,
    /// Bytes per sample. Only 16-bit PCM (2) is supported.
    pub swidth: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ListenSettings {
    /// Loudness value above which a frame counts as speech.
    pub threshold: f32,
    /// Silence grace period in seconds before a recording ends.
    pub timeout_length: f64,
    /// Absolute recording cap in minutes.
    pub max_rec_time: u64,
    /// Inter-utterance gap in seconds that triggers a batch flush.
    pub speech_gap_delay: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StorageSettings {
    pub audio_dir: String,
    pub transcript_dir: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TranscriptionSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub language: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CleanupSettings {
    pub endpoint: String,
    pub api_key: String,
    pub model: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IndexSettings {
    pub embed_endpoint: String,
    pub upsert_endpoint: String,
    pub api_key: String,
    pub embed_model: String,
    pub index_name: String,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub timeout_secs: u64,
}

impl Config {
    /// Load and validate configuration. Every key is required; a missing
    /// key or a value that fails validation is a fatal startup error.
    pub fn load(path: &str) -> Result<Self> {
        let settings = config::Config::builder()
            .add_source(config::File::with_name(path))
            .add_source(config::Environment::with_prefix("SCRIBE").separator("__"))
            .build()?;

        let cfg: Config = settings
            .try_deserialize()
            .context("configuration is incomplete")?;
        cfg.validate()?;

        Ok(cfg)
    }

    fn validate(&self) -> Result<()> {
        if self.audio.swidth != 2 {
            bail!(
                "unsupported sample width {} (only 16-bit PCM is supported)",
                self.audio.swidth
            );
        }
        if self.audio.chunk == 0 {
            bail!("audio.chunk must be at least one sample");
        }
        if self.audio.rate == 0 || self.audio.channels == 0 {
            bail!("audio.rate and audio.channels must be non-zero");
        }
        if self.listen.timeout_length <= 0.0 {
            bail!("listen.timeout_length must be positive");
        }
        if self.listen.max_rec_time == 0 {
            bail!("listen.max_rec_time must be at least one minute");
        }
        if self.index.chunk_size == 0 {
            bail!("index.chunk_size must be non-zero");
        }
        if self.index.chunk_overlap >= self.index.chunk_size {
            bail!(
                "index.chunk_overlap ({}) must be smaller than index.chunk_size ({})",
                self.index.chunk_overlap,
                self.index.chunk_size
            );
        }
        Ok(())
    }

    /// The fixed capture format shared by every stage.
    pub fn capture_config(&self) -> CaptureConfig {
        CaptureConfig {
            sample_rate: self.audio.rate,
            channels: self.audio.channels,
            sample_width: self.audio.swidth,
            frame_samples: self.audio.chunk,
        }
    }
}
