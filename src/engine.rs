use anyhow::{Context, Result};
use chrono::Utc;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, error, info, warn};

use crate::audio::{write_pcm, CaptureBackend, CaptureConfig};
use crate::batch::{ArtifactRegistry, BatchGate, TranscriptArtifact};
use crate::capture::{trim_trailing_silence, ListenParams, Listener, Recording};
use crate::config::Config;
use crate::error::AudioError;
use crate::index::{DocumentIndexer, VectorIndexClient};
use crate::transcribe::{CleanupClient, SpeechToTextClient, DISCARD_SENTINEL};

/// Finalized recordings waiting on persistence + transcription.
const RECORDING_QUEUE: usize = 8;
/// New artifacts waiting on a batch decision.
const ARTIFACT_QUEUE: usize = 16;

/// Everything the per-utterance pipeline needs, shared across tasks.
struct UtteranceStage {
    capture: CaptureConfig,
    threshold: f32,
    grace_secs: f64,
    audio_dir: PathBuf,
    transcript_dir: PathBuf,
    speech: SpeechToTextClient,
    cleanup: CleanupClient,
    registry: Arc<Mutex<ArtifactRegistry>>,
}

/// Process context owning configuration, directories, and the stage
/// pipeline. No ambient globals: every component receives what it
/// needs from here.
pub struct Engine {
    config: Config,
    capture: CaptureConfig,
    stage: Arc<UtteranceStage>,
    gate: Arc<BatchGate>,
}

impl Engine {
    pub fn new(config: Config) -> Result<Self> {
        let capture = config.capture_config();

        let speech = SpeechToTextClient::new(&config.transcription)?;
        let cleanup = CleanupClient::new(&config.cleanup)?;
        let indexer: Arc<dyn DocumentIndexer> = Arc::new(VectorIndexClient::new(&config.index)?);

        let registry = Arc::new(Mutex::new(ArtifactRegistry::new()));
        let gate = Arc::new(BatchGate::new(
            Arc::clone(&registry),
            indexer,
            config.listen.speech_gap_delay,
        ));

        let stage = Arc::new(UtteranceStage {
            capture,
            threshold: config.listen.threshold,
            grace_secs: config.listen.timeout_length,
            audio_dir: PathBuf::from(&config.storage.audio_dir),
            transcript_dir: PathBuf::from(&config.storage.transcript_dir),
            speech,
            cleanup,
            registry,
        });

        Ok(Self {
            config,
            capture,
            stage,
            gate,
        })
    }

    /// Run the listen loop until the frame stream ends.
    ///
    /// The foreground loop only ever suspends on frame reads; trimming,
    /// WAV writing, transcription, and batch decisions all run on
    /// background tasks fed through bounded channels. Closing the frame
    /// stream drains those channels in order, so shutdown never leaves
    /// a half-written file behind.
    pub async fn run(&self, mut backend: Box<dyn CaptureBackend>) -> Result<()> {
        self.prepare_directories()?;

        let frames = backend.start().await?;
        info!("Capture started via {} backend", backend.name());

        let (recording_tx, recording_rx) = mpsc::channel(RECORDING_QUEUE);
        let (artifact_tx, artifact_rx) = mpsc::channel(ARTIFACT_QUEUE);

        let finisher = tokio::spawn(finish_recordings(
            Arc::clone(&self.stage),
            recording_rx,
            artifact_tx,
        ));
        let batcher = tokio::spawn(run_batch_gate(Arc::clone(&self.gate), artifact_rx));

        let params = ListenParams {
            threshold: self.config.listen.threshold,
            timeout_ms: (self.config.listen.timeout_length * 1000.0) as u64,
            max_duration_ms: self.config.listen.max_rec_time * 60 * 1000,
        };
        let listener = Listener::new(self.capture, params, recording_tx);

        let finalized = listener.run(frames).await;

        // The frame stream closed. If nobody asked the backend to stop,
        // the device is gone and that is fatal.
        let device_lost = backend.is_capturing();
        backend.stop().await?;

        finisher.await.context("Utterance pipeline task panicked")?;
        batcher.await.context("Batch gate task panicked")?;

        if device_lost {
            return Err(AudioError::Device("frame stream closed unexpectedly".into()).into());
        }

        info!("Listen loop finished after {} utterances", finalized);
        Ok(())
    }

    /// Create the working directories and clear leftovers from a
    /// previous run; stale recordings would otherwise feed the next
    /// flush.
    fn prepare_directories(&self) -> Result<()> {
        for dir in [&self.stage.audio_dir, &self.stage.transcript_dir] {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create directory {:?}", dir))?;
            sweep_files(dir)?;
        }
        Ok(())
    }
}

fn sweep_files(dir: &Path) -> Result<()> {
    let mut removed = 0usize;
    for entry in fs::read_dir(dir).with_context(|| format!("Failed to list {:?}", dir))? {
        let path = entry?.path();
        if path.is_file() {
            fs::remove_file(&path).with_context(|| format!("Failed to remove {:?}", path))?;
            removed += 1;
        }
    }
    if removed > 0 {
        info!("Cleared {} leftover files from {:?}", removed, dir);
    }
    Ok(())
}

/// Background stage: trim, persist, transcribe, clean, and register
/// each finalized recording. Failures lose at most the one utterance.
async fn finish_recordings(
    stage: Arc<UtteranceStage>,
    mut recordings: mpsc::Receiver<Recording>,
    artifacts: mpsc::Sender<TranscriptArtifact>,
) {
    while let Some(recording) = recordings.recv().await {
        if let Err(e) = handle_recording(&stage, recording, &artifacts).await {
            error!("Utterance pipeline failed: {:#}", e);
        }
    }
    debug!("Utterance pipeline drained");
}

async fn handle_recording(
    stage: &UtteranceStage,
    recording: Recording,
    artifacts: &mpsc::Sender<TranscriptArtifact>,
) -> Result<()> {
    let key = recording.timestamp_key();

    let trimmed = trim_trailing_silence(
        &recording.pcm,
        &stage.capture,
        stage.threshold,
        stage.grace_secs,
    );

    let wav_path = stage.audio_dir.join(format!("{}.wav", key));
    write_pcm(&wav_path, &trimmed, &stage.capture)?;
    info!("Saved recording: {:?}", wav_path);

    let transcript = match stage.speech.transcribe(&wav_path).await {
        Ok(text) => text,
        Err(e) => {
            warn!("Discarding utterance {}: {}", key, e);
            return Ok(());
        }
    };
    if transcript.trim() == DISCARD_SENTINEL {
        debug!("No usable speech in utterance {}", key);
        return Ok(());
    }

    let cleaned = match stage.cleanup.clean(&transcript).await {
        Ok(Some(text)) => text,
        Ok(None) => {
            debug!("Cleanup discarded utterance {}", key);
            return Ok(());
        }
        Err(e) => {
            warn!("Discarding utterance {}: {}", key, e);
            return Ok(());
        }
    };

    let artifact = {
        let mut registry = stage.registry.lock().await;
        registry.persist(&stage.transcript_dir, &key, Utc::now(), &cleaned)?
    };
    info!("Saved transcript: {:?}", artifact.path);

    artifacts
        .send(artifact)
        .await
        .context("Batch gate queue closed")?;

    Ok(())
}

/// Background stage: one gate evaluation per new artifact. Decisions
/// log inside the gate; this loop only keeps it fed.
async fn run_batch_gate(gate: Arc<BatchGate>, mut artifacts: mpsc::Receiver<TranscriptArtifact>) {
    while let Some(artifact) = artifacts.recv().await {
        debug!("Evaluating batch gate for transcript '{}'", artifact.key);
        gate.on_artifact().await;
    }
    debug!("Batch gate drained");
}
