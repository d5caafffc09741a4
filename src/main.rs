use ambient_scribe::{Config, Engine, MicrophoneBackend};
use anyhow::Result;
use tracing::info;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let cfg = Config::load("config/ambient-scribe")?;

    info!("Ambient Scribe v0.1.0");
    info!(
        "Audio format: {} Hz, {} channels, {} samples/frame",
        cfg.audio.rate, cfg.audio.channels, cfg.audio.chunk
    );
    info!(
        "Endpointing: threshold {}, grace {}s, cap {}min",
        cfg.listen.threshold, cfg.listen.timeout_length, cfg.listen.max_rec_time
    );
    info!("Target index: {}", cfg.index.index_name);

    let backend = MicrophoneBackend::new(cfg.capture_config());
    let engine = Engine::new(cfg)?;

    engine.run(Box::new(backend)).await
}
