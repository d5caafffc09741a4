use anyhow::{Context, Result};
use std::path::Path;

use super::backend::CaptureConfig;

/// Write raw little-endian 16-bit PCM to a WAV container with the
/// configured sample rate and channel count.
pub fn write_pcm(path: &Path, pcm: &[u8], config: &CaptureConfig) -> Result<()> {
    let spec = hound::WavSpec {
        channels: config.channels,
        sample_rate: config.sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };

    let mut writer = hound::WavWriter::create(path, spec)
        .with_context(|| format!("Failed to create WAV file: {:?}", path))?;

    for bytes in pcm.chunks_exact(2) {
        writer
            .write_sample(i16::from_le_bytes([bytes[0], bytes[1]]))
            .context("Failed to write sample to WAV")?;
    }

    writer.finalize().context("Failed to finalize WAV file")?;

    Ok(())
}
