use crate::error::AudioError;

/// Scale applied to the normalized RMS so thresholds stay in a
/// human-readable range.
const RMS_SCALE: f32 = 1000.0;

const I16_NORMALIZE: f32 = 1.0 / 32768.0;

/// Root-mean-square loudness of one PCM frame.
///
/// Samples are normalized to [-1, 1] against the maximum representable
/// 16-bit magnitude, so the result is non-negative and bounded by
/// `RMS_SCALE`. A frame whose byte length is not an exact multiple of
/// the sample width is rejected, never silently truncated; an empty
/// frame is rejected for the same reason. Config validation pins the
/// sample width to 16-bit PCM, so decoding assumes i16 little-endian.
pub fn rms_level(pcm: &[u8], sample_width: usize) -> Result<f32, AudioError> {
    if pcm.is_empty() || sample_width == 0 || pcm.len() % sample_width != 0 {
        return Err(AudioError::FrameSize {
            len: pcm.len(),
            width: sample_width,
        });
    }

    let mut sum_squares = 0.0f32;
    for bytes in pcm.chunks_exact(2) {
        let sample = i16::from_le_bytes([bytes[0], bytes[1]]);
        let n = sample as f32 * I16_NORMALIZE;
        sum_squares += n * n;
    }

    let count = (pcm.len() / 2) as f32;
    Ok((sum_squares / count).sqrt() * RMS_SCALE)
}
