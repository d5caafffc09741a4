use thiserror::Error;

/// Errors raised on the capture side of the pipeline.
#[derive(Debug, Error)]
pub enum AudioError {
    /// The input device disappeared or its stream died. Fatal: the
    /// listen loop cannot proceed without frames.
    #[error("audio device unavailable: {0}")]
    Device(String),

    /// A frame's byte length is not an exact multiple of the sample
    /// width. The frame is dropped and the loop continues.
    #[error("frame of {len} bytes is not a multiple of sample width {width}")]
    FrameSize { len: usize, width: usize },
}

/// Errors raised by the downstream collaborators. None of these stop
/// the capture loop; the affected utterance or flush is retried or
/// discarded per stage.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("transcription failed: {0}")]
    Transcription(String),

    #[error("transcript cleanup failed: {0}")]
    Cleanup(String),

    #[error("index upsert failed: {0}")]
    Indexing(String),
}
