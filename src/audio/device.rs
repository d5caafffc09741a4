use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, oneshot};
use tracing::{error, info};

use super::backend::{CaptureBackend, CaptureConfig, Frame};
use crate::error::AudioError;

/// Frames buffered between the device callback and the listen loop.
const FRAME_QUEUE: usize = 64;

/// Microphone capture via cpal.
///
/// cpal streams are not `Send`, so the stream lives on a dedicated
/// thread and frames cross into the async world over an mpsc channel.
pub struct MicrophoneBackend {
    config: CaptureConfig,
    stop: Option<Arc<AtomicBool>>,
    thread: Option<thread::JoinHandle<()>>,
    capturing: bool,
}

impl MicrophoneBackend {
    pub fn new(config: CaptureConfig) -> Self {
        Self {
            config,
            stop: None,
            thread: None,
            capturing: false,
        }
    }
}

#[async_trait::async_trait]
impl CaptureBackend for MicrophoneBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<Frame>> {
        let (frame_tx, frame_rx) = mpsc::channel(FRAME_QUEUE);
        let (ready_tx, ready_rx) = oneshot::channel();
        let stop = Arc::new(AtomicBool::new(false));

        let config = self.config;
        let thread_stop = Arc::clone(&stop);
        let thread = thread::spawn(move || {
            run_capture_thread(config, frame_tx, thread_stop, ready_tx);
        });

        // Propagate device-open failures from the capture thread.
        ready_rx
            .await
            .map_err(|_| AudioError::Device("capture thread exited before opening the device".into()))??;

        self.stop = Some(stop);
        self.thread = Some(thread);
        self.capturing = true;

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        self.capturing = false;
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Release);
        }
        if let Some(thread) = self.thread.take() {
            if thread.join().is_err() {
                error!("Capture thread panicked during shutdown");
            }
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.capturing
    }

    fn name(&self) -> &str {
        "microphone"
    }
}

impl Drop for MicrophoneBackend {
    fn drop(&mut self) {
        // Signal the capture thread even if stop() never ran, so the
        // device is released on every exit path.
        if let Some(stop) = self.stop.take() {
            stop.store(true, Ordering::Release);
        }
    }
}

/// Slices the device callback's sample stream into exact capture-size
/// frames stamped with elapsed milliseconds.
struct FrameSlicer {
    pending: Vec<u8>,
    frame_bytes: usize,
    started: Instant,
    frames: mpsc::Sender<Frame>,
}

impl FrameSlicer {
    fn new(config: CaptureConfig, frames: mpsc::Sender<Frame>) -> Self {
        let frame_bytes = config.frame_bytes();
        Self {
            pending: Vec::with_capacity(frame_bytes * 2),
            frame_bytes,
            started: Instant::now(),
            frames,
        }
    }

    fn push_samples(&mut self, samples: &[i16]) {
        for &sample in samples {
            self.pending.extend_from_slice(&sample.to_le_bytes());
        }
        while self.pending.len() >= self.frame_bytes {
            let rest = self.pending.split_off(self.frame_bytes);
            let pcm = std::mem::replace(&mut self.pending, rest);
            let frame = Frame {
                pcm,
                timestamp_ms: self.started.elapsed().as_millis() as u64,
            };
            // A slow consumer loses frames; the device callback must
            // never stall waiting on the channel.
            let _ = self.frames.try_send(frame);
        }
    }
}

fn stream_error_handler(failed: Arc<AtomicBool>) -> impl FnMut(cpal::StreamError) {
    move |err| {
        error!("Audio input stream error: {}", err);
        failed.store(true, Ordering::Release);
    }
}

fn run_capture_thread(
    config: CaptureConfig,
    frames: mpsc::Sender<Frame>,
    stop: Arc<AtomicBool>,
    ready: oneshot::Sender<Result<()>>,
) {
    let failed = Arc::new(AtomicBool::new(false));

    let stream = match open_input_stream(config, frames, Arc::clone(&failed)) {
        Ok(stream) => stream,
        Err(e) => {
            let _ = ready.send(Err(e));
            return;
        }
    };

    if let Err(e) = stream.play() {
        let _ = ready.send(Err(AudioError::Device(format!("failed to start stream: {}", e)).into()));
        return;
    }
    let _ = ready.send(Ok(()));

    while !stop.load(Ordering::Acquire) && !failed.load(Ordering::Acquire) {
        thread::sleep(Duration::from_millis(50));
    }

    // Dropping the stream releases the device and closes the frame
    // channel, which is how the listen loop learns capture has ended.
    drop(stream);
}

fn open_input_stream(
    config: CaptureConfig,
    frames: mpsc::Sender<Frame>,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream> {
    let host = cpal::default_host();
    let device = host
        .default_input_device()
        .ok_or_else(|| AudioError::Device("no default input device".into()))?;
    let device_name = device.name().unwrap_or_else(|_| "unknown".to_string());

    let supported = device
        .default_input_config()
        .map_err(|e| AudioError::Device(format!("no supported input config: {}", e)))?;

    info!(
        "Capturing from '{}' at {} Hz, {} channels",
        device_name, config.sample_rate, config.channels
    );

    let stream_config = cpal::StreamConfig {
        channels: config.channels,
        sample_rate: cpal::SampleRate(config.sample_rate),
        buffer_size: cpal::BufferSize::Default,
    };

    let mut slicer = FrameSlicer::new(config, frames);

    let stream = match supported.sample_format() {
        cpal::SampleFormat::I16 => device.build_input_stream(
            &stream_config,
            move |data: &[i16], _: &cpal::InputCallbackInfo| slicer.push_samples(data),
            stream_error_handler(failed),
            None,
        )?,
        cpal::SampleFormat::F32 => device.build_input_stream(
            &stream_config,
            move |data: &[f32], _: &cpal::InputCallbackInfo| {
                let samples: Vec<i16> = data
                    .iter()
                    .map(|&s| (s.clamp(-1.0, 1.0) * i16::MAX as f32) as i16)
                    .collect();
                slicer.push_samples(&samples);
            },
            stream_error_handler(failed),
            None,
        )?,
        other => {
            return Err(AudioError::Device(format!("unsupported sample format: {:?}", other)).into())
        }
    };

    Ok(stream)
}
