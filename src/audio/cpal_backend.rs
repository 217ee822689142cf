// Microphone backend using cpal
//
// The cpal stream is not Send on every platform, so it lives on a dedicated
// capture thread. The thread reports whether the device opened, then holds the
// stream alive until it is told to shut down.

use anyhow::{bail, Context, Result};
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{FromSample, Sample, SizedSample};
use std::sync::mpsc as std_mpsc;
use std::thread::{self, JoinHandle};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, error, info, warn};

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};
use crate::error::{EngineError, EngineResult};

/// Default input device backend
pub struct CpalBackend {
    config: AudioBackendConfig,
    shutdown_tx: Option<std_mpsc::Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl CpalBackend {
    pub fn new(config: AudioBackendConfig) -> Self {
        Self {
            config,
            shutdown_tx: None,
            thread: None,
        }
    }
}

#[async_trait::async_trait]
impl AudioBackend for CpalBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.shutdown_tx.is_some() {
            bail!("Already capturing");
        }

        info!(
            "Opening default input device ({}Hz target, {}ms frames)",
            self.config.target_sample_rate, self.config.buffer_duration_ms
        );

        let (frame_tx, frame_rx) = mpsc::channel(256);
        let (ready_tx, ready_rx) = oneshot::channel();
        let (shutdown_tx, shutdown_rx) = std_mpsc::channel();
        let config = self.config.clone();

        let thread = thread::Builder::new()
            .name("mic-capture".to_string())
            .spawn(move || capture_thread(config, frame_tx, ready_tx, shutdown_rx))
            .context("Failed to spawn capture thread")?;

        ready_rx
            .await
            .context("Capture thread exited before reporting")??;

        self.shutdown_tx = Some(shutdown_tx);
        self.thread = Some(thread);

        info!("Microphone capture started");

        Ok(frame_rx)
    }

    async fn stop(&mut self) -> Result<()> {
        let Some(shutdown_tx) = self.shutdown_tx.take() else {
            return Ok(());
        };

        info!("Stopping microphone capture");
        let _ = shutdown_tx.send(());

        if let Some(thread) = self.thread.take() {
            tokio::task::spawn_blocking(move || thread.join())
                .await
                .context("Failed to join capture thread")?
                .map_err(|_| anyhow::anyhow!("Capture thread panicked"))?;
        }

        info!("Microphone capture stopped");

        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.shutdown_tx.is_some()
    }

    fn name(&self) -> &str {
        "cpal microphone"
    }
}

impl Drop for CpalBackend {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self.shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}

fn capture_thread(
    config: AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
    ready_tx: oneshot::Sender<EngineResult<()>>,
    shutdown_rx: std_mpsc::Receiver<()>,
) {
    let stream = match open_input_stream(&config, frame_tx) {
        Ok(stream) => stream,
        Err(e) => {
            error!("Failed to open microphone: {}", e);
            let _ = ready_tx.send(Err(e));
            return;
        }
    };

    let _ = ready_tx.send(Ok(()));

    // Returns on explicit shutdown or when the backend is dropped
    let _ = shutdown_rx.recv();

    drop(stream);
    debug!("Capture thread exiting");
}

fn open_input_stream(
    config: &AudioBackendConfig,
    frame_tx: mpsc::Sender<AudioFrame>,
) -> EngineResult<cpal::Stream> {
    let device = cpal::default_host()
        .default_input_device()
        .ok_or_else(|| EngineError::PermissionDenied("No input device available".to_string()))?;

    info!(
        "Using input device: {}",
        device.name().unwrap_or_else(|_| "Unknown".to_string())
    );

    let supported = device.default_input_config()?;
    let sample_format = supported.sample_format();
    let stream_config: cpal::StreamConfig = supported.into();

    let sink = FrameSink::new(
        frame_tx,
        stream_config.channels as usize,
        stream_config.sample_rate.0,
        config,
    );

    info!(
        "Native input config: {}Hz, {} channels, {:?} -> {}Hz mono",
        stream_config.sample_rate.0,
        stream_config.channels,
        sample_format,
        sink.sample_rate
    );

    let stream = match sample_format {
        cpal::SampleFormat::F32 => build_stream::<f32>(&device, &stream_config, sink)?,
        cpal::SampleFormat::I16 => build_stream::<i16>(&device, &stream_config, sink)?,
        cpal::SampleFormat::U16 => build_stream::<u16>(&device, &stream_config, sink)?,
        other => {
            return Err(EngineError::PermissionDenied(format!(
                "Unsupported input sample format: {:?}",
                other
            )))
        }
    };

    stream.play()?;

    Ok(stream)
}

fn build_stream<T>(
    device: &cpal::Device,
    config: &cpal::StreamConfig,
    mut sink: FrameSink,
) -> Result<cpal::Stream, cpal::BuildStreamError>
where
    T: SizedSample,
    i16: FromSample<T>,
{
    let mut scratch: Vec<i16> = Vec::new();

    device.build_input_stream(
        config,
        move |data: &[T], _: &cpal::InputCallbackInfo| {
            scratch.clear();
            scratch.extend(data.iter().map(|&s| i16::from_sample(s)));
            sink.push(&scratch);
        },
        move |err| {
            warn!("Audio stream error: {}", err);
        },
        None,
    )
}

/// Downmixes interleaved device samples to mono, decimates to the target rate
/// and cuts the result into fixed-size frames.
struct FrameSink {
    tx: mpsc::Sender<AudioFrame>,
    channels: usize,
    decimation: usize,
    phase: usize,
    frame_len: usize,
    pending: Vec<i16>,
    sample_rate: u32,
    emitted: u64,
}

impl FrameSink {
    fn new(
        tx: mpsc::Sender<AudioFrame>,
        channels: usize,
        native_rate: u32,
        config: &AudioBackendConfig,
    ) -> Self {
        // Integer decimation only; rates that don't divide evenly stay native
        let ratio = native_rate / config.target_sample_rate.max(1);
        let (decimation, sample_rate) = if ratio > 1 && native_rate % config.target_sample_rate == 0 {
            (ratio as usize, config.target_sample_rate)
        } else {
            (1, native_rate)
        };
        let frame_len = ((sample_rate as u64 * config.buffer_duration_ms) / 1000).max(1) as usize;

        Self {
            tx,
            channels: channels.max(1),
            decimation,
            phase: 0,
            frame_len,
            pending: Vec::with_capacity(frame_len),
            sample_rate,
            emitted: 0,
        }
    }

    fn push(&mut self, interleaved: &[i16]) {
        for group in interleaved.chunks_exact(self.channels) {
            self.phase += 1;
            if self.phase < self.decimation {
                continue;
            }
            self.phase = 0;

            let sum: i32 = group.iter().map(|&s| s as i32).sum();
            self.pending.push((sum / self.channels as i32) as i16);

            if self.pending.len() >= self.frame_len {
                self.flush();
            }
        }
    }

    fn flush(&mut self) {
        let samples = std::mem::replace(&mut self.pending, Vec::with_capacity(self.frame_len));
        let timestamp_ms = self.emitted * 1000 / self.sample_rate as u64;
        self.emitted += samples.len() as u64;

        let frame = AudioFrame {
            samples,
            sample_rate: self.sample_rate,
            channels: 1,
            timestamp_ms,
        };

        // Never block the audio callback
        if let Err(e) = self.tx.try_send(frame) {
            debug!("Dropping microphone frame: {}", e);
        }
    }
}
