//! Synthetic audio source driven by an amplitude envelope
//!
//! Each frame is a square wave whose amplitude comes from the envelope at the
//! frame's timestamp, so the frame RMS equals the envelope value. Used by the
//! test suite and for rehearsing the turn loop without a microphone.

use anyhow::{bail, Result};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

type Envelope = Arc<dyn Fn(u64) -> f32 + Send + Sync>;

#[derive(Clone)]
enum Mode {
    Envelope(Envelope),
    /// Opens fine but never delivers a frame
    Mute,
    /// Refuses to open, like a denied permission prompt
    Unavailable,
}

pub struct ScriptedBackend {
    config: AudioBackendConfig,
    mode: Mode,
    pump: Option<JoinHandle<()>>,
    // Keeps the channel open for the mute mode
    idle_tx: Option<mpsc::Sender<AudioFrame>>,
}

impl ScriptedBackend {
    /// Amplitude in [0, 1] as a function of milliseconds since start
    pub fn new<F>(config: AudioBackendConfig, envelope: F) -> Self
    where
        F: Fn(u64) -> f32 + Send + Sync + 'static,
    {
        Self::with_mode(config, Mode::Envelope(Arc::new(envelope)))
    }

    pub fn constant(config: AudioBackendConfig, amplitude: f32) -> Self {
        Self::new(config, move |_| amplitude)
    }

    pub fn mute(config: AudioBackendConfig) -> Self {
        Self::with_mode(config, Mode::Mute)
    }

    pub fn unavailable(config: AudioBackendConfig) -> Self {
        Self::with_mode(config, Mode::Unavailable)
    }

    fn with_mode(config: AudioBackendConfig, mode: Mode) -> Self {
        Self {
            config,
            mode,
            pump: None,
            idle_tx: None,
        }
    }
}

/// Square wave with the given RMS amplitude
pub fn square_wave(amplitude: f32, len: usize) -> Vec<i16> {
    let peak = (amplitude.clamp(0.0, 1.0) * i16::MAX as f32) as i16;
    (0..len)
        .map(|i| if i % 2 == 0 { peak } else { -peak })
        .collect()
}

#[async_trait::async_trait]
impl AudioBackend for ScriptedBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.is_capturing() {
            bail!("Already capturing");
        }

        let (tx, rx) = mpsc::channel(256);

        match self.mode.clone() {
            Mode::Unavailable => bail!("Permission to use the microphone was denied"),
            Mode::Mute => {
                info!("Scripted backend started (mute)");
                self.idle_tx = Some(tx);
            }
            Mode::Envelope(envelope) => {
                let sample_rate = self.config.target_sample_rate;
                let frame_len = self.config.samples_per_frame();
                let frame_ms = self.config.buffer_duration_ms.max(1);

                info!("Scripted backend started ({}Hz, {}ms frames)", sample_rate, frame_ms);

                self.pump = Some(tokio::spawn(async move {
                    let mut ticker = tokio::time::interval(Duration::from_millis(frame_ms));
                    let mut timestamp_ms = 0u64;

                    loop {
                        ticker.tick().await;

                        let frame = AudioFrame {
                            samples: square_wave(envelope(timestamp_ms), frame_len),
                            sample_rate,
                            channels: 1,
                            timestamp_ms,
                        };
                        timestamp_ms += frame_ms;

                        if tx.send(frame).await.is_err() {
                            break;
                        }
                    }
                }));
            }
        }

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        self.idle_tx = None;
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.pump.is_some() || self.idle_tx.is_some()
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

impl Drop for ScriptedBackend {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
