use anyhow::{Context, Result};
use hound::WavReader;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::info;

use super::backend::{AudioBackend, AudioBackendConfig, AudioFrame};

pub struct AudioFile {
    pub path: String,
    pub duration_seconds: f64,
    pub sample_rate: u32,
    pub channels: u16,
    pub samples: Vec<i16>,
}

impl AudioFile {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        info!("Opening audio file: {}", path.display());

        let reader = WavReader::open(path)
            .context("Failed to open WAV file")?;

        let spec = reader.spec();
        let samples: Vec<i16> = reader
            .into_samples::<i16>()
            .collect::<Result<Vec<_>, _>>()
            .context("Failed to read audio samples")?;

        let duration_seconds = samples.len() as f64 /
            (spec.sample_rate as f64 * spec.channels as f64);

        info!(
            "Audio file loaded: {:.1}s, {}Hz, {} channels, {} samples",
            duration_seconds,
            spec.sample_rate,
            spec.channels,
            samples.len()
        );

        Ok(Self {
            path: path.display().to_string(),
            duration_seconds,
            sample_rate: spec.sample_rate,
            channels: spec.channels,
            samples,
        })
    }

    /// Average interleaved channels into a mono signal
    pub fn to_mono(&self) -> Vec<i16> {
        if self.channels <= 1 {
            return self.samples.clone();
        }

        let channels = self.channels as usize;
        self.samples
            .chunks_exact(channels)
            .map(|group| {
                let sum: i32 = group.iter().map(|&s| s as i32).sum();
                (sum / channels as i32) as i16
            })
            .collect()
    }
}

/// Streams a WAV file as if it were a live microphone
///
/// Frames are paced in real time. Once the file is exhausted the backend keeps
/// emitting silent frames so the stream stays alive for the rest of the session.
pub struct FileBackend {
    path: PathBuf,
    samples: Vec<i16>,
    sample_rate: u32,
    config: AudioBackendConfig,
    pump: Option<JoinHandle<()>>,
}

impl FileBackend {
    pub fn open(path: impl Into<PathBuf>, config: AudioBackendConfig) -> Result<Self> {
        let path = path.into();
        let file = AudioFile::open(&path)?;

        Ok(Self {
            path,
            samples: file.to_mono(),
            sample_rate: file.sample_rate,
            config,
            pump: None,
        })
    }
}

#[async_trait::async_trait]
impl AudioBackend for FileBackend {
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>> {
        if self.pump.is_some() {
            anyhow::bail!("Already capturing");
        }

        info!("Streaming {} as microphone input", self.path.display());

        let (tx, rx) = mpsc::channel(256);
        let samples = self.samples.clone();
        let sample_rate = self.sample_rate;
        let frame_len = ((sample_rate as u64 * self.config.buffer_duration_ms) / 1000).max(1) as usize;
        let frame_duration = Duration::from_millis(self.config.buffer_duration_ms.max(1));

        self.pump = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(frame_duration);
            let mut offset = 0usize;
            let mut emitted = 0u64;

            loop {
                ticker.tick().await;

                let end = (offset + frame_len).min(samples.len());
                let mut chunk = samples[offset.min(end)..end].to_vec();
                chunk.resize(frame_len, 0);
                offset = end;

                let frame = AudioFrame {
                    samples: chunk,
                    sample_rate,
                    channels: 1,
                    timestamp_ms: emitted * 1000 / sample_rate as u64,
                };
                emitted += frame_len as u64;

                if tx.send(frame).await.is_err() {
                    break;
                }
            }
        }));

        Ok(rx)
    }

    async fn stop(&mut self) -> Result<()> {
        if let Some(pump) = self.pump.take() {
            pump.abort();
            info!("File input stopped");
        }
        Ok(())
    }

    fn is_capturing(&self) -> bool {
        self.pump.is_some()
    }

    fn name(&self) -> &str {
        "wav file"
    }
}

impl Drop for FileBackend {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
