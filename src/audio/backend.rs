use anyhow::Result;
use std::path::PathBuf;
use tokio::sync::mpsc;

/// Audio sample data (16-bit PCM, mono)
#[derive(Debug, Clone)]
pub struct AudioFrame {
    /// Raw audio samples (i16 PCM)
    pub samples: Vec<i16>,
    /// Sample rate in Hz
    pub sample_rate: u32,
    /// Number of channels
    pub channels: u16,
    /// Timestamp in milliseconds since the stream started
    pub timestamp_ms: u64,
}

impl AudioFrame {
    /// Duration covered by this frame in milliseconds
    pub fn duration_ms(&self) -> u64 {
        if self.sample_rate == 0 || self.channels == 0 {
            return 0;
        }
        let per_channel = self.samples.len() as u64 / self.channels as u64;
        per_channel * 1000 / self.sample_rate as u64
    }
}

/// Configuration for audio backend
#[derive(Debug, Clone)]
pub struct AudioBackendConfig {
    /// Target sample rate (will downsample if needed)
    pub target_sample_rate: u32,
    /// Frame size in milliseconds (affects analysis latency)
    pub buffer_duration_ms: u64,
}

impl AudioBackendConfig {
    /// Number of mono samples per emitted frame
    pub fn samples_per_frame(&self) -> usize {
        ((self.target_sample_rate as u64 * self.buffer_duration_ms) / 1000).max(1) as usize
    }
}

impl Default for AudioBackendConfig {
    fn default() -> Self {
        Self {
            target_sample_rate: 16000, // 16kHz is plenty for speech
            buffer_duration_ms: 20,    // 20ms frames, finer than the poll cadence
        }
    }
}

/// Audio capture backend trait
///
/// Implementations:
/// - Microphone: cpal default input device
/// - File: WAV file paced in real time (dry runs, reproducible sessions)
/// - Scripted: synthetic amplitude envelope (tests)
#[async_trait::async_trait]
pub trait AudioBackend: Send + Sync {
    /// Start capturing audio
    ///
    /// Returns a channel receiver that will receive audio frames
    async fn start(&mut self) -> Result<mpsc::Receiver<AudioFrame>>;

    /// Stop capturing audio
    async fn stop(&mut self) -> Result<()>;

    /// Check if backend is currently capturing
    fn is_capturing(&self) -> bool;

    /// Get backend name for logging
    fn name(&self) -> &str;
}

/// Audio backend factory
pub struct AudioBackendFactory;

impl AudioBackendFactory {
    /// Create audio backend for the configured source
    pub fn create(
        source: AudioSource,
        config: AudioBackendConfig,
    ) -> Result<Box<dyn AudioBackend>> {
        match source {
            AudioSource::Microphone => {
                use super::cpal_backend::CpalBackend;
                Ok(Box::new(CpalBackend::new(config)))
            }

            AudioSource::File(path) => {
                use super::file::FileBackend;
                let backend = FileBackend::open(path, config)?;
                Ok(Box::new(backend))
            }
        }
    }
}

/// Audio source type
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AudioSource {
    /// Default microphone input
    Microphone,
    /// WAV file input
    File(PathBuf),
}

impl AudioSource {
    /// Parse the `audio.input` setting: `microphone` or a WAV path
    pub fn parse(value: &str) -> Self {
        match value.trim() {
            "" | "mic" | "microphone" | "default" => AudioSource::Microphone,
            path => AudioSource::File(PathBuf::from(path)),
        }
    }
}
