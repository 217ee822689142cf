use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::io::Cursor;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::audio::AudioFrame;
use crate::error::{EngineError, EngineResult};

/// Container format of a finished recording
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioEncoding {
    /// 16-bit PCM WAV
    Wav,
}

impl AudioEncoding {
    pub fn mime_type(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "audio/wav",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            AudioEncoding::Wav => "wav",
        }
    }
}

/// A finished answer, frozen and ready to upload exactly once
#[derive(Debug, Clone)]
pub struct RecordingArtifact {
    /// Encoded payload
    pub bytes: Vec<u8>,
    pub encoding: AudioEncoding,
    pub sample_rate: u32,
    pub channels: u16,
    /// Number of captured chunks concatenated into the payload
    pub chunk_count: usize,
    pub sample_count: usize,
    pub duration_ms: u64,
}

impl RecordingArtifact {
    /// Concatenate captured chunks into a single WAV payload
    ///
    /// Fails with `EmptyCapture` when no samples were captured.
    pub fn from_frames(frames: &[AudioFrame]) -> EngineResult<Self> {
        let sample_count: usize = frames.iter().map(|f| f.samples.len()).sum();
        let Some(first) = frames.first().filter(|_| sample_count > 0) else {
            return Err(EngineError::EmptyCapture);
        };

        let spec = hound::WavSpec {
            channels: first.channels,
            sample_rate: first.sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };

        let mut cursor = Cursor::new(Vec::new());
        {
            let mut writer = hound::WavWriter::new(&mut cursor, spec)?;
            for frame in frames {
                for &sample in &frame.samples {
                    writer.write_sample(sample)?;
                }
            }
            writer.finalize()?;
        }

        let per_channel = sample_count as u64 / first.channels.max(1) as u64;
        let duration_ms = per_channel * 1000 / first.sample_rate.max(1) as u64;

        Ok(Self {
            bytes: cursor.into_inner(),
            encoding: AudioEncoding::Wav,
            sample_rate: first.sample_rate,
            channels: first.channels,
            chunk_count: frames.len(),
            sample_count,
            duration_ms,
        })
    }

    /// Upload filename, e.g. `answer.wav`
    pub fn file_name(&self) -> String {
        format!("answer.{}", self.encoding.extension())
    }

    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    /// Keep a copy as `answer_<index>.<ext>` under `dir`
    pub fn save(&self, dir: &Path, index: usize) -> Result<PathBuf> {
        fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create recordings directory: {:?}", dir))?;

        let path = dir.join(format!("answer_{}.{}", index, self.encoding.extension()));
        fs::write(&path, &self.bytes)
            .with_context(|| format!("Failed to write recording: {:?}", path))?;

        info!("Archived answer {} to {}", index, path.display());

        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(samples: Vec<i16>, timestamp_ms: u64) -> AudioFrame {
        AudioFrame {
            samples,
            sample_rate: 16000,
            channels: 1,
            timestamp_ms,
        }
    }

    #[test]
    fn test_frames_concatenate_in_order() {
        let frames = vec![frame(vec![1, 2, 3], 0), frame(vec![4, 5], 20)];
        let artifact = RecordingArtifact::from_frames(&frames).expect("artifact");

        assert_eq!(artifact.chunk_count, 2);
        assert_eq!(artifact.sample_count, 5);
        assert_eq!(artifact.encoding, AudioEncoding::Wav);
        assert_eq!(artifact.file_name(), "answer.wav");

        let reader = hound::WavReader::new(Cursor::new(artifact.bytes)).expect("valid wav");
        assert_eq!(reader.spec().sample_rate, 16000);
        let samples: Vec<i16> = reader.into_samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![1, 2, 3, 4, 5]);
    }

    #[test]
    fn test_duration_from_sample_count() {
        let frames = vec![frame(vec![0; 16000], 0), frame(vec![0; 8000], 1000)];
        let artifact = RecordingArtifact::from_frames(&frames).expect("artifact");
        assert_eq!(artifact.duration_ms, 1500);
    }

    #[test]
    fn test_no_frames_is_empty_capture() {
        assert!(matches!(
            RecordingArtifact::from_frames(&[]),
            Err(EngineError::EmptyCapture)
        ));
        assert!(matches!(
            RecordingArtifact::from_frames(&[frame(Vec::new(), 0)]),
            Err(EngineError::EmptyCapture)
        ));
    }

    #[test]
    fn test_save_writes_numbered_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let artifact = RecordingArtifact::from_frames(&[frame(vec![7; 320], 0)]).unwrap();

        let path = artifact.save(dir.path(), 3).unwrap();

        assert!(path.ends_with("answer_3.wav"));
        assert_eq!(fs::read(&path).unwrap(), artifact.bytes);
    }
}
