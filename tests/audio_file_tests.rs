// Integration tests for audio file processing
//
// These tests verify that we can read WAV files and extract audio data correctly.

mod common;

use anyhow::Result;
use common::write_wav;
use loqa_interview::audio::AudioFile;
use std::path::PathBuf;
use tempfile::TempDir;

#[test]
fn test_audio_file_open() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("sample-answer.wav");
    write_wav(&path, 16000, 1, &vec![1200i16; 8000]);

    let audio = AudioFile::open(&path)?;

    assert!((audio.duration_seconds - 0.5).abs() < 1e-9);
    assert_eq!(audio.sample_rate, 16000);
    assert_eq!(audio.channels, 1);
    assert_eq!(audio.samples.len(), 8000);
    assert!(audio.path.contains("sample-answer.wav"));

    Ok(())
}

#[test]
fn test_audio_file_nonexistent() {
    let path = PathBuf::from("/nonexistent/path/to/audio.wav");
    let result = AudioFile::open(&path);

    assert!(result.is_err(), "Opening nonexistent file should fail");
}

#[test]
fn test_audio_file_stereo_to_mono() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    // [L, R, L, R, ...]
    write_wav(&path, 8000, 2, &[100, 300, -200, -400, 0, 10]);

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.channels, 2);
    assert_eq!(audio.samples.len() % audio.channels as usize, 0);
    assert_eq!(audio.to_mono(), vec![200, -300, 5]);

    Ok(())
}

#[test]
fn test_audio_file_mono_passthrough() -> Result<()> {
    let dir = TempDir::new()?;
    let path = dir.path().join("mono.wav");
    write_wav(&path, 16000, 1, &[1, -2, 3]);

    let audio = AudioFile::open(&path)?;
    assert_eq!(audio.to_mono(), vec![1, -2, 3]);

    Ok(())
}
