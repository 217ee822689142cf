// Tests for audio backend abstractions and the shared stream
//
// These tests verify the core audio types, the scripted and file backends, and
// how the stream hands audio to analysers and recorders.

mod common;

use anyhow::Result;
use common::{backend_config, write_wav};
use loqa_interview::audio::level::instant_rms;
use loqa_interview::audio::{
    AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource, AudioStream,
    FileBackend, ScriptedBackend,
};
use loqa_interview::EngineError;
use std::path::PathBuf;
use std::time::Duration;

#[test]
fn test_audio_frame_duration() {
    let frame = AudioFrame {
        samples: vec![0i16; 1600],
        sample_rate: 16000,
        channels: 1,
        timestamp_ms: 0,
    };
    assert_eq!(frame.duration_ms(), 100);

    let stereo = AudioFrame {
        samples: vec![100, 200, 150, 250, 175, 275],
        sample_rate: 1000,
        channels: 2,
        timestamp_ms: 0,
    };
    assert_eq!(stereo.duration_ms(), 3);
}

#[test]
fn test_audio_backend_config_default() {
    let config = AudioBackendConfig::default();

    assert_eq!(config.target_sample_rate, 16000, "Default should be 16kHz");
    assert_eq!(config.buffer_duration_ms, 20, "Default frame should be 20ms");
    assert_eq!(config.samples_per_frame(), 320);
}

#[test]
fn test_audio_source_parse() {
    assert_eq!(AudioSource::parse("microphone"), AudioSource::Microphone);
    assert_eq!(AudioSource::parse("mic"), AudioSource::Microphone);
    assert_eq!(AudioSource::parse(""), AudioSource::Microphone);
    assert_eq!(
        AudioSource::parse("answers/take1.wav"),
        AudioSource::File(PathBuf::from("answers/take1.wav"))
    );
}

#[test]
fn test_factory_rejects_missing_wav() {
    let result = AudioBackendFactory::create(
        AudioSource::File(PathBuf::from("/nonexistent/answer.wav")),
        backend_config(),
    );
    assert!(result.is_err());
}

#[tokio::test(start_paused = true)]
async fn test_scripted_backend_follows_envelope() -> Result<()> {
    let mut backend = ScriptedBackend::new(backend_config(), |t| if t < 100 { 0.0 } else { 0.25 });
    let mut rx = backend.start().await?;

    let mut frames = Vec::new();
    for _ in 0..10 {
        frames.push(rx.recv().await.expect("frame"));
    }
    backend.stop().await?;

    assert_eq!(frames[0].timestamp_ms, 0);
    assert_eq!(frames[1].timestamp_ms, 20);
    assert!(frames.iter().all(|f| f.samples.len() == 320));
    assert_eq!(instant_rms(&frames[0].samples), 0.0);

    let loud = instant_rms(&frames[9].samples);
    assert!((loud - 0.25).abs() < 0.01, "rms {}", loud);
    assert!(!backend.is_capturing());

    Ok(())
}

#[tokio::test]
async fn test_unavailable_backend_is_permission_denied() {
    let backend = ScriptedBackend::unavailable(backend_config());

    let err = AudioStream::open(Box::new(backend)).await.err().expect("open fails");
    assert!(matches!(err, EngineError::PermissionDenied(_)));
}

#[tokio::test(start_paused = true)]
async fn test_stream_feeds_analysers() -> Result<()> {
    let backend = ScriptedBackend::constant(backend_config(), 0.5);
    let stream = AudioStream::open(Box::new(backend)).await?;

    let mut analyser = stream.analyser(1024);
    assert_eq!(stream.active_analysers(), 1);

    tokio::time::sleep(Duration::from_millis(200)).await;

    let window = analyser.read().to_vec();
    assert_eq!(window.len(), 1024);
    assert!((instant_rms(&window) - 0.5).abs() < 0.01);
    assert!(stream.samples_received() >= 320 * 10);

    drop(analyser);
    assert_eq!(stream.active_analysers(), 0);

    stream.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_stream_broadcasts_to_subscribers() -> Result<()> {
    let backend = ScriptedBackend::constant(backend_config(), 0.1);
    let stream = AudioStream::open(Box::new(backend)).await?;

    let mut rx = stream.subscribe();
    assert_eq!(stream.active_subscribers(), 1);

    let first = rx.recv().await?;
    let second = rx.recv().await?;
    assert!(second.timestamp_ms > first.timestamp_ms);

    drop(rx);
    assert_eq!(stream.active_subscribers(), 0);

    stream.close().await;
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_file_backend_streams_then_pads_with_silence() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("answer.wav");
    write_wav(&path, 16000, 1, &vec![8000i16; 640]);

    let mut backend = FileBackend::open(&path, backend_config())?;
    let mut rx = backend.start().await?;

    let first = rx.recv().await.expect("frame");
    let second = rx.recv().await.expect("frame");
    let third = rx.recv().await.expect("frame");
    backend.stop().await?;

    assert_eq!(first.samples, vec![8000i16; 320]);
    assert_eq!(second.samples, vec![8000i16; 320]);
    assert_eq!(third.samples, vec![0i16; 320]);
    assert_eq!(second.timestamp_ms, 20);

    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_file_backend_downmixes_stereo() -> Result<()> {
    let dir = tempfile::TempDir::new()?;
    let path = dir.path().join("stereo.wav");
    let interleaved: Vec<i16> = (0..640).map(|i| if i % 2 == 0 { 1000 } else { 3000 }).collect();
    write_wav(&path, 16000, 2, &interleaved);

    let mut backend = FileBackend::open(&path, backend_config())?;
    let mut rx = backend.start().await?;
    let frame = rx.recv().await.expect("frame");
    backend.stop().await?;

    assert_eq!(frame.channels, 1);
    assert_eq!(frame.samples, vec![2000i16; 320]);

    Ok(())
}
