use async_trait::async_trait;
use rodio::buffer::SamplesBuffer;
use rodio::{OutputStream, Sink};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

use super::decode::{decode_reply, DecodedAudio};
use super::Playback;
use crate::error::{EngineError, EngineResult};

const DRAIN_POLL: Duration = Duration::from_millis(50);

/// Plays replies on the default output device
///
/// The rodio stream is not `Send`, so each reply is played on a blocking
/// thread that owns the device for the length of the clip.
#[derive(Debug, Default)]
pub struct SpeakerPlayback;

impl SpeakerPlayback {
    pub fn new() -> Self {
        Self
    }
}

/// Silences the device when the awaiting future is dropped
struct StopOnDrop(Arc<AtomicBool>);

impl Drop for StopOnDrop {
    fn drop(&mut self) {
        self.0.store(true, Ordering::SeqCst);
    }
}

fn play_blocking(audio: DecodedAudio, stop: Arc<AtomicBool>) -> EngineResult<()> {
    let (_stream, handle) = OutputStream::try_default()
        .map_err(|e| EngineError::PlaybackFailure(format!("no output device: {}", e)))?;
    let sink = Sink::try_new(&handle)
        .map_err(|e| EngineError::PlaybackFailure(format!("failed to open sink: {}", e)))?;

    sink.append(SamplesBuffer::new(
        audio.channels,
        audio.sample_rate,
        audio.samples,
    ));

    while !sink.empty() {
        if stop.load(Ordering::SeqCst) {
            sink.stop();
            info!("Playback interrupted");
            return Ok(());
        }
        std::thread::sleep(DRAIN_POLL);
    }

    Ok(())
}

#[async_trait]
impl Playback for SpeakerPlayback {
    async fn play(&self, audio: Vec<u8>) -> EngineResult<Duration> {
        if audio.is_empty() {
            return Ok(Duration::ZERO);
        }

        let decoded = tokio::task::spawn_blocking(move || decode_reply(audio))
            .await
            .map_err(|e| EngineError::PlaybackFailure(e.to_string()))??;
        let duration = decoded.duration();

        info!(
            "Playing reply: {:.1}s at {}Hz x{}",
            duration.as_secs_f64(),
            decoded.sample_rate,
            decoded.channels
        );

        let stop = Arc::new(AtomicBool::new(false));
        let _guard = StopOnDrop(Arc::clone(&stop));

        tokio::task::spawn_blocking(move || play_blocking(decoded, stop))
            .await
            .map_err(|e| {
                warn!("Playback thread failed: {}", e);
                EngineError::PlaybackFailure(e.to_string())
            })??;

        Ok(duration)
    }

    fn name(&self) -> &str {
        "speaker"
    }
}
