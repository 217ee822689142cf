//! Playback of the interviewer's spoken replies

pub mod decode;
pub mod speaker;

use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

use crate::error::{EngineError, EngineResult};

pub use decode::{decode_reply, DecodedAudio};
pub use speaker::SpeakerPlayback;

#[async_trait]
pub trait Playback: Send + Sync {
    /// Play a compressed reply to completion and report how long it lasted
    ///
    /// Empty audio completes immediately with zero duration. Dropping the
    /// future stops playback.
    async fn play(&self, audio: Vec<u8>) -> EngineResult<Duration>;

    fn name(&self) -> &str;
}

/// Decodes replies but never touches an output device
///
/// With `paced` set it waits out the clip's duration, so the turn loop keeps
/// realistic timing on headless machines.
#[derive(Debug, Default)]
pub struct SilentPlayback {
    paced: bool,
}

impl SilentPlayback {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn paced() -> Self {
        Self { paced: true }
    }
}

#[async_trait]
impl Playback for SilentPlayback {
    async fn play(&self, audio: Vec<u8>) -> EngineResult<Duration> {
        if audio.is_empty() {
            return Ok(Duration::ZERO);
        }

        let decoded = tokio::task::spawn_blocking(move || decode_reply(audio))
            .await
            .map_err(|e| EngineError::PlaybackFailure(e.to_string()))??;
        let duration = decoded.duration();

        debug!("Skipping playback of {:.1}s reply", duration.as_secs_f64());

        if self.paced {
            tokio::time::sleep(duration).await;
        }

        Ok(duration)
    }

    fn name(&self) -> &str {
        "silent"
    }
}
