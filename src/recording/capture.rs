use tokio::sync::broadcast::error::{RecvError, TryRecvError};
use tokio::sync::{broadcast, oneshot};
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use super::artifact::RecordingArtifact;
use crate::audio::{AudioFrame, AudioStream};
use crate::error::{EngineError, EngineResult};

/// Collects frames from the shared stream between `start` and `stop`
///
/// Idle -> Recording -> Idle. The collector task is released on every exit
/// path, including drop.
#[derive(Default)]
pub struct CaptureSession {
    active: Option<ActiveCapture>,
}

struct ActiveCapture {
    stop_tx: oneshot::Sender<()>,
    task: JoinHandle<Vec<AudioFrame>>,
    started_at: Instant,
}

impl CaptureSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_recording(&self) -> bool {
        self.active.is_some()
    }

    /// When the current recording started
    pub fn started_at(&self) -> Option<Instant> {
        self.active.as_ref().map(|a| a.started_at)
    }

    /// Begin collecting frames. Only one recording may be outstanding.
    pub fn start(&mut self, stream: &AudioStream) -> EngineResult<()> {
        if self.active.is_some() {
            return Err(EngineError::AlreadyRecording);
        }

        let frames_rx = stream.subscribe();
        let (stop_tx, stop_rx) = oneshot::channel();
        let task = tokio::spawn(collect_frames(frames_rx, stop_rx));

        self.active = Some(ActiveCapture {
            stop_tx,
            task,
            started_at: Instant::now(),
        });

        info!("Recording started");

        Ok(())
    }

    /// Finish the recording and produce its artifact
    ///
    /// `Ok(None)` when nothing was recording; `EmptyCapture` when the recording
    /// holds no audio.
    pub async fn stop(&mut self) -> EngineResult<Option<RecordingArtifact>> {
        let Some(frames) = self.finish().await else {
            debug!("Stop ignored: not recording");
            return Ok(None);
        };

        let artifact = RecordingArtifact::from_frames(&frames)?;

        info!(
            "Recording finalized: {} chunks, {:.1}s, {} bytes",
            artifact.chunk_count,
            artifact.duration_ms as f64 / 1000.0,
            artifact.len()
        );

        Ok(Some(artifact))
    }

    /// Force-stop and throw the captured audio away
    pub async fn discard(&mut self) {
        if let Some(frames) = self.finish().await {
            info!("Recording discarded ({} chunks)", frames.len());
        }
    }

    async fn finish(&mut self) -> Option<Vec<AudioFrame>> {
        let active = self.active.take()?;
        let _ = active.stop_tx.send(());

        let elapsed = active.started_at.elapsed();
        let frames = match active.task.await {
            Ok(frames) => frames,
            Err(e) => {
                error!("Capture task failed: {}", e);
                Vec::new()
            }
        };

        info!("Recording stopped after {:.1}s", elapsed.as_secs_f64());

        Some(frames)
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.task.abort();
        }
    }
}

async fn collect_frames(
    mut frames_rx: broadcast::Receiver<AudioFrame>,
    mut stop_rx: oneshot::Receiver<()>,
) -> Vec<AudioFrame> {
    let mut frames = Vec::new();

    loop {
        tokio::select! {
            biased;
            _ = &mut stop_rx => {
                drain_queued(&mut frames_rx, &mut frames);
                break;
            }
            frame = frames_rx.recv() => match frame {
                Ok(frame) => frames.push(frame),
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Recorder fell behind, {} frames lost", skipped);
                }
                Err(RecvError::Closed) => break,
            },
        }
    }

    frames
}

/// Keep the frames that were already delivered when the stop arrived
fn drain_queued(frames_rx: &mut broadcast::Receiver<AudioFrame>, frames: &mut Vec<AudioFrame>) {
    loop {
        match frames_rx.try_recv() {
            Ok(frame) => frames.push(frame),
            Err(TryRecvError::Lagged(skipped)) => {
                warn!("Recorder fell behind, {} frames lost", skipped);
            }
            Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(timestamp_ms: u64) -> AudioFrame {
        AudioFrame {
            samples: vec![100; 320],
            sample_rate: 16000,
            channels: 1,
            timestamp_ms,
        }
    }

    #[tokio::test]
    async fn test_stop_keeps_queued_frames() {
        let (frames_tx, frames_rx) = broadcast::channel(16);
        let (stop_tx, stop_rx) = oneshot::channel();

        for ts in [0, 20, 40] {
            frames_tx.send(frame(ts)).unwrap();
        }
        stop_tx.send(()).unwrap();

        let frames = collect_frames(frames_rx, stop_rx).await;

        let stamps: Vec<u64> = frames.iter().map(|f| f.timestamp_ms).collect();
        assert_eq!(stamps, vec![0, 20, 40]);
    }
}
