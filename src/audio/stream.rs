// Shared audio stream for one interview session
//
// The stream is opened once. A pump task keeps a rolling window of the most
// recent samples for analysers (level meter, calibration, silence watchdog) and
// broadcasts every frame to recorders. Only `close` stops the backend.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use super::backend::{AudioBackend, AudioFrame};
use crate::error::{EngineError, EngineResult};

/// Enough for the largest analysis window in use
pub const DEFAULT_HISTORY_SAMPLES: usize = 4096;

const FRAME_BROADCAST_CAPACITY: usize = 512;

/// Rolling window of the most recent samples
#[derive(Debug)]
struct SampleHistory {
    samples: VecDeque<i16>,
    capacity: usize,
    total: u64,
}

impl SampleHistory {
    fn new(capacity: usize) -> Self {
        Self {
            samples: VecDeque::with_capacity(capacity),
            capacity,
            total: 0,
        }
    }

    fn push(&mut self, samples: &[i16]) {
        self.total += samples.len() as u64;
        self.samples.extend(samples.iter().copied());
        let excess = self.samples.len().saturating_sub(self.capacity);
        if excess > 0 {
            self.samples.drain(..excess);
        }
    }

    fn latest(&self, n: usize, out: &mut Vec<i16>) {
        out.clear();
        let skip = self.samples.len().saturating_sub(n);
        out.extend(self.samples.iter().skip(skip).copied());
    }
}

/// Read-only view onto the most recent `window` samples of the stream
///
/// Each polling loop owns its own analyser; dropping it releases the listener.
pub struct Analyser {
    history: Arc<Mutex<SampleHistory>>,
    listeners: Arc<AtomicUsize>,
    window: usize,
    buffer: Vec<i16>,
}

impl Analyser {
    /// Copy of the latest window. Empty until the stream has produced audio.
    pub fn read(&mut self) -> &[i16] {
        match self.history.lock() {
            Ok(history) => history.latest(self.window, &mut self.buffer),
            Err(poisoned) => poisoned.into_inner().latest(self.window, &mut self.buffer),
        }
        &self.buffer
    }

    pub fn window(&self) -> usize {
        self.window
    }
}

impl Drop for Analyser {
    fn drop(&mut self) {
        self.listeners.fetch_sub(1, Ordering::SeqCst);
    }
}

/// The session's single live audio source
pub struct AudioStream {
    backend: Box<dyn AudioBackend>,
    history: Arc<Mutex<SampleHistory>>,
    listeners: Arc<AtomicUsize>,
    frames: broadcast::Sender<AudioFrame>,
    pump: Option<JoinHandle<()>>,
}

impl AudioStream {
    /// Start the backend and begin distributing its frames
    ///
    /// Any failure to start capture is reported as `PermissionDenied`.
    pub async fn open(backend: Box<dyn AudioBackend>) -> EngineResult<Self> {
        Self::open_with_history(backend, DEFAULT_HISTORY_SAMPLES).await
    }

    pub async fn open_with_history(
        mut backend: Box<dyn AudioBackend>,
        history_samples: usize,
    ) -> EngineResult<Self> {
        info!("Opening audio stream ({})", backend.name());

        let mut audio_rx = backend
            .start()
            .await
            .map_err(|e| EngineError::PermissionDenied(format!("{:#}", e)))?;

        let history = Arc::new(Mutex::new(SampleHistory::new(history_samples.max(1))));
        let (frames, _) = broadcast::channel(FRAME_BROADCAST_CAPACITY);

        let pump_history = Arc::clone(&history);
        let pump_frames = frames.clone();
        let pump = tokio::spawn(async move {
            while let Some(frame) = audio_rx.recv().await {
                match pump_history.lock() {
                    Ok(mut history) => history.push(&frame.samples),
                    Err(poisoned) => poisoned.into_inner().push(&frame.samples),
                }
                // No subscribers outside of recording is normal
                let _ = pump_frames.send(frame);
            }
            warn!("Audio source ended");
        });

        info!("Audio stream open");

        Ok(Self {
            backend,
            history,
            listeners: Arc::new(AtomicUsize::new(0)),
            frames,
            pump: Some(pump),
        })
    }

    /// New analysis handle over the latest `window` samples
    pub fn analyser(&self, window: usize) -> Analyser {
        self.listeners.fetch_add(1, Ordering::SeqCst);
        Analyser {
            history: Arc::clone(&self.history),
            listeners: Arc::clone(&self.listeners),
            window: window.max(1),
            buffer: Vec::with_capacity(window),
        }
    }

    /// Receive every frame from now on
    pub fn subscribe(&self) -> broadcast::Receiver<AudioFrame> {
        self.frames.subscribe()
    }

    /// Number of analysers currently alive
    pub fn active_analysers(&self) -> usize {
        self.listeners.load(Ordering::SeqCst)
    }

    /// Number of frame subscribers currently alive
    pub fn active_subscribers(&self) -> usize {
        self.frames.receiver_count()
    }

    /// Total samples received since the stream opened
    pub fn samples_received(&self) -> u64 {
        match self.history.lock() {
            Ok(history) => history.total,
            Err(poisoned) => poisoned.into_inner().total,
        }
    }

    pub fn backend_name(&self) -> &str {
        self.backend.name()
    }

    /// Session teardown: stop the backend and the pump
    pub async fn close(mut self) {
        info!("Closing audio stream ({})", self.backend.name());

        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
        if let Err(e) = self.backend.stop().await {
            warn!("Failed to stop audio backend: {:#}", e);
        }
    }
}

impl Drop for AudioStream {
    fn drop(&mut self) {
        if let Some(pump) = self.pump.take() {
            pump.abort();
        }
    }
}
