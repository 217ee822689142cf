//! Ambient noise calibration
//!
//! Before each answer the calibrator listens to the room for a short window and
//! derives the silence threshold the watchdog will use for that recording.

use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{info, warn};

use super::level::instant_rms;
use super::stream::AudioStream;
use crate::error::{EngineError, EngineResult};

#[derive(Debug, Clone)]
pub struct CalibrationConfig {
    /// How long to listen to the room (default: 700ms)
    pub window: Duration,
    /// Sampling cadence (default: 16ms)
    pub poll_interval: Duration,
    /// Samples per RMS measurement (default: 1024)
    pub analysis_window: usize,
    /// Lowest threshold ever returned (default: 0.003)
    pub floor: f32,
    /// Headroom over the ambient mean (default: 2.2)
    pub multiplier: f32,
    /// Threshold used when calibration cannot run (default: 0.02)
    pub fallback: f32,
}

impl Default for CalibrationConfig {
    fn default() -> Self {
        Self {
            window: Duration::from_millis(700),
            poll_interval: Duration::from_millis(16),
            analysis_window: 1024,
            floor: 0.003,
            multiplier: 2.2,
            fallback: 0.02,
        }
    }
}

pub struct AmbientCalibrator {
    config: CalibrationConfig,
}

impl AmbientCalibrator {
    pub fn new(config: CalibrationConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &CalibrationConfig {
        &self.config
    }

    /// `max(floor, mean * multiplier)`, or `None` without measurements
    pub fn threshold_from_samples(&self, samples: &[f32]) -> Option<f32> {
        if samples.is_empty() {
            return None;
        }
        let mean = samples.iter().sum::<f32>() / samples.len() as f32;
        Some(self.threshold_for_mean(mean))
    }

    pub fn threshold_for_mean(&self, mean: f32) -> f32 {
        (mean * self.config.multiplier).max(self.config.floor)
    }

    /// Listen to the stream for the calibration window
    pub async fn measure(&self, stream: &AudioStream) -> EngineResult<f32> {
        let mut analyser = stream.analyser(self.config.analysis_window);
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let started = Instant::now();
        let mut samples = Vec::new();

        loop {
            ticker.tick().await;

            let buffer = analyser.read();
            if !buffer.is_empty() {
                samples.push(instant_rms(buffer));
            }

            if started.elapsed() >= self.config.window {
                break;
            }
        }

        self.threshold_from_samples(&samples).ok_or_else(|| {
            EngineError::CalibrationUnavailable("no audio during calibration window".to_string())
        })
    }

    /// Threshold for the next recording. Never fails: falls back to a fixed
    /// value when the stream is missing or silent at the device level.
    pub async fn calibrate(&self, stream: Option<&AudioStream>) -> f32 {
        let result = match stream {
            Some(stream) => self.measure(stream).await,
            None => Err(EngineError::CalibrationUnavailable(
                "no audio stream".to_string(),
            )),
        };

        match result {
            Ok(threshold) => {
                info!("Calibrated silence threshold: {:.4}", threshold);
                threshold
            }
            Err(e) => {
                warn!("{}; using fallback threshold {:.3}", e, self.config.fallback);
                self.config.fallback
            }
        }
    }
}

impl Default for AmbientCalibrator {
    fn default() -> Self {
        Self::new(CalibrationConfig::default())
    }
}
