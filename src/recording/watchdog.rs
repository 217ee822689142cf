//! Sustained-silence detection for an active recording

use std::time::Duration;
use tokio::time::{interval, Instant, MissedTickBehavior};
use tracing::{debug, info};

use crate::audio::{Analyser, LevelEstimator};

#[derive(Debug, Clone)]
pub struct WatchdogConfig {
    /// Continuous quiet needed before the answer is considered finished (default: 6000ms)
    pub silence_window: Duration,
    /// Polling cadence (default: 16ms)
    pub poll_interval: Duration,
    /// Samples per RMS measurement (default: 2048)
    pub analysis_window: usize,
}

impl Default for WatchdogConfig {
    fn default() -> Self {
        Self {
            silence_window: Duration::from_millis(6000),
            poll_interval: Duration::from_millis(16),
            analysis_window: 2048,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogVerdict {
    /// Still waiting for the speaker to finish
    Listening,
    /// Quiet for the whole silence window
    Sustained,
}

/// Tracks how long the smoothed level has stayed under the threshold
///
/// Any reading at or above the threshold resets the quiet period.
#[derive(Debug)]
pub struct SilenceWatchdog {
    threshold: f32,
    config: WatchdogConfig,
    estimator: LevelEstimator,
    silence_start: Option<Instant>,
}

impl SilenceWatchdog {
    pub fn new(threshold: f32, config: WatchdogConfig) -> Self {
        Self {
            threshold,
            config,
            estimator: LevelEstimator::silence(),
            silence_start: None,
        }
    }

    pub fn threshold(&self) -> f32 {
        self.threshold
    }

    pub fn silence_start(&self) -> Option<Instant> {
        self.silence_start
    }

    /// Feed one analysis buffer taken at `now`
    pub fn observe(&mut self, samples: &[i16], now: Instant) -> WatchdogVerdict {
        let level = self.estimator.update(samples);
        self.observe_level(level, now)
    }

    /// Feed an already smoothed level taken at `now`
    pub fn observe_level(&mut self, level: f32, now: Instant) -> WatchdogVerdict {
        if level >= self.threshold {
            if self.silence_start.take().is_some() {
                debug!("Speech resumed (level {:.4})", level);
            }
            return WatchdogVerdict::Listening;
        }

        let since = *self.silence_start.get_or_insert(now);
        if now.duration_since(since) >= self.config.silence_window {
            WatchdogVerdict::Sustained
        } else {
            WatchdogVerdict::Listening
        }
    }

    /// Poll the analyser until sustained silence is seen
    ///
    /// Cancel by dropping the future; the analyser goes with it.
    pub async fn run(mut self, mut analyser: Analyser) {
        let mut ticker = interval(self.config.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        loop {
            ticker.tick().await;

            let now = Instant::now();
            if self.observe(analyser.read(), now) == WatchdogVerdict::Sustained {
                info!(
                    "Sustained silence for {:.1}s (threshold {:.4})",
                    self.config.silence_window.as_secs_f64(),
                    self.threshold
                );
                return;
            }
        }
    }
}
