use std::path::PathBuf;
use std::time::Duration;

use crate::audio::CalibrationConfig;
use crate::recording::WatchdogConfig;

/// Timing and thresholds for one interview
#[derive(Debug, Clone)]
pub struct TurnConfig {
    /// Unique session identifier (e.g., "interview-0b6e...")
    pub session_id: String,

    /// Countdown before each answer, in whole seconds
    /// Default: 15
    pub think_secs: u32,

    /// Hard ceiling on a single answer
    /// Default: 90 seconds
    pub max_answer: Duration,

    /// Pause between acquiring the microphone and contacting the server
    /// Default: 350ms
    pub start_delay: Duration,

    pub calibration: CalibrationConfig,

    pub watchdog: WatchdogConfig,

    /// Live meter cadence
    pub poll_interval: Duration,

    /// Samples per meter reading
    pub meter_window: usize,

    /// Keep a copy of each uploaded answer here when set
    pub recordings_path: Option<PathBuf>,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            session_id: format!("interview-{}", uuid::Uuid::new_v4()),
            think_secs: 15,
            max_answer: Duration::from_secs(90),
            start_delay: Duration::from_millis(350),
            calibration: CalibrationConfig::default(),
            watchdog: WatchdogConfig::default(),
            poll_interval: Duration::from_millis(16),
            meter_window: 1024,
            recordings_path: None,
        }
    }
}
