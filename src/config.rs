use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

use crate::audio::{AudioBackendConfig, AudioSource, CalibrationConfig};
use crate::recording::WatchdogConfig;
use crate::session::TurnConfig;

/// Config file looked up when none is given (any extension `config` supports)
pub const DEFAULT_CONFIG_PATH: &str = "config/loqa-interview";

/// Environment prefix, e.g. `LOQA_INTERVIEW__REMOTE__BASE_URL`
pub const ENV_PREFIX: &str = "LOQA_INTERVIEW";

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub remote: RemoteConfig,
    pub audio: AudioConfig,
    pub turn: TurnSettings,
    pub control: ControlConfig,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RemoteConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AudioConfig {
    pub sample_rate: u32,
    pub buffer_duration_ms: u64,
    /// `microphone` or a path to a WAV file
    pub input: String,
    pub playback: bool,
    pub recordings_path: Option<PathBuf>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct TurnSettings {
    pub think_secs: u32,
    pub silence_ms: u64,
    pub max_answer_ms: u64,
    pub calibration_ms: u64,
    pub threshold_floor: f32,
    pub threshold_multiplier: f32,
    pub fallback_threshold: f32,
    pub poll_interval_ms: u64,
    pub start_delay_ms: u64,
    pub meter_window: usize,
    pub calibration_window: usize,
    pub silence_window: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ControlConfig {
    pub enabled: bool,
    pub bind: String,
    pub port: u16,
}

impl Config {
    /// Defaults, then the optional file, then the environment
    pub fn load(path: Option<&str>) -> Result<Self> {
        let required = path.is_some();
        let path = path.unwrap_or(DEFAULT_CONFIG_PATH);

        let settings = Self::defaults()?
            .add_source(config::File::with_name(path).required(required))
            .add_source(
                config::Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("__")
                    .separator("__"),
            )
            .build()
            .with_context(|| format!("Failed to load configuration from {}", path))?;

        settings
            .try_deserialize()
            .context("Invalid configuration")
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("remote.base_url", "http://127.0.0.1:8000")?
            .set_default("remote.timeout_secs", 30_i64)?
            .set_default("audio.sample_rate", 16_000_i64)?
            .set_default("audio.buffer_duration_ms", 20_i64)?
            .set_default("audio.input", "microphone")?
            .set_default("audio.playback", true)?
            .set_default("turn.think_secs", 15_i64)?
            .set_default("turn.silence_ms", 6_000_i64)?
            .set_default("turn.max_answer_ms", 90_000_i64)?
            .set_default("turn.calibration_ms", 700_i64)?
            .set_default("turn.threshold_floor", 0.003_f64)?
            .set_default("turn.threshold_multiplier", 2.2_f64)?
            .set_default("turn.fallback_threshold", 0.02_f64)?
            .set_default("turn.poll_interval_ms", 16_i64)?
            .set_default("turn.start_delay_ms", 350_i64)?
            .set_default("turn.meter_window", 1_024_i64)?
            .set_default("turn.calibration_window", 1_024_i64)?
            .set_default("turn.silence_window", 2_048_i64)?
            .set_default("control.enabled", true)?
            .set_default("control.bind", "127.0.0.1")?
            .set_default("control.port", 8787_i64)?)
    }

    pub fn audio_source(&self) -> AudioSource {
        AudioSource::parse(&self.audio.input)
    }

    pub fn backend_config(&self) -> AudioBackendConfig {
        AudioBackendConfig {
            target_sample_rate: self.audio.sample_rate,
            buffer_duration_ms: self.audio.buffer_duration_ms,
        }
    }

    pub fn remote_timeout(&self) -> Duration {
        Duration::from_secs(self.remote.timeout_secs)
    }

    pub fn turn_config(&self) -> TurnConfig {
        let turn = &self.turn;
        let poll_interval = Duration::from_millis(turn.poll_interval_ms.max(1));

        TurnConfig {
            think_secs: turn.think_secs,
            max_answer: Duration::from_millis(turn.max_answer_ms),
            start_delay: Duration::from_millis(turn.start_delay_ms),
            calibration: CalibrationConfig {
                window: Duration::from_millis(turn.calibration_ms),
                poll_interval,
                analysis_window: turn.calibration_window,
                floor: turn.threshold_floor,
                multiplier: turn.threshold_multiplier,
                fallback: turn.fallback_threshold,
            },
            watchdog: WatchdogConfig {
                silence_window: Duration::from_millis(turn.silence_ms),
                poll_interval,
                analysis_window: turn.silence_window,
            },
            poll_interval,
            meter_window: turn.meter_window,
            recordings_path: self.audio.recordings_path.clone(),
            ..TurnConfig::default()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults_match_interview_timing() {
        let cfg = Config::load(Some("does/not/exist")).err();
        assert!(cfg.is_some(), "an explicit missing file is an error");

        let cfg = Config::load(None).unwrap();
        let turn = cfg.turn_config();

        assert_eq!(cfg.remote.base_url, "http://127.0.0.1:8000");
        assert_eq!(turn.think_secs, 15);
        assert_eq!(turn.max_answer, Duration::from_secs(90));
        assert_eq!(turn.start_delay, Duration::from_millis(350));
        assert_eq!(turn.watchdog.silence_window, Duration::from_millis(6000));
        assert_eq!(turn.calibration.window, Duration::from_millis(700));
        assert!((turn.calibration.multiplier - 2.2).abs() < 1e-6);
        assert!(turn.session_id.starts_with("interview-"));
        assert_eq!(cfg.audio_source(), AudioSource::Microphone);
    }

    #[test]
    fn test_file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            "[remote]\nbase_url = \"http://interview.local:9000\"\n\n[turn]\nthink_secs = 5\n\n[audio]\ninput = \"answers/take1.wav\"\nrecordings_path = \"out\""
        )
        .unwrap();

        let path = file.path().to_str().unwrap().to_string();
        let cfg = Config::load(Some(&path)).unwrap();

        assert_eq!(cfg.remote.base_url, "http://interview.local:9000");
        assert_eq!(cfg.turn.think_secs, 5);
        assert_eq!(cfg.turn.silence_ms, 6000);
        assert_eq!(
            cfg.audio_source(),
            AudioSource::File(PathBuf::from("answers/take1.wav"))
        );
        assert_eq!(cfg.turn_config().recordings_path, Some(PathBuf::from("out")));
    }
}
