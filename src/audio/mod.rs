pub mod backend;
pub mod calibrate;
pub mod cpal_backend;
pub mod file;
pub mod level;
pub mod scripted;
pub mod stream;

pub use backend::{AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFrame, AudioSource};
pub use calibrate::{AmbientCalibrator, CalibrationConfig};
pub use cpal_backend::CpalBackend;
pub use file::{AudioFile, FileBackend};
pub use level::LevelEstimator;
pub use scripted::ScriptedBackend;
pub use stream::{Analyser, AudioStream};
