pub mod audio;
pub mod config;
pub mod error;
pub mod http;
pub mod playback;
pub mod recording;
pub mod remote;
pub mod session;

pub use audio::{
    AmbientCalibrator, AudioBackend, AudioBackendConfig, AudioBackendFactory, AudioFile,
    AudioFrame, AudioSource, AudioStream, LevelEstimator, ScriptedBackend,
};
pub use config::Config;
pub use error::{EngineError, EngineResult};
pub use http::{create_router, AppState};
pub use playback::{Playback, SilentPlayback, SpeakerPlayback};
pub use recording::{CaptureSession, RecordingArtifact, SilenceWatchdog};
pub use remote::{AgentReply, HttpTransport, RemoteTransport};
pub use session::{InterviewSession, SessionOutcome, SessionStatus, TurnConfig, TurnState};
