//! Error taxonomy for the turn-taking engine
//!
//! Calibration and playback failures are absorbed by the orchestrator and only
//! logged. Permission and transport failures end the attempt in a visible error
//! state.

use thiserror::Error;

/// Result type alias for engine operations
pub type EngineResult<T> = Result<T, EngineError>;

#[derive(Error, Debug)]
pub enum EngineError {
    /// Capture device access refused or no input device present
    #[error("Microphone unavailable: {0}")]
    PermissionDenied(String),

    /// Remote agent call failed (network, timeout, non-2xx status, bad JSON)
    #[error("Remote agent unreachable: {0}")]
    Unreachable(String),

    /// Recording stopped without any captured audio
    #[error("Recording produced no audio")]
    EmptyCapture,

    #[error("A recording is already in progress")]
    AlreadyRecording,

    #[error("Ambient calibration unavailable: {0}")]
    CalibrationUnavailable(String),

    #[error("Playback failed: {0}")]
    PlaybackFailure(String),

    /// Reply payload could not be decoded
    #[error("Invalid reply payload: {0}")]
    Decode(String),

    #[error("Failed to encode recording: {0}")]
    Artifact(String),
}

impl EngineError {
    /// Whether the error came from talking to the remote agent.
    pub fn is_transport(&self) -> bool {
        matches!(self, EngineError::Unreachable(_) | EngineError::Decode(_))
    }
}

impl From<reqwest::Error> for EngineError {
    fn from(err: reqwest::Error) -> Self {
        EngineError::Unreachable(err.to_string())
    }
}

impl From<hex::FromHexError> for EngineError {
    fn from(err: hex::FromHexError) -> Self {
        EngineError::Decode(format!("reply audio is not valid hex: {}", err))
    }
}

impl From<hound::Error> for EngineError {
    fn from(err: hound::Error) -> Self {
        EngineError::Artifact(err.to_string())
    }
}

impl From<cpal::DefaultStreamConfigError> for EngineError {
    fn from(err: cpal::DefaultStreamConfigError) -> Self {
        EngineError::PermissionDenied(err.to_string())
    }
}

impl From<cpal::BuildStreamError> for EngineError {
    fn from(err: cpal::BuildStreamError) -> Self {
        EngineError::PermissionDenied(err.to_string())
    }
}

impl From<cpal::PlayStreamError> for EngineError {
    fn from(err: cpal::PlayStreamError) -> Self {
        EngineError::PermissionDenied(err.to_string())
    }
}
