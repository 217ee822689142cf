//! Interview turn management
//!
//! This module provides the `InterviewSession` orchestrator that manages:
//! - Microphone acquisition and the shared audio stream
//! - Reply playback and the thinking countdown
//! - Ambient calibration, recording and silence detection
//! - Answer upload and the transition log

mod config;
mod engine;
mod meter;
mod state;
mod status;

pub use config::TurnConfig;
pub use engine::InterviewSession;
pub use state::TurnState;
pub use status::{SessionOutcome, SessionStatus, Speaker, TranscriptEntry, Transition};
