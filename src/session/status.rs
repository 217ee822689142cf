use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use super::state::TurnState;

/// Live snapshot of an interview, published over a watch channel
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionStatus {
    pub session_id: String,

    pub state: TurnState,

    /// Human-readable status line
    pub status_text: String,

    /// Seconds left to think, only while thinking
    pub countdown_secs: Option<u32>,

    /// Microphone meter level (0.0 to 1.0)
    pub level: f32,

    /// Whether the interviewer is speaking right now
    pub agent_speaking: bool,

    /// Number of answers uploaded so far
    pub turns_completed: usize,

    /// When the session started
    pub started_at: DateTime<Utc>,
}

impl SessionStatus {
    pub fn new(session_id: impl Into<String>) -> Self {
        Self {
            session_id: session_id.into(),
            state: TurnState::Idle,
            status_text: TurnState::Idle.status_text(None),
            countdown_secs: None,
            level: 0.0,
            agent_speaking: false,
            turns_completed: 0,
            started_at: Utc::now(),
        }
    }
}

/// One entry of the transition log
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Transition {
    pub from: TurnState,
    pub to: TurnState,

    pub at: DateTime<Utc>,

    /// Milliseconds since the session started
    pub elapsed_ms: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Speaker {
    Interviewer,
    Candidate,
}

/// A line of the interview transcript, as reported by the agent
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,

    pub text: String,

    /// When this line was received
    pub timestamp: DateTime<Utc>,
}

/// Everything that happened in a finished session
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionOutcome {
    pub session_id: String,
    pub final_state: TurnState,
    pub transitions: Vec<Transition>,
    pub answers_uploaded: usize,

    /// Silence threshold used for each recording, in order
    pub thresholds: Vec<f32>,

    pub transcript: Vec<TranscriptEntry>,

    /// Answers kept on disk
    pub archived: Vec<PathBuf>,
}

impl SessionOutcome {
    /// States in the order they were visited, starting with `Idle`
    pub fn visited(&self) -> Vec<TurnState> {
        let mut states = vec![TurnState::Idle];
        states.extend(self.transitions.iter().map(|t| t.to));
        states
    }

    /// How many times the given state was entered
    pub fn entries(&self, state: TurnState) -> usize {
        self.transitions.iter().filter(|t| t.to == state).count()
    }

    /// Time spent in each visit of `state`, in milliseconds
    pub fn dwell_ms(&self, state: TurnState) -> Vec<u64> {
        self.transitions
            .windows(2)
            .filter(|pair| pair[0].to == state)
            .map(|pair| pair[1].elapsed_ms - pair[0].elapsed_ms)
            .collect()
    }
}
