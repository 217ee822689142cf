use serde::{Deserialize, Serialize};
use std::fmt;

/// Where the interview currently stands
///
/// `Complete` is entered from `AgentSpeaking` once the reply that carried
/// `expect_more = false` has finished playing. This includes the opening reply
/// from the start call, in which case the interview ends without recording.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnState {
    Idle,
    ContactingServer,
    AgentSpeaking,
    Thinking,
    Calibrating,
    Recording,
    Uploading,
    Complete,
    EndedByUser,
    ErrorUnreachable,
    ErrorUploadFailed,
    ErrorPermissionDenied,
    ErrorEmptyCapture,
}

impl TurnState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TurnState::Complete | TurnState::EndedByUser) || self.is_error()
    }

    pub fn is_error(&self) -> bool {
        matches!(
            self,
            TurnState::ErrorUnreachable
                | TurnState::ErrorUploadFailed
                | TurnState::ErrorPermissionDenied
                | TurnState::ErrorEmptyCapture
        )
    }

    /// Transition table of the turn loop
    pub fn can_transition_to(&self, next: TurnState) -> bool {
        use TurnState::*;

        if self.is_terminal() {
            return false;
        }
        if next == EndedByUser {
            return true;
        }

        matches!(
            (self, next),
            (Idle, ContactingServer)
                | (Idle, ErrorPermissionDenied)
                | (ContactingServer, AgentSpeaking)
                | (ContactingServer, ErrorUnreachable)
                | (AgentSpeaking, Thinking)
                | (AgentSpeaking, Complete)
                | (Thinking, Calibrating)
                | (Calibrating, Recording)
                | (Calibrating, ErrorEmptyCapture)
                | (Recording, Uploading)
                | (Recording, ErrorEmptyCapture)
                | (Uploading, AgentSpeaking)
                | (Uploading, ErrorUploadFailed)
        )
    }

    /// Text shown to the candidate. `countdown` only applies while thinking.
    pub fn status_text(&self, countdown: Option<u32>) -> String {
        match self {
            TurnState::Idle => "Starting…".to_string(),
            TurnState::ContactingServer => "Contacting server...".to_string(),
            TurnState::AgentSpeaking => "Interviewer speaking…".to_string(),
            TurnState::Thinking => match countdown {
                Some(secs) => format!("Think… {}s", secs),
                None => "Thinking…".to_string(),
            },
            TurnState::Calibrating => "Calibrating mic…".to_string(),
            TurnState::Recording => "Recording… (max 90s)".to_string(),
            TurnState::Uploading => "Processing upload…".to_string(),
            TurnState::Complete => "Interview complete.".to_string(),
            TurnState::EndedByUser => "Interview ended by user.".to_string(),
            TurnState::ErrorUnreachable => "Server unreachable".to_string(),
            TurnState::ErrorUploadFailed => "Upload failed".to_string(),
            TurnState::ErrorPermissionDenied => "Allow mic access".to_string(),
            TurnState::ErrorEmptyCapture => "No audio captured".to_string(),
        }
    }
}

impl fmt::Display for TurnState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use TurnState::*;

    const ALL: [TurnState; 13] = [
        Idle,
        ContactingServer,
        AgentSpeaking,
        Thinking,
        Calibrating,
        Recording,
        Uploading,
        Complete,
        EndedByUser,
        ErrorUnreachable,
        ErrorUploadFailed,
        ErrorPermissionDenied,
        ErrorEmptyCapture,
    ];

    #[test]
    fn test_terminal_states_have_no_exits() {
        for from in ALL.iter().filter(|s| s.is_terminal()) {
            for to in ALL {
                assert!(!from.can_transition_to(to), "{} -> {}", from, to);
            }
        }
    }

    #[test]
    fn test_recording_only_entered_from_calibrating() {
        for from in ALL {
            assert_eq!(from.can_transition_to(Recording), from == Calibrating, "{}", from);
        }
    }

    #[test]
    fn test_thinking_only_after_agent_spoke() {
        for from in ALL {
            assert_eq!(from.can_transition_to(Thinking), from == AgentSpeaking, "{}", from);
        }
    }

    #[test]
    fn test_user_can_end_from_any_live_state() {
        for from in ALL.iter().filter(|s| !s.is_terminal()) {
            assert!(from.can_transition_to(EndedByUser), "{}", from);
        }
    }

    #[test]
    fn test_status_texts() {
        assert_eq!(Thinking.status_text(Some(15)), "Think… 15s");
        assert_eq!(Recording.status_text(None), "Recording… (max 90s)");
        assert_eq!(ContactingServer.status_text(None), "Contacting server...");
        assert_eq!(ErrorUnreachable.status_text(None), "Server unreachable");
    }

    #[test]
    fn test_serializes_snake_case() {
        let json = serde_json::to_string(&ErrorUploadFailed).unwrap();
        assert_eq!(json, "\"error_upload_failed\"");
    }
}
