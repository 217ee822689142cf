use async_trait::async_trait;

use crate::error::EngineResult;
use crate::recording::RecordingArtifact;

/// Decoded reply from the interview agent
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AgentReply {
    /// MPEG audio to play; empty means nothing to say out loud
    pub audio: Vec<u8>,
    /// Whether another answer is expected after this reply
    pub expect_more: bool,
    pub user_text: Option<String>,
    pub ai_text: Option<String>,
}

impl AgentReply {
    pub fn has_audio(&self) -> bool {
        !self.audio.is_empty()
    }
}

/// Connection to the remote interview agent
#[async_trait]
pub trait RemoteTransport: Send + Sync {
    /// Open the interview and fetch the first question
    async fn session_start(&self) -> EngineResult<AgentReply>;

    /// Upload one finished answer and fetch the agent's response
    async fn send_answer(&self, artifact: RecordingArtifact) -> EngineResult<AgentReply>;

    /// Tell the agent the user left. Callers do not wait on or act on the outcome.
    async fn session_end(&self) -> EngineResult<()>;

    fn name(&self) -> &str;
}
