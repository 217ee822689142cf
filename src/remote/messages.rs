use serde::{Deserialize, Serialize};

use super::transport::AgentReply;
use crate::error::EngineResult;

/// Reply body of `/api/start` and `/api/send_audio`
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct AgentReplyMessage {
    /// Hex-encoded MPEG audio
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_audio_b64: Option<String>,
    /// Older key for the same payload
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expect_more: Option<bool>,
    /// Transcription of the uploaded answer
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ai_text: Option<String>,
}

impl AgentReplyMessage {
    /// Hex payload, preferring `ai_audio_b64` and skipping empty values
    pub fn audio_hex(&self) -> Option<&str> {
        [&self.ai_audio_b64, &self.ai_audio]
            .into_iter()
            .flatten()
            .map(|s| s.trim())
            .find(|s| !s.is_empty())
    }

    pub fn into_reply(self) -> EngineResult<AgentReply> {
        let audio = match self.audio_hex() {
            Some(encoded) => hex::decode(encoded)?,
            None => Vec::new(),
        };

        Ok(AgentReply {
            audio,
            // Only an explicit `false` ends the interview
            expect_more: self.expect_more.unwrap_or(true),
            user_text: self.user_text,
            ai_text: self.ai_text,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EngineError;

    fn parse(json: &str) -> AgentReplyMessage {
        serde_json::from_str(json).expect("valid reply json")
    }

    #[test]
    fn test_prefers_primary_audio_key() {
        let reply = parse(r#"{"ai_audio_b64": "0102", "ai_audio": "ffff"}"#)
            .into_reply()
            .unwrap();
        assert_eq!(reply.audio, vec![1, 2]);
    }

    #[test]
    fn test_falls_back_to_legacy_key() {
        let reply = parse(r#"{"ai_audio_b64": null, "ai_audio": "0a0b"}"#)
            .into_reply()
            .unwrap();
        assert_eq!(reply.audio, vec![10, 11]);

        let reply = parse(r#"{"ai_audio_b64": "", "ai_audio": "0c"}"#)
            .into_reply()
            .unwrap();
        assert_eq!(reply.audio, vec![12]);
    }

    #[test]
    fn test_missing_audio_is_empty() {
        let reply = parse(r#"{"ai_text": "Hello"}"#).into_reply().unwrap();
        assert!(reply.audio.is_empty());
        assert!(reply.expect_more);
        assert_eq!(reply.ai_text.as_deref(), Some("Hello"));
    }

    #[test]
    fn test_only_explicit_false_ends_interview() {
        assert!(parse(r#"{}"#).into_reply().unwrap().expect_more);
        assert!(parse(r#"{"expect_more": true}"#).into_reply().unwrap().expect_more);
        assert!(!parse(r#"{"expect_more": false}"#).into_reply().unwrap().expect_more);
    }

    #[test]
    fn test_bad_hex_is_decode_error() {
        let err = parse(r#"{"ai_audio_b64": "not hex"}"#).into_reply().unwrap_err();
        assert!(matches!(err, EngineError::Decode(_)));
        assert!(err.is_transport());
    }

    #[test]
    fn test_user_text_is_kept() {
        let reply = parse(r#"{"user_text": "I like Rust", "ai_text": "Why?"}"#)
            .into_reply()
            .unwrap();
        assert_eq!(reply.user_text.as_deref(), Some("I like Rust"));
        assert_eq!(reply.ai_text.as_deref(), Some("Why?"));
    }
}
