use async_trait::async_trait;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, Response};
use std::time::Duration;
use tracing::{debug, info};

use super::messages::AgentReplyMessage;
use super::transport::{AgentReply, RemoteTransport};
use crate::error::{EngineError, EngineResult};
use crate::recording::RecordingArtifact;

/// JSON-over-HTTP client for the interview agent
pub struct HttpTransport {
    client: Client,
    base_url: String,
}

impl HttpTransport {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> EngineResult<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();

        let client = Client::builder().timeout(timeout).build()?;

        info!("Remote agent at {} (timeout {}s)", base_url, timeout.as_secs());

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    async fn read_reply(response: Response) -> EngineResult<AgentReply> {
        let response = response.error_for_status()?;
        let body = response.bytes().await?;

        let message: AgentReplyMessage = serde_json::from_slice(&body)
            .map_err(|e| EngineError::Decode(format!("malformed reply json: {}", e)))?;

        let reply = message.into_reply()?;
        debug!(
            "Agent reply: {} audio bytes, expect_more={}",
            reply.audio.len(),
            reply.expect_more
        );

        Ok(reply)
    }
}

#[async_trait]
impl RemoteTransport for HttpTransport {
    async fn session_start(&self) -> EngineResult<AgentReply> {
        let url = self.url("/api/start");
        info!("POST {}", url);

        let response = self.client.post(&url).send().await?;
        Self::read_reply(response).await
    }

    async fn send_answer(&self, artifact: RecordingArtifact) -> EngineResult<AgentReply> {
        let url = self.url("/api/send_audio");
        info!("POST {} ({} bytes)", url, artifact.len());

        let file_name = artifact.file_name();
        let mime = artifact.encoding.mime_type();
        let part = Part::bytes(artifact.bytes)
            .file_name(file_name)
            .mime_str(mime)?;
        let form = Form::new().part("audio", part);

        let response = self.client.post(&url).multipart(form).send().await?;
        Self::read_reply(response).await
    }

    async fn session_end(&self) -> EngineResult<()> {
        let url = self.url("/api/end");
        info!("POST {}", url);

        self.client.post(&url).send().await?.error_for_status()?;
        Ok(())
    }

    fn name(&self) -> &str {
        "http"
    }
}
