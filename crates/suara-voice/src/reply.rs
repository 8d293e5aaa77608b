//! Reply generation.
//!
//! The pipeline only depends on the [`ReplyEngine`] contract. Whatever the
//! engine reports is propagated without reinterpretation.

use crate::config::ReplyConfig;
use crate::error::VoiceError;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use suara_types::{ReplyText, Transcript};
use tracing::{debug, info};

/// Turns a transcript into reply text.
#[async_trait]
pub trait ReplyEngine: Send + Sync {
    async fn generate_reply(&self, transcript: &Transcript) -> Result<ReplyText, VoiceError>;
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Reply engine backed by an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct HttpReplyEngine {
    client: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    system_prompt: String,
    max_tokens: Option<u32>,
}

impl std::fmt::Debug for HttpReplyEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpReplyEngine")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("max_tokens", &self.max_tokens)
            .finish_non_exhaustive()
    }
}

impl HttpReplyEngine {
    pub fn new(config: &ReplyConfig) -> Result<Self, VoiceError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| VoiceError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            model: config.model.clone(),
            api_key: config.api_key.clone().filter(|key| !key.is_empty()),
            system_prompt: config.system_prompt.clone(),
            max_tokens: config.max_tokens,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl ReplyEngine for HttpReplyEngine {
    async fn generate_reply(&self, transcript: &Transcript) -> Result<ReplyText, VoiceError> {
        let body = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: &self.system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: transcript.as_str(),
                },
            ],
            max_tokens: self.max_tokens,
        };

        debug!(endpoint = %self.endpoint, model = %self.model, "requesting reply");

        let mut request = self.client.post(&self.endpoint).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| VoiceError::Upstream(format!("request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            return Err(VoiceError::Upstream(format!(
                "reply endpoint returned {}: {}",
                status,
                detail.trim()
            )));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| VoiceError::Upstream(format!("invalid reply payload: {}", e)))?;

        let choice = parsed
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| VoiceError::Upstream("reply payload has no choices".to_string()))?;
        let content = choice.message.content.ok_or_else(|| {
            VoiceError::Upstream("reply choice has no message content".to_string())
        })?;

        info!(chars = content.chars().count(), "reply generated");
        Ok(ReplyText(content))
    }
}
