//! Chat-completion client used for lead classification.
//!
//! The pipeline only ever sees the [`TextGenerator`] capability; the concrete
//! OpenAI-compatible client is constructed once in `main` and passed in, so
//! tests can substitute a deterministic stub.

use async_trait::async_trait;
use openai::chat::{ChatCompletionMessage, ChatCompletionMessageRole};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error};

#[derive(thiserror::Error, Debug)]
pub enum LlmError {
    #[error("network error: {0}")]
    Network(String),
    #[error("http error: {0}")]
    Http(u16),
    #[error("parse error: {0}")]
    Parse(String),
}

/// Capability for producing model text from a prompt.
#[async_trait]
pub trait TextGenerator: Send + Sync {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatCompletionMessage],
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize, Default)]
struct ChatChoice {
    #[serde(default)]
    message: ChatChoiceMessage,
}

#[derive(Deserialize, Default)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// OpenAI-compatible chat client. Base URL and key come from configuration
/// so tests can point it at a mock server.
pub struct ChatGenerator {
    client: reqwest::Client,
    api_base: String,
    api_key: String,
    model: String,
}

impl ChatGenerator {
    pub fn new(
        api_base: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(120))
            .build()?;
        Ok(Self {
            client,
            api_base: api_base.into(),
            api_key: api_key.into(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl TextGenerator for ChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
        let messages = vec![ChatCompletionMessage {
            role: ChatCompletionMessageRole::User,
            content: Some(prompt.to_string()),
            ..Default::default()
        }];
        let req = ChatRequest {
            model: &self.model,
            messages: &messages,
        };

        let url = format!("{}/v1/chat/completions", self.api_base);
        debug!(model = %self.model, "\u{2192} chat completion request");
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| {
                error!("network error calling chat API: {e}");
                LlmError::Network(e.to_string())
            })?;

        let status = res.status();
        let bytes = res
            .bytes()
            .await
            .map_err(|e| LlmError::Network(e.to_string()))?;
        debug!(status = %status, "\u{2190} body = {}",
            String::from_utf8_lossy(&bytes[..bytes.len().min(1024)]));

        if !status.is_success() {
            return Err(LlmError::Http(status.as_u16()));
        }

        let chat: ChatResponse =
            serde_json::from_slice(&bytes).map_err(|e| LlmError::Parse(e.to_string()))?;
        let answer = chat
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();
        Ok(answer)
    }
}
