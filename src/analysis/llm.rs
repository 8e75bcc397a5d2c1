use async_trait::async_trait;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, instrument};

use super::types::clip;
use super::AnalysisError;
use crate::config::Config;

/// Upper bound for one completion request.
pub const LLM_TIMEOUT: Duration = Duration::from_secs(60);

/// How much of an error response body is kept, in characters.
pub const ERROR_BODY_CHARS: usize = 300;

/// A message in a chat conversation with the LLM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Anything that turns a conversation into the assistant's reply text.
#[async_trait]
pub trait ChatModel: Send + Sync {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError>;
}

/// OpenAI-compatible chat completions client (Upstage Solar, OpenAI, vLLM, ...).
pub struct LlmClient {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Serialize)]
struct CompletionRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    max_tokens: u32,
}

impl LlmClient {
    pub fn new(config: &Config) -> Result<Self, AnalysisError> {
        let client = reqwest::Client::builder().timeout(LLM_TIMEOUT).build()?;
        Ok(Self {
            client,
            api_url: config.llm.api_url.clone(),
            api_key: config.llm_api_key().to_string(),
            model: config.llm.model.clone(),
            temperature: config.llm.temperature,
            max_tokens: config.llm.max_tokens,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for LlmClient {
    #[instrument(skip_all, fields(model = %self.model))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, AnalysisError> {
        let body = CompletionRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };

        debug!("sending chat completion request");
        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AnalysisError::Status {
                status,
                body: clip(body.trim(), ERROR_BODY_CHARS).into_owned(),
            });
        }

        let payload: serde_json::Value = response.json().await?;
        let content = extract_content(&payload)?;
        debug!(chars = content.len(), "received completion");
        Ok(content)
    }
}

/// Text of the first choice: `choices[0].message.content`.
pub(crate) fn extract_content(payload: &serde_json::Value) -> Result<String, AnalysisError> {
    payload
        .get("choices")
        .and_then(|c| c.get(0))
        .and_then(|c| c.get("message"))
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_str())
        .map(str::to_string)
        .ok_or(AnalysisError::MissingContent)
}
