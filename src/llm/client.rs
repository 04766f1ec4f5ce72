// src/llm/client.rs
use async_trait::async_trait;
use reqwest::header;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use crate::utils::error::LlmError;

const LLM_TIMEOUT_SECS: u64 = 60;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

/// Chat-completion capability: ordered messages in, one completion out.
#[async_trait]
pub trait ChatModel: Send + Sync + 'static {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError>;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for OpenAI-compatible `/chat/completions` endpoints (Groq by default).
/// Always samples at temperature 0.
pub struct ChatClient {
    client: reqwest::Client,
    base_url: String,
    model: String,
    api_key: String,
}

impl ChatClient {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>, api_key: impl Into<String>) -> Result<Self, LlmError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(LLM_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl ChatModel for ChatClient {
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let request = ChatRequest {
            model: &self.model,
            messages,
            temperature: 0.0,
        };

        tracing::debug!("Calling LLM at {} with model {} ({} messages)", url, self.model, messages.len());

        let response = self.client.post(&url)
            .header(header::AUTHORIZATION, format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!("LLM HTTP error status: {} from {}", status, url);
            return Err(LlmError::Api { status, body });
        }

        let body: ChatResponse = response.json().await?;
        extract_content(body)
    }
}

fn extract_content(body: ChatResponse) -> Result<String, LlmError> {
    body.choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .ok_or(LlmError::EmptyResponse)
}
