//! Chat-completion providers.
//!
//! [`OpenAiCompatibleClient`] talks to any endpoint that speaks the OpenAI
//! chat-completions wire format. [`MockChatModel`] stands in when no API key is
//! configured so the rest of the app stays usable in development.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::config::LlmConfig;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PromptMessage {
    pub role: String,
    pub content: String,
}

impl PromptMessage {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct Completion {
    pub content: String,
    pub model: String,
    pub mock: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("LLM request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("LLM provider returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("LLM provider returned no content")]
    EmptyResponse,
}

#[async_trait]
pub trait ChatModel: Send + Sync {
    fn model_name(&self) -> &str;

    /// Complete a conversation. `messages` is oldest first and may start with a system turn.
    async fn complete(&self, messages: &[PromptMessage]) -> Result<Completion, LlmError>;
}

/// Pick the provider for this configuration.
pub fn build_model(config: &LlmConfig) -> Result<Arc<dyn ChatModel>, LlmError> {
    match config.configured_key() {
        Some(key) => {
            let client = OpenAiCompatibleClient::new(config, key)?;
            Ok(Arc::new(client))
        }
        None if config.mock_when_unconfigured => {
            tracing::warn!("No LLM API key configured, chat replies will come from the mock model");
            Ok(Arc::new(MockChatModel))
        }
        None => {
            tracing::warn!("No LLM API key configured, chat requests will fail");
            Ok(Arc::new(UnconfiguredModel))
        }
    }
}

// -- OpenAI-compatible HTTP client --

#[derive(Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    api_url: String,
    api_key: String,
    model: String,
    max_tokens: Option<u32>,
    temperature: Option<f32>,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig, api_key: &str) -> Result<Self, LlmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            api_url: config.api_url.clone(),
            api_key: api_key.to_string(),
            model: config.model.clone(),
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        })
    }
}

#[async_trait]
impl ChatModel for OpenAiCompatibleClient {
    fn model_name(&self) -> &str {
        &self.model
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<Completion, LlmError> {
        let body = ChatCompletionRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(&self.api_url)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Failed to read error body".to_string());
            return Err(map_http_error(status, body_text));
        }

        let parsed: ChatCompletionResponse = response.json().await?;
        let model = parsed.model.clone().unwrap_or_else(|| self.model.clone());
        let content = extract_text_response(parsed)?;

        Ok(Completion {
            content,
            model,
            mock: false,
        })
    }
}

#[derive(Serialize)]
struct ChatCompletionRequest<'a> {
    model: &'a str,
    messages: &'a [PromptMessage],
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    model: Option<String>,
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

fn extract_text_response(response: ChatCompletionResponse) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|c| !c.trim().is_empty())
        .ok_or(LlmError::EmptyResponse)
}

fn map_http_error(status: StatusCode, body: String) -> LlmError {
    let message = serde_json::from_str::<ErrorResponse>(&body)
        .map(|wrapper| wrapper.error.message)
        .unwrap_or(body);

    LlmError::Status {
        status: status.as_u16(),
        message,
    }
}

// -- Offline models --

pub const MOCK_MODEL_NAME: &str = "mock-mentor";

/// Deterministic replies for development and tests.
pub struct MockChatModel;

#[async_trait]
impl ChatModel for MockChatModel {
    fn model_name(&self) -> &str {
        MOCK_MODEL_NAME
    }

    async fn complete(&self, messages: &[PromptMessage]) -> Result<Completion, LlmError> {
        let question = messages
            .iter()
            .rev()
            .find(|m| m.role == "user")
            .map(|m| m.content.as_str())
            .unwrap_or("");

        let content = format!(
            "(offline mentor) You asked: \"{}\". Connect an LLM API key for real answers. \
             Here is a simple moving-average crossover to start from:\n\n\
             input\n  Fast(9);\n  Slow(21);\nvar\n  mFast, mSlow : Float;\nbegin\n  \
             mFast := Media(Fast, Close);\n  mSlow := Media(Slow, Close);\n  \
             if (mFast > mSlow) then BuyAtMarket;\n  \
             if (mFast < mSlow) then SellShortAtMarket;\nend.",
            question.trim()
        );

        Ok(Completion {
            content,
            model: MOCK_MODEL_NAME.to_string(),
            mock: true,
        })
    }
}

/// Used when no key is configured and the mock is disabled: every call fails.
struct UnconfiguredModel;

#[async_trait]
impl ChatModel for UnconfiguredModel {
    fn model_name(&self) -> &str {
        "unconfigured"
    }

    async fn complete(&self, _messages: &[PromptMessage]) -> Result<Completion, LlmError> {
        Err(LlmError::Status {
            status: StatusCode::SERVICE_UNAVAILABLE.as_u16(),
            message: "No LLM API key configured".to_string(),
        })
    }
}
