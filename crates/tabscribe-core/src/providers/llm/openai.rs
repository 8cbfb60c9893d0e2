use super::LlmClient;
use crate::errors::CallError;
use crate::model::{ChatRequest, ChatResponse};
use async_trait::async_trait;
use reqwest::StatusCode;
use std::time::Duration;

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";

/// Error code the service uses for prompts exceeding the model's context window.
pub const CONTEXT_LENGTH_EXCEEDED: &str = "context_length_exceeded";

#[derive(Clone, Debug)]
pub struct OpenAIConfig {
    pub api_key: String,
    pub organization: Option<String>,
    pub base_url: String,
    pub timeout: Duration,
}

pub struct OpenAIClient {
    config: OpenAIConfig,
    client: reqwest::Client,
}

impl OpenAIClient {
    pub fn new(config: OpenAIConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(config.timeout).build()?;
        Ok(Self { config, client })
    }

    fn url(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl LlmClient for OpenAIClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, CallError> {
        let mut req = self
            .client
            .post(self.url())
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(request);
        if let Some(org) = &self.config.organization {
            req = req.header("OpenAI-Organization", org);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| anyhow::anyhow!("OpenAI chat API request failed: {}", e))?;

        let status = resp.status();
        let body = resp
            .text()
            .await
            .map_err(|e| anyhow::anyhow!("OpenAI chat API body read failed: {}", e))?;

        if !status.is_success() {
            return Err(classify_error(status, &body));
        }
        parse_response(&body)
    }

    fn provider_name(&self) -> &'static str {
        "openai"
    }
}

/// Maps a non-success reply onto the two fault kinds the executor distinguishes.
pub fn classify_error(status: StatusCode, body: &str) -> CallError {
    let parsed: Option<serde_json::Value> = serde_json::from_str(body).ok();
    let code = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/code"))
        .and_then(|v| v.as_str());
    let message = parsed
        .as_ref()
        .and_then(|v| v.pointer("/error/message"))
        .and_then(|v| v.as_str())
        .unwrap_or(body);

    if status == StatusCode::BAD_REQUEST && code == Some(CONTEXT_LENGTH_EXCEEDED) {
        return CallError::InputTooLarge {
            code: CONTEXT_LENGTH_EXCEEDED.to_string(),
            message: message.to_string(),
        };
    }
    CallError::Transient(anyhow::anyhow!(
        "OpenAI chat API error ({}): {}",
        status,
        message
    ))
}

/// Validates a success body into a typed response.
///
/// A well-formed reply without content (filtered, no choices) is still a reply; only an
/// unparseable body is treated as a fault.
pub fn parse_response(body: &str) -> Result<ChatResponse, CallError> {
    let resp: ChatResponse = serde_json::from_str(body)
        .map_err(|e| anyhow::anyhow!("OpenAI API response malformed: {}", e))?;
    if resp.content().is_none() {
        tracing::warn!(
            model = %resp.model,
            finish_reason = resp.finish_reason().unwrap_or("none"),
            "reply carries no content"
        );
    }
    Ok(resp)
}
