use crate::errors::CallError;
use crate::model::{ChatRequest, ChatResponse};
use async_trait::async_trait;

/// Handle to a chat-completion service, constructed once and passed to the executor.
#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, CallError>;
    fn provider_name(&self) -> &'static str;
}

pub mod fake;
pub mod openai;
