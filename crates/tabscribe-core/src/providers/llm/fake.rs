use super::LlmClient;
use crate::errors::CallError;
use crate::model::{ChatRequest, ChatResponse, Choice, Extra, ReplyMessage};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Builds a single-choice response carrying `text`.
pub fn text_response(model: &str, text: &str) -> ChatResponse {
    reply(model, Some(text.to_string()), "stop")
}

/// A reply whose content was withheld by the service's filter.
pub fn filtered_response(model: &str) -> ChatResponse {
    reply(model, None, "content_filter")
}

fn reply(model: &str, content: Option<String>, finish_reason: &str) -> ChatResponse {
    ChatResponse {
        id: None,
        created: None,
        model: model.to_string(),
        choices: vec![Choice {
            index: 0,
            message: ReplyMessage::new("assistant", content),
            finish_reason: Some(finish_reason.into()),
            extra: Extra::new(),
        }],
        usage: None,
        system_fingerprint: None,
        extra: Extra::new(),
    }
}

/// Offline client that echoes the final message back. Used for dry runs.
#[derive(Clone, Default)]
pub struct DummyClient;

#[async_trait]
impl LlmClient for DummyClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, CallError> {
        let text = format!(
            "hello from {} :: {}",
            request.model,
            request.last_content().unwrap_or_default()
        );
        Ok(text_response(&request.model, &text))
    }

    fn provider_name(&self) -> &'static str {
        "dummy"
    }
}

type Script = Box<dyn Fn(&ChatRequest) -> Result<ChatResponse, CallError> + Send + Sync>;

/// Client replaying queued outcomes, falling back to a per-request rule.
///
/// Every request it receives is recorded, including retries.
pub struct ScriptedClient {
    queue: Mutex<VecDeque<Result<ChatResponse, CallError>>>,
    fallback: Script,
    calls: Mutex<Vec<ChatRequest>>,
}

impl ScriptedClient {
    /// Answers every request with `reply: <last message>`.
    pub fn echo() -> Self {
        Self::with_rule(|req| {
            Ok(text_response(
                &req.model,
                &format!("reply: {}", req.last_content().unwrap_or_default()),
            ))
        })
    }

    pub fn with_rule<F>(rule: F) -> Self
    where
        F: Fn(&ChatRequest) -> Result<ChatResponse, CallError> + Send + Sync + 'static,
    {
        Self {
            queue: Mutex::new(VecDeque::new()),
            fallback: Box::new(rule),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Queues an outcome consumed by the next call, ahead of the rule.
    pub fn push(&self, outcome: Result<ChatResponse, CallError>) {
        self.queue.lock().unwrap().push_back(outcome);
    }

    pub fn calls(&self) -> Vec<ChatRequest> {
        self.calls.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmClient for ScriptedClient {
    async fn complete(&self, request: &ChatRequest) -> Result<ChatResponse, CallError> {
        self.calls.lock().unwrap().push(request.clone());
        let queued = self.queue.lock().unwrap().pop_front();
        match queued {
            Some(outcome) => outcome,
            None => (self.fallback)(request),
        }
    }

    fn provider_name(&self) -> &'static str {
        "scripted"
    }
}
