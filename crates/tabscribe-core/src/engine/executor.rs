use crate::engine::backoff::BackoffPolicy;
use crate::errors::CallError;
use crate::model::{ChatRequest, ChatResponse};
use crate::providers::llm::LlmClient;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Smaller-context model -> larger-context model of the same family.
pub type ModelFallbacks = BTreeMap<String, String>;

pub fn default_fallbacks() -> ModelFallbacks {
    let mut m = BTreeMap::new();
    m.insert("gpt-3.5-turbo".to_string(), "gpt-3.5-turbo-16k".to_string());
    m
}

#[derive(Debug, Clone, PartialEq)]
pub enum CallOutcome {
    Completed(ChatResponse),
    /// Input too large for the last model on the fallback ladder.
    Skipped { code: String },
    /// Retry budget spent on transient faults; nothing should be recorded.
    GaveUp { attempts: u32, last_error: String },
}

/// Result for one pending index. `request` is what was actually sent last.
#[derive(Debug, Clone)]
pub struct CallResult {
    pub index: usize,
    pub request: ChatRequest,
    pub outcome: CallOutcome,
}

/// Issues one call per request, retrying transient faults and escalating oversized inputs.
#[derive(Clone)]
pub struct CallExecutor {
    client: Arc<dyn LlmClient>,
    backoff: Arc<dyn BackoffPolicy>,
    fallbacks: ModelFallbacks,
}

impl CallExecutor {
    pub fn new(
        client: Arc<dyn LlmClient>,
        backoff: Arc<dyn BackoffPolicy>,
        fallbacks: ModelFallbacks,
    ) -> Self {
        Self {
            client,
            backoff,
            fallbacks,
        }
    }

    pub fn provider_name(&self) -> &'static str {
        self.client.provider_name()
    }

    /// Lazily executes `pending` in order; nothing is sent until the stream is pulled.
    pub fn stream(&self, pending: Vec<(usize, ChatRequest)>) -> CallStream<'_> {
        CallStream {
            executor: self,
            total: pending.len(),
            yielded: 0,
            queue: pending.into_iter(),
        }
    }

    /// Drives a single request to a terminal outcome.
    pub async fn call(&self, mut request: ChatRequest) -> (ChatRequest, CallOutcome) {
        let mut tried_models = vec![request.model.clone()];
        let mut attempt: u32 = 0;

        loop {
            match self.client.complete(&request).await {
                Ok(resp) => return (request, CallOutcome::Completed(resp)),
                Err(CallError::InputTooLarge { code, message }) => {
                    match self.fallbacks.get(&request.model) {
                        Some(next) if !tried_models.contains(next) => {
                            tracing::info!(
                                from = %request.model,
                                to = %next,
                                code = %code,
                                "input too large, switching to larger context model"
                            );
                            request.model = next.clone();
                            tried_models.push(next.clone());
                        }
                        _ => {
                            tracing::warn!(
                                model = %request.model,
                                code = %code,
                                error = %message,
                                "context length exceeded, skip"
                            );
                            return (request, CallOutcome::Skipped { code });
                        }
                    }
                }
                Err(CallError::Transient(e)) => {
                    attempt += 1;
                    let Some(delay) = self.backoff.delay(attempt) else {
                        tracing::warn!(
                            error = %e,
                            attempts = attempt,
                            "retry budget exhausted, leaving request pending"
                        );
                        return (
                            request,
                            CallOutcome::GaveUp {
                                attempts: attempt,
                                last_error: e.to_string(),
                            },
                        );
                    };
                    tracing::warn!(
                        error = %e,
                        attempt,
                        delay_secs = delay.as_secs(),
                        "call failed, retrying after delay"
                    );
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
}

/// Pull-based sequence of call results, one remote call per `next`.
pub struct CallStream<'a> {
    executor: &'a CallExecutor,
    total: usize,
    yielded: usize,
    queue: std::vec::IntoIter<(usize, ChatRequest)>,
}

impl CallStream<'_> {
    pub async fn next(&mut self) -> Option<CallResult> {
        let (index, request) = self.queue.next()?;
        let (request, outcome) = self.executor.call(request).await;
        self.yielded += 1;
        Some(CallResult {
            index,
            request,
            outcome,
        })
    }

    pub fn total(&self) -> usize {
        self.total
    }

    /// Requests not yet resolved, counting one whose `next` was dropped mid-call.
    pub fn remaining(&self) -> usize {
        self.total - self.yielded
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::backoff::{NoDelay, RecordingBackoff};
    use crate::model::ChatMessage;
    use crate::providers::llm::fake::{filtered_response, text_response, ScriptedClient};
    use std::time::Duration;

    fn req(model: &str, content: &str) -> ChatRequest {
        ChatRequest {
            model: model.into(),
            temperature: 0.0,
            messages: vec![ChatMessage::new("user", content)],
            max_tokens: None,
        }
    }

    fn too_large() -> CallError {
        CallError::InputTooLarge {
            code: "context_length_exceeded".into(),
            message: "maximum context length".into(),
        }
    }

    #[tokio::test]
    async fn transient_faults_back_off_linearly() {
        let client = Arc::new(ScriptedClient::echo());
        client.push(Err(anyhow::anyhow!("connection reset").into()));
        client.push(Err(anyhow::anyhow!("rate limited").into()));
        client.push(Ok(text_response("gpt-3.5-turbo", "third time")));

        let backoff = Arc::new(RecordingBackoff::new(
            crate::engine::backoff::LinearBackoff::default(),
        ));
        let exec = CallExecutor::new(client.clone(), backoff.clone(), default_fallbacks());

        let (sent, outcome) = exec.call(req("gpt-3.5-turbo", "row")).await;
        assert_eq!(
            outcome,
            CallOutcome::Completed(text_response("gpt-3.5-turbo", "third time"))
        );
        assert_eq!(sent.model, "gpt-3.5-turbo");
        assert_eq!(client.call_count(), 3);
        assert_eq!(
            backoff.requested(),
            vec![Duration::from_secs(60), Duration::from_secs(120)]
        );
    }

    #[tokio::test]
    async fn reply_without_content_is_not_retried() {
        let client = Arc::new(ScriptedClient::echo());
        client.push(Ok(filtered_response("gpt-3.5-turbo")));
        let backoff = Arc::new(RecordingBackoff::new(NoDelay::default()));
        let exec = CallExecutor::new(client.clone(), backoff.clone(), default_fallbacks());

        let (_, outcome) = exec.call(req("gpt-3.5-turbo", "row")).await;
        assert_eq!(
            outcome,
            CallOutcome::Completed(filtered_response("gpt-3.5-turbo"))
        );
        assert_eq!(client.call_count(), 1);
        assert!(backoff.requested().is_empty());
    }

    #[tokio::test]
    async fn too_large_escalates_without_backoff() {
        let client = Arc::new(ScriptedClient::echo());
        client.push(Err(too_large()));
        let backoff = Arc::new(RecordingBackoff::new(NoDelay::default()));
        let exec = CallExecutor::new(client.clone(), backoff.clone(), default_fallbacks());

        let (sent, outcome) = exec.call(req("gpt-3.5-turbo", "long row")).await;
        assert!(matches!(outcome, CallOutcome::Completed(_)));
        assert_eq!(sent.model, "gpt-3.5-turbo-16k");
        let models: Vec<_> = client.calls().into_iter().map(|r| r.model).collect();
        assert_eq!(models, vec!["gpt-3.5-turbo", "gpt-3.5-turbo-16k"]);
        assert!(backoff.requested().is_empty());
    }

    #[tokio::test]
    async fn too_large_on_largest_model_is_skipped() {
        let client = Arc::new(ScriptedClient::with_rule(|_| Err(too_large())));
        let exec = CallExecutor::new(client.clone(), Arc::new(NoDelay::default()), default_fallbacks());

        let (sent, outcome) = exec.call(req("gpt-3.5-turbo", "huge row")).await;
        assert_eq!(
            outcome,
            CallOutcome::Skipped {
                code: "context_length_exceeded".into()
            }
        );
        assert_eq!(sent.model, "gpt-3.5-turbo-16k");
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn fallback_cycle_terminates() {
        let mut fallbacks = ModelFallbacks::new();
        fallbacks.insert("a".into(), "b".into());
        fallbacks.insert("b".into(), "a".into());
        let client = Arc::new(ScriptedClient::with_rule(|_| Err(too_large())));
        let exec = CallExecutor::new(client.clone(), Arc::new(NoDelay::default()), fallbacks);

        let (_, outcome) = exec.call(req("a", "row")).await;
        assert!(matches!(outcome, CallOutcome::Skipped { .. }));
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn capped_backoff_gives_up() {
        let client = Arc::new(ScriptedClient::with_rule(|_| {
            Err(anyhow::anyhow!("service unavailable").into())
        }));
        let exec = CallExecutor::new(
            client.clone(),
            Arc::new(NoDelay {
                max_attempts: Some(2),
            }),
            default_fallbacks(),
        );

        let (_, outcome) = exec.call(req("gpt-3.5-turbo", "row")).await;
        match outcome {
            CallOutcome::GaveUp {
                attempts,
                last_error,
            } => {
                assert_eq!(attempts, 2);
                assert!(last_error.contains("service unavailable"));
            }
            other => panic!("unexpected {other:?}"),
        }
        assert_eq!(client.call_count(), 2);
    }

    #[tokio::test]
    async fn stream_is_lazy_and_ordered() {
        let client = Arc::new(ScriptedClient::echo());
        let exec = CallExecutor::new(client.clone(), Arc::new(NoDelay::default()), default_fallbacks());

        let mut stream = exec.stream(vec![
            (4, req("gpt-3.5-turbo", "four")),
            (7, req("gpt-3.5-turbo", "seven")),
        ]);
        assert_eq!(stream.total(), 2);
        assert_eq!(client.call_count(), 0);

        let first = stream.next().await.unwrap();
        assert_eq!(first.index, 4);
        assert_eq!(client.call_count(), 1);
        assert_eq!(stream.remaining(), 1);

        let second = stream.next().await.unwrap();
        assert_eq!(second.index, 7);
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn abandoned_call_still_counts_as_remaining() {
        let client = Arc::new(ScriptedClient::echo());
        client.push(Err(anyhow::anyhow!("connection reset").into()));
        let backoff = crate::engine::backoff::LinearBackoff::default();
        let exec = CallExecutor::new(client.clone(), Arc::new(backoff), default_fallbacks());

        let mut stream = exec.stream(vec![
            (0, req("gpt-3.5-turbo", "zero")),
            (1, req("gpt-3.5-turbo", "one")),
        ]);
        // the first call is now sleeping out its backoff
        let cut = tokio::time::timeout(Duration::from_millis(20), stream.next()).await;
        assert!(cut.is_err());
        assert_eq!(client.call_count(), 1);
        assert_eq!(stream.remaining(), 2);
    }
}
