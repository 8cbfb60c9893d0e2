use thiserror::Error;

#[derive(Debug, Error)]
#[error("{0}")]
pub struct ConfigError(pub String);

/// Faults observable at the chat-completion boundary.
#[derive(Debug, Error)]
pub enum CallError {
    /// The request does not fit the model's context window.
    #[error("input too large for model ({code}): {message}")]
    InputTooLarge { code: String, message: String },
    /// Anything else: connectivity, rate limits, server errors, malformed payloads.
    #[error(transparent)]
    Transient(#[from] anyhow::Error),
}

impl CallError {
    pub fn is_input_too_large(&self) -> bool {
        matches!(self, CallError::InputTooLarge { .. })
    }
}
