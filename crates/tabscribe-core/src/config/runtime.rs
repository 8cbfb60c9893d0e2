use crate::errors::ConfigError;
use crate::providers::llm::openai::{OpenAIConfig, DEFAULT_BASE_URL};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::time::Duration;

/// Process-level knobs, read from the environment and overridden by CLI flags.
#[derive(Clone, Debug)]
pub struct RuntimeConfig {
    pub backoff_step_secs: u64,
    pub max_attempts: Option<u32>,
    pub request_timeout_secs: u64,
    pub log_level: String,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            backoff_step_secs: 60,
            max_attempts: None,
            request_timeout_secs: 600,
            log_level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    pub fn from_env() -> Self {
        let mut cfg = Self::default();
        if let Ok(v) = env::var("TABSCRIBE_BACKOFF_SECS") {
            if let Ok(n) = v.parse() {
                cfg.backoff_step_secs = n;
            }
        }
        if let Ok(v) = env::var("TABSCRIBE_MAX_ATTEMPTS") {
            if let Ok(n) = v.parse::<u32>() {
                cfg.max_attempts = (n > 0).then_some(n);
            }
        }
        if let Ok(v) = env::var("TABSCRIBE_REQUEST_TIMEOUT_SECS") {
            if let Ok(n) = v.parse() {
                cfg.request_timeout_secs = n;
            }
        }
        if let Ok(v) = env::var("TABSCRIBE_LOG") {
            cfg.log_level = v;
        }
        cfg
    }
}

/// `openai_key.yaml`: credentials kept out of the dataset registry.
#[derive(Clone, Default, Deserialize)]
pub struct KeyFile {
    pub api_key: Option<String>,
    pub organization: Option<String>,
    pub base_url: Option<String>,
}

impl std::fmt::Debug for KeyFile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyFile")
            .field("api_key", &self.api_key.as_ref().map(|_| "<redacted>"))
            .field("organization", &self.organization)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl KeyFile {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| ConfigError(format!("failed to read key file {}: {}", path.display(), e)))?;
        serde_yaml::from_str(&raw)
            .map_err(|e| ConfigError(format!("failed to parse key file {}: {}", path.display(), e)))
    }

    /// Key file values win; the environment fills the gaps.
    pub fn with_env_fallback(mut self) -> Self {
        if self.api_key.is_none() {
            self.api_key = env::var("OPENAI_API_KEY").ok();
        }
        if self.organization.is_none() {
            self.organization = env::var("OPENAI_ORG_ID").ok();
        }
        if self.base_url.is_none() {
            self.base_url = env::var("OPENAI_BASE_URL").ok();
        }
        self
    }

    pub fn into_openai_config(self, timeout: Duration) -> Result<OpenAIConfig, ConfigError> {
        let api_key = self.api_key.filter(|k| !k.trim().is_empty()).ok_or_else(|| {
            ConfigError(
                "no API key: set api_key in the key file or OPENAI_API_KEY in the environment"
                    .into(),
            )
        })?;
        Ok(OpenAIConfig {
            api_key,
            organization: self.organization,
            base_url: self.base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            timeout,
        })
    }
}
