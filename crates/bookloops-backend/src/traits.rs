use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur during a backend call
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Backend returned status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to decode backend response: {0}")]
    Decode(String),

    #[error("Backend call timed out after {0:?}")]
    Timeout(Duration),

    #[error("Backend returned an empty response")]
    EmptyResponse,

    #[error("Backend configuration error: {0}")]
    ConfigError(String),
}

/// Which agent a backend call was made for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Generation,
    Review,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Generation => write!(f, "generation"),
            Stage::Review => write!(f, "review"),
        }
    }
}

/// A backend error attributed to the epoch and stage that triggered it.
///
/// Agents never retry; the controller decides what a failure means.
#[derive(Error, Debug)]
#[error("{stage} failed in epoch {}: {cause}", .epoch + 1)]
pub struct GenerationFailure {
    pub epoch: usize,
    pub stage: Stage,
    #[source]
    pub cause: BackendError,
}

impl GenerationFailure {
    pub fn new(epoch: usize, stage: Stage, cause: BackendError) -> Self {
        Self {
            epoch,
            stage,
            cause,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self.cause, BackendError::Timeout(_))
    }
}

/// Per-call options. Backends ignore what they do not understand and fall
/// back to their own defaults for anything unset.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GenerationOptions {
    /// Model to use (if the backend supports choosing one)
    pub model: Option<String>,
    /// Upper bound on generated tokens
    pub max_tokens: Option<u32>,
    /// Sampling temperature
    pub temperature: Option<f32>,
    /// Optional timeout (None = no limit)
    pub timeout: Option<Duration>,
}

impl GenerationOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }
}

/// Supported backend types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackendType {
    OpenAi,
    DeepSeek,
    Google,
    Mock,
}

impl BackendType {
    /// Environment variable holding this backend's API key
    pub fn api_key_env(&self) -> Option<&'static str> {
        match self {
            BackendType::OpenAi => Some("OPENAI_API_KEY"),
            BackendType::DeepSeek => Some("DEEPSEEK_API_KEY"),
            BackendType::Google => Some("GOOGLE_API_KEY"),
            BackendType::Mock => None,
        }
    }
}

impl std::fmt::Display for BackendType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BackendType::OpenAi => write!(f, "openai"),
            BackendType::DeepSeek => write!(f, "deepseek"),
            BackendType::Google => write!(f, "google"),
            BackendType::Mock => write!(f, "mock"),
        }
    }
}

impl std::str::FromStr for BackendType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "openai" | "open-ai" => Ok(BackendType::OpenAi),
            "deepseek" | "deep-seek" => Ok(BackendType::DeepSeek),
            "google" | "gemini" => Ok(BackendType::Google),
            "mock" => Ok(BackendType::Mock),
            _ => Err(format!("Unknown backend type: {}", s)),
        }
    }
}

/// The core abstraction for text-generation backends
#[async_trait]
pub trait Backend: Send + Sync {
    /// Human-readable name of the backend (e.g., "OpenAI", "Mock")
    fn name(&self) -> &str;

    /// The backend type
    fn backend_type(&self) -> BackendType;

    /// Generate text for a prompt. Implementations make exactly one request.
    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError>;

    /// Generate text within `options.timeout`, rejecting blank responses.
    async fn generate(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        let call = self.generate_text(prompt, options);
        let text = match options.timeout {
            Some(limit) => tokio::time::timeout(limit, call)
                .await
                .map_err(|_| BackendError::Timeout(limit))??,
            None => call.await?,
        };

        if text.trim().is_empty() {
            return Err(BackendError::EmptyResponse);
        }
        Ok(text)
    }
}
