use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use crate::{Backend, BackendError, BackendType, GenerationOptions};

const DEFAULT_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta";
const DEFAULT_MODEL: &str = "models/gemini-2.0-flash-thinking-exp";

/// Google Gemini `generateContent` backend
pub struct GoogleBackend {
    api_key: String,
    base_url: String,
    client: reqwest::Client,
}

impl GoogleBackend {
    pub fn new(api_key: impl Into<String>) -> Result<Self, BackendError> {
        Self::with_base_url(api_key, DEFAULT_BASE_URL)
    }

    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder().build()?;
        Ok(Self {
            api_key: api_key.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    fn model_path(model: &str) -> String {
        if model.starts_with("models/") {
            model.to_string()
        } else {
            format!("models/{}", model)
        }
    }
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<ContentCandidate>,
}

#[derive(Deserialize)]
struct ContentCandidate {
    content: Option<Content>,
}

#[derive(Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize)]
struct Part {
    text: Option<String>,
}

#[async_trait]
impl Backend for GoogleBackend {
    fn name(&self) -> &str {
        "Google"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Google
    }

    async fn generate_text(
        &self,
        prompt: &str,
        options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        let model = Self::model_path(options.model.as_deref().unwrap_or(DEFAULT_MODEL));
        let url = format!("{}/{}:generateContent", self.base_url, model);

        let mut generation_config = serde_json::Map::new();
        if let Some(max_tokens) = options.max_tokens {
            generation_config.insert("maxOutputTokens".into(), max_tokens.into());
        }
        if let Some(temperature) = options.temperature {
            generation_config.insert("temperature".into(), temperature.into());
        }

        let body = serde_json::json!({
            "contents": [{ "parts": [{ "text": prompt }] }],
            "generationConfig": generation_config,
        });

        debug!(backend = self.name(), model = %model, prompt_len = prompt.len(), "Sending generateContent request");

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| BackendError::Decode(e.to_string()))?;

        let content = parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|candidate| candidate.content)
            .ok_or_else(|| BackendError::Decode("response had no candidates".into()))?;

        Ok(content
            .parts
            .into_iter()
            .filter_map(|part| part.text)
            .collect::<Vec<_>>()
            .join(""))
    }
}
