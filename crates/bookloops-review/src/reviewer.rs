use bookloops_backend::{Backend, GenerationFailure, GenerationOptions, Stage};
use std::time::Instant;
use tracing::{debug, info};

use crate::ReviewPrompts;

/// Range the reviewer scores on
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ScoreScale {
    Ten,
    #[default]
    Hundred,
}

impl ScoreScale {
    pub fn max(&self) -> i64 {
        match self {
            ScoreScale::Ten => 10,
            ScoreScale::Hundred => 100,
        }
    }
}

impl TryFrom<u32> for ScoreScale {
    type Error = String;

    fn try_from(max: u32) -> Result<Self, Self::Error> {
        match max {
            10 => Ok(ScoreScale::Ten),
            100 => Ok(ScoreScale::Hundred),
            _ => Err(format!("Unsupported score scale: {} (use 10 or 100)", max)),
        }
    }
}

/// What the reviewer is asked to score
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReviewConfig {
    pub scale: ScoreScale,
    pub categories: Vec<String>,
    pub aspects: Vec<String>,
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            scale: ScoreScale::default(),
            categories: ["plot", "characters", "style", "structure", "originality"]
                .map(String::from)
                .to_vec(),
            aspects: ["pacing", "dialogue", "consistency", "theme_adherence"]
                .map(String::from)
                .to_vec(),
        }
    }
}

impl ReviewConfig {
    pub fn with_scale(mut self, scale: ScoreScale) -> Self {
        self.scale = scale;
        self
    }

    pub fn with_categories(mut self, categories: Vec<String>) -> Self {
        self.categories = categories;
        self
    }

    pub fn with_aspects(mut self, aspects: Vec<String>) -> Self {
        self.aspects = aspects;
        self
    }
}

/// Agent that asks a backend to critique a candidate
pub struct ReviewAgent<'a> {
    backend: &'a dyn Backend,
    config: ReviewConfig,
    options: GenerationOptions,
}

impl<'a> ReviewAgent<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            config: ReviewConfig::default(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_config(mut self, config: ReviewConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Review a candidate against the run's original theme and return the
    /// raw reviewer output. Parsing is left to the caller.
    pub async fn review(
        &self,
        candidate: &str,
        theme: &str,
        epoch: usize,
    ) -> Result<String, GenerationFailure> {
        let prompt = ReviewPrompts::build_review_prompt(theme, candidate, &self.config);

        debug!(
            prompt_len = prompt.len(),
            epoch,
            backend = self.backend.name(),
            "Running review"
        );

        let start = Instant::now();
        let output = self
            .backend
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| GenerationFailure::new(epoch, Stage::Review, e))?;

        info!(
            duration_secs = start.elapsed().as_secs_f64(),
            output_len = output.len(),
            "Reviewer completed"
        );

        Ok(output)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use bookloops_backend::{BackendError, BackendType};
    use std::sync::Mutex;

    struct RecordingBackend {
        prompts: Mutex<Vec<String>>,
        fail: bool,
    }

    #[async_trait]
    impl Backend for RecordingBackend {
        fn name(&self) -> &str {
            "recording"
        }

        fn backend_type(&self) -> BackendType {
            BackendType::Mock
        }

        async fn generate_text(
            &self,
            prompt: &str,
            _options: &GenerationOptions,
        ) -> Result<String, BackendError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            if self.fail {
                Err(BackendError::Status {
                    status: 503,
                    body: "overloaded".into(),
                })
            } else {
                Ok("<review>{\"overall_score\": 42}</review>".into())
            }
        }
    }

    #[tokio::test]
    async fn test_review_uses_original_theme() {
        let backend = RecordingBackend {
            prompts: Mutex::new(Vec::new()),
            fail: false,
        };
        let agent = ReviewAgent::new(&backend);

        let raw = agent.review("draft text", "A sci-fi thriller", 2).await.unwrap();
        assert!(raw.contains("42"));

        let prompts = backend.prompts.lock().unwrap();
        assert!(prompts[0].contains("A sci-fi thriller"));
        assert!(prompts[0].contains("draft text"));
    }

    #[tokio::test]
    async fn test_review_failure_carries_epoch() {
        let backend = RecordingBackend {
            prompts: Mutex::new(Vec::new()),
            fail: true,
        };
        let agent = ReviewAgent::new(&backend);

        let failure = agent.review("draft", "theme", 3).await.unwrap_err();
        assert_eq!(failure.epoch, 3);
        assert_eq!(failure.stage, Stage::Review);
        assert!(matches!(failure.cause, BackendError::Status { status: 503, .. }));
    }

    #[test]
    fn test_score_scale_from_u32() {
        assert_eq!(ScoreScale::try_from(10u32), Ok(ScoreScale::Ten));
        assert_eq!(ScoreScale::try_from(100u32), Ok(ScoreScale::Hundred));
        assert!(ScoreScale::try_from(5u32).is_err());
    }
}
