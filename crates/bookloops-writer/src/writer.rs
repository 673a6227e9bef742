use bookloops_backend::{Backend, GenerationFailure, GenerationOptions, Stage};
use std::time::Instant;
use tracing::{debug, info};

use crate::{Candidate, History, WriterPrompts};

/// Structural bar a first draft must clear
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WriterConfig {
    pub min_chapters: usize,
    pub min_sections_per_chapter: usize,
    pub min_words_per_section: usize,
}

impl Default for WriterConfig {
    fn default() -> Self {
        Self {
            min_chapters: 3,
            min_sections_per_chapter: 2,
            min_words_per_section: 300,
        }
    }
}

/// Agent that asks a backend for a new draft
pub struct WriterAgent<'a> {
    backend: &'a dyn Backend,
    config: WriterConfig,
    options: GenerationOptions,
}

impl<'a> WriterAgent<'a> {
    pub fn new(backend: &'a dyn Backend) -> Self {
        Self {
            backend,
            config: WriterConfig::default(),
            options: GenerationOptions::default(),
        }
    }

    pub fn with_config(mut self, config: WriterConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    /// Generate a candidate. With an empty history this is a first draft;
    /// otherwise the best and last attempts are sent as refinement context.
    pub async fn generate(
        &self,
        theme: &str,
        history: &History,
        epoch: usize,
    ) -> Result<Candidate, GenerationFailure> {
        let prompt = WriterPrompts::build_prompt(theme, history, &self.config);

        debug!(
            prompt_len = prompt.len(),
            epoch,
            refining = !history.is_empty(),
            backend = self.backend.name(),
            "Running writer"
        );

        let start = Instant::now();
        let text = self
            .backend
            .generate(&prompt, &self.options)
            .await
            .map_err(|e| GenerationFailure::new(epoch, Stage::Generation, e))?;

        info!(
            duration_secs = start.elapsed().as_secs_f64(),
            output_len = text.len(),
            "Writer completed"
        );

        Ok(Candidate::from(text))
    }
}
