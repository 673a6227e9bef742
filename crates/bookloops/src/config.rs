//! Project configuration file support for bookloops.
//!
//! Loads configuration from `bookloops.toml` in the working directory.

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use bookloops_backend::GenerationOptions;
use bookloops_review::{ReviewConfig, ScoreScale};
use bookloops_writer::WriterConfig;

/// Project-level configuration loaded from `bookloops.toml`
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ProjectConfig {
    /// Backend used for both agents
    pub backend: Option<String>,
    /// Global default model (applies to writer and reviewer)
    pub model: Option<String>,
    pub max_iterations: Option<usize>,
    /// Per-call timeout, e.g. "90s" or "2m"
    #[serde(default, with = "humantime_serde")]
    pub timeout: Option<Duration>,
    pub output_dir: Option<PathBuf>,
    pub audit_log: Option<PathBuf>,
    #[serde(default)]
    pub gate: GateSection,
    #[serde(default)]
    pub review: ReviewSection,
    #[serde(default)]
    pub writer: WriterSection,
    #[serde(default)]
    pub reviewer: RoleConfig,
}

#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct GateSection {
    pub threshold: Option<i64>,
    #[serde(default)]
    pub denylist: Vec<String>,
}

/// What the reviewer scores
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct ReviewSection {
    /// 10 or 100
    pub score_scale: Option<u32>,
    pub categories: Option<Vec<String>>,
    pub aspects: Option<Vec<String>>,
}

/// Structural bar for first drafts plus writer model overrides
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct WriterSection {
    pub min_chapters: Option<usize>,
    pub min_sections_per_chapter: Option<usize>,
    pub min_words_per_section: Option<usize>,
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// Model overrides for the reviewer role
#[derive(Debug, Deserialize, Default)]
#[serde(deny_unknown_fields)]
pub struct RoleConfig {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

/// The config file name
pub const CONFIG_FILE_NAME: &str = "bookloops.toml";

/// Approval threshold on the 0-100 scale
pub const DEFAULT_THRESHOLD: i64 = 86;

impl ProjectConfig {
    /// Load configuration from the working directory.
    ///
    /// Returns:
    /// - `Ok(Some(config))` if file exists and parses successfully
    /// - `Ok(None)` if file does not exist
    /// - `Err(...)` if file exists but fails to parse (hard error)
    pub fn load(working_dir: &Path) -> Result<Option<Self>> {
        let config_path = working_dir.join(CONFIG_FILE_NAME);

        if !config_path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&config_path)
            .with_context(|| format!("Failed to read {}", config_path.display()))?;

        let config: ProjectConfig = toml::from_str(&content)
            .with_context(|| format!("Failed to parse {}", config_path.display()))?;

        Ok(Some(config))
    }

    /// Options for writer calls.
    /// Priority: [writer] value > global value > backend default
    pub fn writer_options(&self) -> GenerationOptions {
        build_options(
            self.writer.model.as_deref().or(self.model.as_deref()),
            self.writer.temperature,
            self.writer.max_tokens,
            self.timeout,
        )
    }

    /// Options for reviewer calls.
    /// Priority: [reviewer] value > global value > backend default
    pub fn reviewer_options(&self) -> GenerationOptions {
        build_options(
            self.reviewer.model.as_deref().or(self.model.as_deref()),
            self.reviewer.temperature,
            self.reviewer.max_tokens,
            self.timeout,
        )
    }

    pub fn writer_config(&self) -> WriterConfig {
        let defaults = WriterConfig::default();
        WriterConfig {
            min_chapters: self.writer.min_chapters.unwrap_or(defaults.min_chapters),
            min_sections_per_chapter: self
                .writer
                .min_sections_per_chapter
                .unwrap_or(defaults.min_sections_per_chapter),
            min_words_per_section: self
                .writer
                .min_words_per_section
                .unwrap_or(defaults.min_words_per_section),
        }
    }

    pub fn review_config(&self) -> Result<ReviewConfig> {
        let mut config = ReviewConfig::default();
        if let Some(max) = self.review.score_scale {
            let scale = ScoreScale::try_from(max).map_err(anyhow::Error::msg)?;
            config = config.with_scale(scale);
        }
        if let Some(categories) = &self.review.categories {
            config = config.with_categories(categories.clone());
        }
        if let Some(aspects) = &self.review.aspects {
            config = config.with_aspects(aspects.clone());
        }
        Ok(config)
    }

    /// Threshold for the quality gate on the given score scale.
    /// Priority: CLI flag > [gate] threshold > default scaled to `scale`
    ///
    /// Errors when the threshold lies outside `0..=scale.max()`.
    pub fn threshold(&self, cli: Option<i64>, scale: ScoreScale) -> Result<i64> {
        let max = scale.max();
        let threshold = match cli.or(self.gate.threshold) {
            Some(threshold) => threshold,
            None => DEFAULT_THRESHOLD * max / 100,
        };
        if !(0..=max).contains(&threshold) {
            anyhow::bail!(
                "Threshold {} is outside the review score scale 0-{}",
                threshold,
                max
            );
        }
        Ok(threshold)
    }
}

fn build_options(
    model: Option<&str>,
    temperature: Option<f32>,
    max_tokens: Option<u32>,
    timeout: Option<Duration>,
) -> GenerationOptions {
    let mut options = GenerationOptions::new();
    if let Some(model) = model {
        options = options.with_model(model);
    }
    if let Some(temperature) = temperature {
        options = options.with_temperature(temperature);
    }
    if let Some(max_tokens) = max_tokens {
        options = options.with_max_tokens(max_tokens);
    }
    if let Some(timeout) = timeout {
        options = options.with_timeout(timeout);
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_config(contents: &str) -> tempfile::TempDir {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(CONFIG_FILE_NAME), contents).unwrap();
        dir
    }

    #[test]
    fn test_missing_file_is_none() {
        let dir = tempfile::tempdir().unwrap();
        assert!(ProjectConfig::load(dir.path()).unwrap().is_none());
    }

    #[test]
    fn test_full_config() {
        let dir = write_config(
            r#"
backend = "deepseek"
model = "deepseek-chat"
max_iterations = 8
timeout = "90s"
output_dir = "books"
audit_log = "scores.log"

[gate]
threshold = 8
denylist = ["plagiarism", "incoherent"]

[review]
score_scale = 10
categories = ["plot", "voice"]

[writer]
min_chapters = 5
temperature = 0.9

[reviewer]
model = "deepseek-reasoner"
max_tokens = 1024
"#,
        );

        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.backend.as_deref(), Some("deepseek"));
        assert_eq!(config.max_iterations, Some(8));
        assert_eq!(config.timeout, Some(Duration::from_secs(90)));
        assert_eq!(config.gate.threshold, Some(8));
        assert_eq!(config.gate.denylist, vec!["plagiarism", "incoherent"]);

        let writer = config.writer_config();
        assert_eq!(writer.min_chapters, 5);
        assert_eq!(writer.min_sections_per_chapter, 2);

        let review = config.review_config().unwrap();
        assert_eq!(review.scale, ScoreScale::Ten);
        assert_eq!(review.categories, vec!["plot", "voice"]);
        assert_eq!(review.aspects, ReviewConfig::default().aspects);
        assert_eq!(config.threshold(None, review.scale).unwrap(), 8);
    }

    #[test]
    fn test_role_overrides_take_priority() {
        let dir = write_config(
            r#"
model = "shared-model"
timeout = "2m"

[reviewer]
model = "review-model"
"#,
        );
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();

        let writer = config.writer_options();
        assert_eq!(writer.model.as_deref(), Some("shared-model"));
        assert_eq!(writer.timeout, Some(Duration::from_secs(120)));

        let reviewer = config.reviewer_options();
        assert_eq!(reviewer.model.as_deref(), Some("review-model"));
    }

    #[test]
    fn test_unknown_key_is_an_error() {
        let dir = write_config("backend = \"mock\"\ncolour = \"blue\"\n");
        assert!(ProjectConfig::load(dir.path()).is_err());
    }

    #[test]
    fn test_default_threshold_follows_scale() {
        let config = ProjectConfig::default();
        assert_eq!(config.threshold(None, ScoreScale::Hundred).unwrap(), 86);
        assert_eq!(config.threshold(None, ScoreScale::Ten).unwrap(), 8);
    }

    #[test]
    fn test_threshold_above_scale_is_an_error() {
        let dir = write_config("[gate]\nthreshold = 80\n\n[review]\nscore_scale = 10\n");
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        let scale = config.review_config().unwrap().scale;

        let err = config.threshold(None, scale).unwrap_err();
        assert!(err.to_string().contains("0-10"));
        assert!(config.threshold(Some(86), ScoreScale::Ten).is_err());
        assert!(config.threshold(Some(-1), ScoreScale::Hundred).is_err());
        assert_eq!(config.threshold(Some(9), scale).unwrap(), 9);
    }

    #[test]
    fn test_cli_threshold_overrides_config() {
        let dir = write_config("[gate]\nthreshold = 70\n");
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert_eq!(config.threshold(None, ScoreScale::Hundred).unwrap(), 70);
        assert_eq!(config.threshold(Some(95), ScoreScale::Hundred).unwrap(), 95);
    }

    #[test]
    fn test_bad_score_scale() {
        let dir = write_config("[review]\nscore_scale = 50\n");
        let config = ProjectConfig::load(dir.path()).unwrap().unwrap();
        assert!(config.review_config().is_err());
    }
}
