use async_trait::async_trait;
use std::collections::{HashSet, VecDeque};
use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use bookloops_backend::{Backend, BackendError, BackendType, GenerationOptions};
use bookloops_core::{LoopError, LoopOutcome, LoopRunner};
use bookloops_export::{ExportError, Exporter};
use bookloops_logging::{AuditLog, LogFormat, Logger};
use bookloops_review::{Critique, QualityGate, ReviewConfig};
use bookloops_writer::WriterConfig;

enum Review {
    Score(i64),
    Raw(&'static str),
    Fail,
    Slow(Duration, i64),
}

/// Writes "draft N" on the Nth generation and answers reviews from a script
struct ScriptedBackend {
    reviews: Mutex<VecDeque<Review>>,
    failing_generations: HashSet<usize>,
    writer_prompts: Mutex<Vec<String>>,
    review_calls: Mutex<usize>,
}

impl ScriptedBackend {
    fn new(reviews: Vec<Review>) -> Self {
        Self {
            reviews: Mutex::new(reviews.into()),
            failing_generations: HashSet::new(),
            writer_prompts: Mutex::new(Vec::new()),
            review_calls: Mutex::new(0),
        }
    }

    fn scores(scores: &[i64]) -> Self {
        Self::new(scores.iter().map(|s| Review::Score(*s)).collect())
    }

    fn failing_generation(mut self, call: usize) -> Self {
        self.failing_generations.insert(call);
        self
    }

    fn writer_calls(&self) -> usize {
        self.writer_prompts.lock().unwrap().len()
    }

    fn review_calls(&self) -> usize {
        *self.review_calls.lock().unwrap()
    }
}

fn review_markup(score: i64) -> String {
    Critique::new(score)
        .with_category("plot", score / 10)
        .with_aspect("pacing", 5, "steady")
        .to_markup()
}

#[async_trait]
impl Backend for ScriptedBackend {
    fn name(&self) -> &str {
        "scripted"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        if prompt.contains("<reviewer_prompt>") {
            *self.review_calls.lock().unwrap() += 1;
            let next = self.reviews.lock().unwrap().pop_front();
            return match next {
                Some(Review::Score(score)) => Ok(review_markup(score)),
                Some(Review::Raw(text)) => Ok(text.to_string()),
                Some(Review::Fail) | None => Err(BackendError::Status {
                    status: 500,
                    body: "reviewer down".into(),
                }),
                Some(Review::Slow(delay, score)) => {
                    tokio::time::sleep(delay).await;
                    Ok(review_markup(score))
                }
            };
        }

        let call = {
            let mut prompts = self.writer_prompts.lock().unwrap();
            prompts.push(prompt.to_string());
            prompts.len()
        };
        if self.failing_generations.contains(&call) {
            return Err(BackendError::Status {
                status: 503,
                body: "writer overloaded".into(),
            });
        }
        Ok(format!("draft {}", call))
    }
}

/// Keeps exports in memory
struct RecordingExporter {
    dir: PathBuf,
    exports: Mutex<Vec<(String, String)>>,
    fail: bool,
}

impl RecordingExporter {
    fn new() -> Self {
        Self {
            dir: PathBuf::from("output"),
            exports: Mutex::new(Vec::new()),
            fail: false,
        }
    }

    fn failing() -> Self {
        Self {
            fail: true,
            ..Self::new()
        }
    }

    fn count(&self) -> usize {
        self.exports.lock().unwrap().len()
    }
}

impl Exporter for RecordingExporter {
    fn name(&self) -> &str {
        "recording"
    }

    fn output_dir(&self) -> &Path {
        &self.dir
    }

    fn export(&self, content: &str, filename: &str) -> Result<PathBuf, ExportError> {
        if self.fail {
            return Err(ExportError::InvalidFilename(filename.to_string()));
        }
        self.exports
            .lock()
            .unwrap()
            .push((filename.to_string(), content.to_string()));
        Ok(self.dir.join(format!("{}.txt", filename)))
    }
}

fn logger() -> Arc<Logger> {
    Arc::new(Logger::new(LogFormat::Compact))
}

fn runner<'a>(
    backend: &'a ScriptedBackend,
    threshold: i64,
    exporter: &'a RecordingExporter,
) -> LoopRunner<'a> {
    LoopRunner::new(backend, backend, QualityGate::new(threshold), exporter, logger())
}

#[tokio::test]
async fn test_history_keeps_best_and_last() {
    let backend = ScriptedBackend::scores(&[40, 75, 60, 90, 85]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 95, &exporter)
        .run("A mystery in a haunted house", 5)
        .await
        .unwrap();

    assert!(matches!(outcome, LoopOutcome::BudgetExhausted { best_score: Some(90), .. }));
    let history = outcome.history();
    let best = history.best().unwrap();
    let last = history.last().unwrap();
    assert_eq!(best.candidate.as_str(), "draft 4");
    assert_eq!(best.score(), 90);
    assert_eq!(last.candidate.as_str(), "draft 5");
    assert_eq!(last.score(), 85);
}

#[tokio::test]
async fn test_budget_exhausted_without_export() {
    let backend = ScriptedBackend::scores(&[10, 20, 30]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 70, &exporter)
        .run("A sci-fi thriller on a space station", 3)
        .await
        .unwrap();

    assert!(!outcome.is_approved());
    assert_eq!(outcome.epochs(), 3);
    assert_eq!(outcome.exit_code(), 0);
    assert_eq!(outcome.records().len(), 3);
    assert_eq!(backend.writer_calls(), 3);
    assert_eq!(exporter.count(), 0);
}

#[tokio::test]
async fn test_approval_stops_early_and_exports_once() {
    let backend = ScriptedBackend::scores(&[50, 80, 95]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 70, &exporter)
        .run("A fantasy adventure in a magical kingdom", 5)
        .await
        .unwrap();

    match &outcome {
        LoopOutcome::Approved {
            epochs,
            score,
            exported_to,
            ..
        } => {
            assert_eq!(*epochs, 2);
            assert_eq!(*score, 80);
            assert!(exported_to.is_some());
        }
        other => panic!("expected approval, got {:?}", other),
    }

    assert_eq!(backend.writer_calls(), 2);
    assert_eq!(backend.review_calls(), 2);

    let exports = exporter.exports.lock().unwrap();
    assert_eq!(exports.len(), 1);
    assert!(exports[0].0.starts_with("book_final_"));
    assert_eq!(exports[0].1, "draft 2");
}

#[tokio::test]
async fn test_refinement_prompt_carries_history() {
    let backend = ScriptedBackend::scores(&[40, 90]);
    let exporter = RecordingExporter::new();

    runner(&backend, 80, &exporter)
        .run("A romance between a detective and a suspect", 5)
        .await
        .unwrap();

    let prompts = backend.writer_prompts.lock().unwrap();
    assert!(!prompts[0].contains("<history>"));
    assert!(prompts[1].contains("<history>"));
    assert!(prompts[1].contains("draft 1"));
    assert!(prompts[1].contains("A romance between a detective and a suspect"));
}

#[tokio::test]
async fn test_malformed_critique_is_a_rejection() {
    let backend = ScriptedBackend::new(vec![
        Review::Raw(r#"<review>{"overall_score": 87.5}</review>"#),
        Review::Score(90),
    ]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 80, &exporter)
        .run("A mystery in a haunted house", 5)
        .await
        .unwrap();

    assert!(outcome.is_approved());
    assert_eq!(outcome.epochs(), 2);

    let first = &outcome.records()[0];
    assert_eq!(first.score, 0);
    assert!(!first.approved);
    assert!(first.error.is_some());
    assert!(first.feedback.starts_with("Could not process review"));
}

#[tokio::test]
async fn test_negative_score_is_a_rejection() {
    let backend = ScriptedBackend::new(vec![
        Review::Raw(r#"<review>{"overall_score": -5}</review>"#),
        Review::Score(90),
    ]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 80, &exporter)
        .run("A mystery in a haunted house", 3)
        .await
        .unwrap();

    assert!(outcome.is_approved());
    assert_eq!(outcome.epochs(), 2);
    assert_eq!(exporter.count(), 1);

    let first = &outcome.records()[0];
    assert_eq!(first.score, -5);
    assert!(!first.approved);
    assert!(first.error.as_deref().unwrap().contains("non-negative"));
    assert!(outcome.records()[1].approved);
}

#[tokio::test]
async fn test_generation_failure_does_not_abort() {
    let backend = ScriptedBackend::scores(&[90]).failing_generation(1);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 80, &exporter)
        .run("A mystery in a haunted house", 3)
        .await
        .unwrap();

    assert!(outcome.is_approved());
    assert_eq!(outcome.epochs(), 2);
    assert_eq!(backend.review_calls(), 1);

    let first = &outcome.records()[0];
    assert_eq!(first.score, 0);
    assert!(first.error.as_deref().unwrap().contains("writer overloaded"));

    // the failed epoch left no attempt behind
    let best = outcome.history().best().unwrap();
    assert_eq!(best.epoch, 1);
    assert_eq!(best.candidate.as_str(), "draft 2");
}

#[tokio::test]
async fn test_review_failure_keeps_candidate_in_history() {
    let backend = ScriptedBackend::new(vec![Review::Fail]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 80, &exporter)
        .run("A mystery in a haunted house", 1)
        .await
        .unwrap();

    assert!(!outcome.is_approved());
    let last = outcome.history().last().unwrap();
    assert_eq!(last.candidate.as_str(), "draft 1");
    assert_eq!(last.score(), 0);
}

#[tokio::test]
async fn test_review_timeout_is_a_rejection() {
    let backend = ScriptedBackend::new(vec![
        Review::Slow(Duration::from_secs(5), 99),
        Review::Score(90),
    ]);
    let exporter = RecordingExporter::new();

    let outcome = runner(&backend, 80, &exporter)
        .with_review_config(
            ReviewConfig::default(),
            GenerationOptions::new().with_timeout(Duration::from_millis(20)),
        )
        .run("A mystery in a haunted house", 3)
        .await
        .unwrap();

    assert!(outcome.is_approved());
    assert_eq!(outcome.epochs(), 2);
    assert!(outcome.records()[0].error.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn test_denied_term_blocks_high_score() {
    let backend = ScriptedBackend::new(vec![Review::Raw(
        "Score: 95\nFeedback: Reads like plagiarism of a famous novel.",
    )]);
    let exporter = RecordingExporter::new();

    let mut runner = runner(&backend, 70, &exporter);
    runner.gate_mut().add_denied_terms(["plagiarism"]);

    let outcome = runner.run("A mystery in a haunted house", 1).await.unwrap();

    assert!(!outcome.is_approved());
    assert_eq!(exporter.count(), 0);
    assert_eq!(outcome.records()[0].score, 95);
}

#[tokio::test]
async fn test_export_failure_still_approves() {
    let backend = ScriptedBackend::scores(&[90]);
    let exporter = RecordingExporter::failing();

    let outcome = runner(&backend, 80, &exporter)
        .run("A mystery in a haunted house", 3)
        .await
        .unwrap();

    assert!(matches!(
        outcome,
        LoopOutcome::Approved {
            exported_to: None,
            ..
        }
    ));
}

#[tokio::test]
async fn test_audit_log_has_one_line_per_epoch() {
    let dir = tempfile::tempdir().unwrap();
    let audit_path = dir.path().join("scores.log");

    let backend = ScriptedBackend::new(vec![Review::Raw("no score here"), Review::Score(90)])
        .failing_generation(1);
    let exporter = RecordingExporter::new();

    runner(&backend, 80, &exporter)
        .with_audit_log(AuditLog::open(&audit_path).unwrap())
        .run("A mystery in a haunted house", 5)
        .await
        .unwrap();

    let contents = std::fs::read_to_string(&audit_path).unwrap();
    let lines: Vec<&str> = contents.lines().collect();
    assert_eq!(lines.len(), 3);
    assert!(lines[0].starts_with("Epoch: 1, Error:"));
    assert!(lines[1].starts_with("Epoch: 2, Error:"));
    assert!(lines[1].contains("no score here"));
    assert!(lines[2].starts_with("Epoch: 3, Score: 90"));
}

#[tokio::test]
async fn test_drafts_saved_every_epoch() {
    let backend = ScriptedBackend::scores(&[10, 90]);
    let exporter = RecordingExporter::new();
    let drafts = RecordingExporter::new();

    runner(&backend, 80, &exporter)
        .with_draft_exporter(&drafts)
        .with_writer_config(WriterConfig::default(), GenerationOptions::new())
        .run("A mystery in a haunted house", 5)
        .await
        .unwrap();

    let saved = drafts.exports.lock().unwrap();
    assert_eq!(saved.len(), 2);
    assert!(saved[0].0.ends_with("_epoch1"));
    assert!(saved[1].0.ends_with("_epoch2"));
    assert_eq!(exporter.count(), 1);
}

#[tokio::test]
async fn test_interrupt_before_first_epoch() {
    let backend = ScriptedBackend::scores(&[90]);
    let exporter = RecordingExporter::new();

    let runner = runner(&backend, 80, &exporter);
    runner.interrupt_handle().store(true, Ordering::SeqCst);

    let outcome = runner.run("A mystery in a haunted house", 3).await.unwrap();

    assert!(matches!(outcome, LoopOutcome::Interrupted { epochs: 0, .. }));
    assert_eq!(outcome.exit_code(), 130);
    assert_eq!(backend.writer_calls(), 0);
}

#[tokio::test]
async fn test_zero_budget_is_a_config_error() {
    let backend = ScriptedBackend::new(Vec::new());
    let exporter = RecordingExporter::new();

    let result = runner(&backend, 80, &exporter).run("theme", 0).await;
    assert!(matches!(result, Err(LoopError::ConfigError(_))));
}
