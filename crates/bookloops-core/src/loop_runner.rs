use chrono::Utc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

use bookloops_backend::{Backend, GenerationOptions};
use bookloops_export::Exporter;
use bookloops_logging::{AuditLog, LogEvent, Logger};
use bookloops_review::{Critique, GateVerdict, QualityGate, ReviewAgent, ReviewConfig};
use bookloops_writer::{Attempt, Candidate, WriterAgent, WriterConfig};

use crate::context::{EpochRecord, LoopState};
use crate::error::LoopError;
use crate::outcome::LoopOutcome;
use crate::LoopContext;

/// Drives the generate, review, parse and gate cycle for one theme
pub struct LoopRunner<'a> {
    writer: &'a dyn Backend,
    reviewer: &'a dyn Backend,
    writer_config: WriterConfig,
    writer_options: GenerationOptions,
    review_config: ReviewConfig,
    review_options: GenerationOptions,
    gate: QualityGate,
    exporter: &'a dyn Exporter,
    drafts: Option<&'a dyn Exporter>,
    audit: Option<AuditLog>,
    logger: Arc<Logger>,
    interrupted: Arc<AtomicBool>,
}

/// How a single epoch ended
enum EpochResult {
    Approved(Attempt),
    Rejected,
}

impl<'a> LoopRunner<'a> {
    pub fn new(
        writer: &'a dyn Backend,
        reviewer: &'a dyn Backend,
        gate: QualityGate,
        exporter: &'a dyn Exporter,
        logger: Arc<Logger>,
    ) -> Self {
        Self {
            writer,
            reviewer,
            writer_config: WriterConfig::default(),
            writer_options: GenerationOptions::default(),
            review_config: ReviewConfig::default(),
            review_options: GenerationOptions::default(),
            gate,
            exporter,
            drafts: None,
            audit: None,
            logger,
            interrupted: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn with_writer_config(mut self, config: WriterConfig, options: GenerationOptions) -> Self {
        self.writer_config = config;
        self.writer_options = options;
        self
    }

    pub fn with_review_config(mut self, config: ReviewConfig, options: GenerationOptions) -> Self {
        self.review_config = config;
        self.review_options = options;
        self
    }

    /// Save every candidate as it is generated, approved or not
    pub fn with_draft_exporter(mut self, drafts: &'a dyn Exporter) -> Self {
        self.drafts = Some(drafts);
        self
    }

    pub fn with_audit_log(mut self, audit: AuditLog) -> Self {
        self.audit = Some(audit);
        self
    }

    pub fn gate(&self) -> &QualityGate {
        &self.gate
    }

    /// Adjust threshold or denylist between runs
    pub fn gate_mut(&mut self) -> &mut QualityGate {
        &mut self.gate
    }

    /// Get a handle to signal interruption
    pub fn interrupt_handle(&self) -> Arc<AtomicBool> {
        self.interrupted.clone()
    }

    /// Run until a candidate is approved, the budget runs out, or the run
    /// is interrupted. Backend and parse failures inside an epoch count as
    /// rejections and never end the run early.
    pub async fn run(&self, theme: &str, max_iterations: usize) -> Result<LoopOutcome, LoopError> {
        if max_iterations == 0 {
            return Err(LoopError::ConfigError(
                "max_iterations must be at least 1".into(),
            ));
        }
        if theme.trim().is_empty() {
            return Err(LoopError::ConfigError("theme must not be empty".into()));
        }

        let mut context = LoopContext::new(theme.to_string(), max_iterations);

        self.logger.log(&LogEvent::LoopStarted {
            theme: theme.to_string(),
            backend: self.writer.name().to_string(),
            max_iterations,
            threshold: self.gate.threshold(),
        });

        info!(theme, max_iterations, "Starting book loop");

        let writer = WriterAgent::new(self.writer)
            .with_config(self.writer_config.clone())
            .with_options(self.writer_options.clone());
        let reviewer = ReviewAgent::new(self.reviewer)
            .with_config(self.review_config.clone())
            .with_options(self.review_options.clone());

        loop {
            if self.interrupted.load(Ordering::SeqCst) {
                warn!(epoch = context.epoch, "Loop interrupted");
                self.logger.log(&LogEvent::RunInterrupted {
                    epochs: context.epoch,
                });
                let duration = context.total_duration();
                return Ok(LoopOutcome::interrupted(
                    context.epoch,
                    context.history,
                    context.records,
                    duration,
                ));
            }

            if !context.should_continue() {
                context.transition(LoopState::BudgetExhausted);
                warn!(max_iterations, "Iteration budget exhausted");
                self.logger.log(&LogEvent::BudgetExhausted {
                    epochs: context.epoch,
                    best_score: context.history.best_score(),
                });
                let duration = context.total_duration();
                return Ok(LoopOutcome::budget_exhausted(
                    context.epoch,
                    context.history,
                    context.records,
                    duration,
                ));
            }

            match self.run_epoch(&mut context, &writer, &reviewer).await {
                EpochResult::Approved(attempt) => {
                    return Ok(self.finish_approved(context, attempt));
                }
                EpochResult::Rejected => {
                    context.transition(LoopState::Refining);
                    context.increment_epoch();
                }
            }
        }
    }

    async fn run_epoch(
        &self,
        context: &mut LoopContext,
        writer: &WriterAgent<'_>,
        reviewer: &ReviewAgent<'_>,
    ) -> EpochResult {
        let epoch = context.epoch;

        context.transition(LoopState::Generating);
        self.logger.log(&LogEvent::GenerationStarted {
            epoch,
            refining: !context.history.is_empty(),
        });

        let start = Instant::now();
        let candidate = match writer.generate(&context.theme, &context.history, epoch).await {
            Ok(candidate) => candidate,
            Err(failure) => {
                let message = failure.to_string();
                warn!(epoch, error = %message, "Generation failed");
                self.log_error(epoch, &message);
                self.audit_error(epoch, &message);
                context.push_record(EpochRecord::failed(epoch, message));
                return EpochResult::Rejected;
            }
        };
        self.logger.log(&LogEvent::GenerationCompleted {
            epoch,
            chars: candidate.len(),
            duration_secs: start.elapsed().as_secs_f64(),
        });

        self.save_draft(epoch, &candidate);

        let (critique, error) = self.review_candidate(context, reviewer, &candidate).await;

        context.transition(LoopState::Gating);
        let feedback = critique.feedback_text();
        let verdict = self.gate.check(critique.overall_score, &feedback);
        let (approved, reason) = match &verdict {
            Ok(GateVerdict::Approved) => (true, "approved".to_string()),
            Ok(GateVerdict::BelowThreshold { score, threshold }) => {
                (false, format!("score {} below threshold {}", score, threshold))
            }
            Ok(GateVerdict::DeniedTerm(term)) => {
                (false, format!("feedback mentions denied term {:?}", term))
            }
            Err(e) => (false, e.to_string()),
        };
        self.logger.log(&LogEvent::GateDecided {
            epoch,
            score: critique.overall_score,
            threshold: self.gate.threshold(),
            approved,
            reason,
        });

        // A score the gate cannot judge is a rejection, kept on the record
        let error = error.or_else(|| verdict.as_ref().err().map(|e| e.to_string()));
        let mut record = EpochRecord::from_critique(epoch, &critique, error);
        record.approved = approved;
        context.push_record(record);

        let attempt = Attempt::new(epoch, candidate, critique);
        if approved {
            context.record_attempt(attempt.clone());
            return EpochResult::Approved(attempt);
        }

        if context.record_attempt(attempt) {
            debug!(epoch, "New best attempt");
        }
        if let Some(best) = context.history.best() {
            self.logger.log(&LogEvent::HistoryUpdated {
                epoch,
                best_epoch: best.epoch,
                best_score: best.score(),
            });
        }

        EpochResult::Rejected
    }

    /// Review and parse. A failed or unreadable review yields the zero-score
    /// sentinel critique plus the error that caused it.
    async fn review_candidate(
        &self,
        context: &mut LoopContext,
        reviewer: &ReviewAgent<'_>,
        candidate: &Candidate,
    ) -> (Critique, Option<String>) {
        let epoch = context.epoch;

        context.transition(LoopState::Reviewing);
        self.logger.log(&LogEvent::ReviewStarted { epoch });

        let start = Instant::now();
        let raw = match reviewer.review(candidate.as_str(), &context.theme, epoch).await {
            Ok(raw) => raw,
            Err(failure) => {
                let message = failure.to_string();
                warn!(epoch, timeout = failure.is_timeout(), error = %message, "Review failed");
                self.log_error(epoch, &message);
                self.audit_error(epoch, &message);
                return (
                    Critique::rejected(format!("Review unavailable: {}", message)),
                    Some(message),
                );
            }
        };

        context.transition(LoopState::Parsing);
        match Critique::parse(&raw) {
            Ok(critique) => {
                debug!(epoch, critique = %critique.short_description(), "Critique parsed");
                self.logger.log(&LogEvent::ReviewCompleted {
                    epoch,
                    score: critique.overall_score,
                    categories: critique.category_scores.clone(),
                    duration_secs: start.elapsed().as_secs_f64(),
                });
                if let Some(audit) = &self.audit {
                    if let Err(e) = audit.record_score(
                        epoch,
                        critique.overall_score,
                        &critique.category_scores,
                        &critique.feedback_text(),
                    ) {
                        warn!(error = %e, "Failed to write audit log");
                    }
                }
                (critique, None)
            }
            Err(malformed) => {
                let message = malformed.cause.to_string();
                warn!(epoch, error = %message, "Could not parse critique");
                self.logger.log(&LogEvent::CritiqueMalformed {
                    epoch,
                    error: message.clone(),
                });
                self.audit_error(
                    epoch,
                    &format!("{}. Raw review: {}", message, malformed.raw),
                );
                (
                    Critique::rejected(format!("Could not process review: {}", message)),
                    Some(message),
                )
            }
        }
    }

    fn finish_approved(&self, mut context: LoopContext, attempt: Attempt) -> LoopOutcome {
        context.transition(LoopState::Approved);
        context.approved = true;

        let filename = format!("book_final_{}", Utc::now().format("%Y%m%d-%H%M%S"));
        let exported_to = match self.exporter.export(attempt.candidate.as_str(), &filename) {
            Ok(path) => {
                info!(path = %path.display(), exporter = self.exporter.name(), "Book exported");
                Some(path)
            }
            Err(e) => {
                warn!(error = %e, "Export failed");
                self.log_error(attempt.epoch, &format!("Export failed: {}", e));
                None
            }
        };

        let epochs = context.epoch + 1;
        let duration = context.total_duration();
        self.logger.log(&LogEvent::RunApproved {
            epochs,
            score: attempt.score(),
            exported_to: exported_to.clone(),
            duration_secs: duration.as_secs_f64(),
        });

        LoopOutcome::approved(
            epochs,
            attempt.score(),
            exported_to,
            context.history,
            context.records,
            duration,
        )
    }

    fn save_draft(&self, epoch: usize, candidate: &Candidate) {
        let Some(drafts) = self.drafts else {
            return;
        };
        let filename = format!(
            "book_{}_epoch{}",
            Utc::now().format("%Y%m%d-%H%M%S"),
            epoch + 1
        );
        match drafts.export(candidate.as_str(), &filename) {
            Ok(path) => self.logger.log(&LogEvent::DraftSaved { epoch, path }),
            Err(e) => warn!(epoch, error = %e, "Failed to save draft"),
        }
    }

    fn log_error(&self, epoch: usize, error: &str) {
        self.logger.log(&LogEvent::ErrorEncountered {
            epoch,
            error: error.to_string(),
        });
    }

    fn audit_error(&self, epoch: usize, message: &str) {
        if let Some(audit) = &self.audit {
            if let Err(e) = audit.record_error(epoch, message) {
                warn!(error = %e, "Failed to write audit log");
            }
        }
    }
}
