use bookloops_review::Critique;
use bookloops_writer::{Attempt, History};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::time::{Duration, Instant};

/// Where the controller is within a run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoopState {
    Idle,
    Generating,
    Reviewing,
    Parsing,
    Gating,
    Refining,
    Approved,
    BudgetExhausted,
}

impl LoopState {
    pub fn is_terminal(&self) -> bool {
        matches!(self, LoopState::Approved | LoopState::BudgetExhausted)
    }
}

impl std::fmt::Display for LoopState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            LoopState::Idle => "idle",
            LoopState::Generating => "generating",
            LoopState::Reviewing => "reviewing",
            LoopState::Parsing => "parsing",
            LoopState::Gating => "gating",
            LoopState::Refining => "refining",
            LoopState::Approved => "approved",
            LoopState::BudgetExhausted => "budget_exhausted",
        };
        f.write_str(name)
    }
}

/// What happened in one epoch, kept in memory alongside the audit file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochRecord {
    pub epoch: usize,
    pub score: i64,
    pub categories: BTreeMap<String, i64>,
    pub feedback: String,
    /// Backend or parse failure that forced a zero score
    pub error: Option<String>,
    pub approved: bool,
    pub timestamp: DateTime<Utc>,
}

impl EpochRecord {
    pub fn from_critique(epoch: usize, critique: &Critique, error: Option<String>) -> Self {
        Self {
            epoch,
            score: critique.overall_score,
            categories: critique.category_scores.clone(),
            feedback: critique.feedback_text(),
            error,
            approved: false,
            timestamp: Utc::now(),
        }
    }

    /// Epoch that produced no candidate at all
    pub fn failed(epoch: usize, error: String) -> Self {
        Self {
            epoch,
            score: 0,
            categories: BTreeMap::new(),
            feedback: String::new(),
            error: Some(error),
            approved: false,
            timestamp: Utc::now(),
        }
    }
}

/// Run state, owned by the controller for the length of one run
#[derive(Debug, Clone)]
pub struct LoopContext {
    /// Theme the run was started with; never changes
    pub theme: String,
    /// Current epoch (0-indexed)
    pub epoch: usize,
    /// Best and most recent attempts
    pub history: History,
    /// One record per finished epoch
    pub records: Vec<EpochRecord>,
    pub max_iterations: usize,
    pub state: LoopState,
    pub approved: bool,
    started_at: Instant,
}

impl LoopContext {
    pub fn new(theme: String, max_iterations: usize) -> Self {
        Self {
            theme,
            epoch: 0,
            history: History::new(),
            records: Vec::new(),
            max_iterations,
            state: LoopState::Idle,
            approved: false,
            started_at: Instant::now(),
        }
    }

    pub fn transition(&mut self, state: LoopState) {
        tracing::trace!(from = %self.state, to = %state, epoch = self.epoch, "State transition");
        self.state = state;
    }

    pub fn increment_epoch(&mut self) {
        self.epoch += 1;
    }

    pub fn should_continue(&self) -> bool {
        self.epoch < self.max_iterations
    }

    /// Fold a reviewed attempt into history. Returns whether it is the new best.
    pub fn record_attempt(&mut self, attempt: Attempt) -> bool {
        self.history.record(attempt)
    }

    pub fn push_record(&mut self, record: EpochRecord) {
        self.records.push(record);
    }

    pub fn total_duration(&self) -> Duration {
        self.started_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bookloops_writer::Candidate;

    #[test]
    fn test_budget_counts_epochs() {
        let mut context = LoopContext::new("theme".into(), 2);
        assert!(context.should_continue());
        context.increment_epoch();
        assert!(context.should_continue());
        context.increment_epoch();
        assert!(!context.should_continue());
    }

    #[test]
    fn test_record_attempt_updates_history() {
        let mut context = LoopContext::new("theme".into(), 3);
        assert!(context.record_attempt(Attempt::new(0, Candidate::new("a"), Critique::new(40))));
        assert!(!context.record_attempt(Attempt::new(1, Candidate::new("b"), Critique::new(20))));
        assert_eq!(context.history.best().unwrap().candidate.as_str(), "a");
        assert_eq!(context.history.last().unwrap().candidate.as_str(), "b");
    }

    #[test]
    fn test_record_from_sentinel_critique() {
        let critique = Critique::rejected("Could not process review");
        let record = EpochRecord::from_critique(2, &critique, Some("bad json".into()));
        assert_eq!(record.score, 0);
        assert_eq!(record.feedback, "Could not process review");
        assert_eq!(record.error.as_deref(), Some("bad json"));
    }

    #[test]
    fn test_terminal_states() {
        assert!(LoopState::Approved.is_terminal());
        assert!(LoopState::BudgetExhausted.is_terminal());
        assert!(!LoopState::Refining.is_terminal());
    }
}
