//! Accept/reject decision for reviewed candidates.
//!
//! A candidate passes when its score reaches the threshold and its
//! feedback mentions none of the denied terms (case-insensitive).
//! Threshold and denylist can be changed between epochs.

use thiserror::Error;
use tracing::{error, info};

/// Score the gate cannot judge. Always treated as a rejection.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum InvalidGateInput {
    #[error("Score must be a non-negative integer, got {0}")]
    Negative(i64),

    #[error("Score is not an integer: {0:?}")]
    NotAnInteger(String),
}

/// Why the gate decided the way it did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GateVerdict {
    Approved,
    BelowThreshold { score: i64, threshold: i64 },
    DeniedTerm(String),
}

impl GateVerdict {
    pub fn is_approved(&self) -> bool {
        matches!(self, GateVerdict::Approved)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QualityGate {
    threshold: i64,
    denied_terms: Vec<String>,
}

impl QualityGate {
    pub fn new(threshold: i64) -> Self {
        info!(threshold, "Quality gate initialized");
        Self {
            threshold,
            denied_terms: Vec::new(),
        }
    }

    pub fn with_denied_terms<I, S>(mut self, terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.add_denied_terms(terms);
        self
    }

    pub fn threshold(&self) -> i64 {
        self.threshold
    }

    pub fn denied_terms(&self) -> &[String] {
        &self.denied_terms
    }

    pub fn set_threshold(&mut self, threshold: i64) {
        self.threshold = threshold;
        info!(threshold, "Quality gate threshold updated");
    }

    /// Append terms to the denylist. Blank terms are ignored since they
    /// would match every feedback text.
    pub fn add_denied_terms<I, S>(&mut self, terms: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.denied_terms.extend(
            terms
                .into_iter()
                .map(Into::into)
                .filter(|term: &String| !term.trim().is_empty()),
        );
        info!(terms = ?self.denied_terms, "Quality gate denylist updated");
    }

    pub fn clear_denied_terms(&mut self) {
        self.denied_terms.clear();
        info!("Quality gate denylist cleared");
    }

    /// Decide on a score and its feedback text
    pub fn check(&self, score: i64, feedback: &str) -> Result<GateVerdict, InvalidGateInput> {
        if score < 0 {
            return Err(InvalidGateInput::Negative(score));
        }

        if score < self.threshold {
            return Ok(GateVerdict::BelowThreshold {
                score,
                threshold: self.threshold,
            });
        }

        let feedback = feedback.to_lowercase();
        if let Some(term) = self
            .denied_terms
            .iter()
            .find(|term| feedback.contains(&term.to_lowercase()))
        {
            return Ok(GateVerdict::DeniedTerm(term.clone()));
        }

        Ok(GateVerdict::Approved)
    }

    /// Like [`QualityGate::check`], but never fails: invalid input is
    /// logged and rejected.
    pub fn is_approved(&self, score: i64, feedback: &str) -> bool {
        self.log_verdict(self.check(score, feedback), feedback)
    }

    /// Decide on a score that has not been converted to an integer yet
    pub fn is_approved_raw(&self, score: &str, feedback: &str) -> bool {
        let verdict = score
            .trim()
            .parse::<i64>()
            .map_err(|_| InvalidGateInput::NotAnInteger(score.to_string()))
            .and_then(|score| self.check(score, feedback));
        self.log_verdict(verdict, feedback)
    }

    fn log_verdict(&self, verdict: Result<GateVerdict, InvalidGateInput>, feedback: &str) -> bool {
        match verdict {
            Ok(GateVerdict::Approved) => {
                info!(threshold = self.threshold, "Candidate approved");
                true
            }
            Ok(GateVerdict::BelowThreshold { score, threshold }) => {
                info!(score, threshold, feedback, "Candidate below threshold");
                false
            }
            Ok(GateVerdict::DeniedTerm(term)) => {
                info!(term = %term, "Candidate rejected due to denied term in feedback");
                false
            }
            Err(e) => {
                error!(error = %e, "Invalid gate input");
                false
            }
        }
    }
}
