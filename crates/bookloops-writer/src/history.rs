use bookloops_review::Critique;
use serde::Serialize;

/// One generated draft. The loop never looks inside it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Candidate(String);

impl Candidate {
    pub fn new(text: impl Into<String>) -> Self {
        Self(text.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<String> for Candidate {
    fn from(text: String) -> Self {
        Self(text)
    }
}

impl AsRef<str> for Candidate {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// A candidate together with the critique it received
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Attempt {
    /// Epoch that produced the candidate (0-indexed)
    pub epoch: usize,
    pub candidate: Candidate,
    pub critique: Critique,
}

impl Attempt {
    pub fn new(epoch: usize, candidate: Candidate, critique: Critique) -> Self {
        Self {
            epoch,
            candidate,
            critique,
        }
    }

    pub fn score(&self) -> i64 {
        self.critique.overall_score
    }
}

/// Which history slot an attempt occupies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Slot {
    Best,
    Last,
}

/// Rolling refinement context: the highest-scoring attempt so far and the
/// most recent one. Both start empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct History {
    best: Option<Attempt>,
    last: Option<Attempt>,
}

impl History {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn best(&self) -> Option<&Attempt> {
        self.best.as_ref()
    }

    pub fn last(&self) -> Option<&Attempt> {
        self.last.as_ref()
    }

    pub fn best_score(&self) -> Option<i64> {
        self.best.as_ref().map(Attempt::score)
    }

    pub fn is_empty(&self) -> bool {
        self.best.is_none() && self.last.is_none()
    }

    /// Fold an attempt into the history. It becomes the best only when its
    /// score strictly exceeds the current best; it always becomes the last.
    /// Returns whether the best changed.
    pub fn record(&mut self, attempt: Attempt) -> bool {
        let improved = self
            .best
            .as_ref()
            .map_or(true, |best| attempt.score() > best.score());

        if improved {
            self.best = Some(attempt.clone());
        }
        self.last = Some(attempt);
        improved
    }

    /// Attempts to show the writer, best first. The last attempt is left
    /// out when it is the best one.
    pub fn entries(&self) -> Vec<(Slot, &Attempt)> {
        let mut entries = Vec::with_capacity(2);
        if let Some(best) = &self.best {
            entries.push((Slot::Best, best));
        }
        if let Some(last) = &self.last {
            if self.best.as_ref().map(|b| b.epoch) != Some(last.epoch) {
                entries.push((Slot::Last, last));
            }
        }
        entries
    }
}
