use bookloops_backend::markup::{extract_block, wrap_block, BlockError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::debug;

const REVIEW_TAG: &str = "review";

/// Rating and comment for one reviewed aspect (e.g. pacing)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AspectFeedback {
    pub rating: i64,
    pub comment: String,
}

/// Reviewer feedback, either per aspect or already flattened to text
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Feedback {
    Aspects(BTreeMap<String, AspectFeedback>),
    Text(String),
}

impl Default for Feedback {
    fn default() -> Self {
        Feedback::Aspects(BTreeMap::new())
    }
}

/// The reviewer's structured verdict on one candidate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Critique {
    /// The only value the quality gate thresholds on
    pub overall_score: i64,
    /// Per-category scores, informational only
    #[serde(rename = "categories", default)]
    pub category_scores: BTreeMap<String, i64>,
    #[serde(default)]
    pub feedback: Feedback,
}

#[derive(Error, Debug)]
pub enum CritiqueParseError {
    #[error("No review block or score marker found in reviewer output")]
    NoReviewFound,

    #[error("Malformed review block: {0}")]
    MalformedBlock(#[from] BlockError),

    #[error("Failed to parse review JSON: {0}")]
    JsonParseError(#[from] serde_json::Error),

    #[error("Score is not an integer: {0:?}")]
    InvalidScore(String),
}

/// Reviewer output that could not be decoded into a [`Critique`]
#[derive(Error, Debug)]
#[error("Malformed critique: {cause}")]
pub struct MalformedCritique {
    /// The reviewer output exactly as received
    pub raw: String,
    #[source]
    pub cause: CritiqueParseError,
}

impl Critique {
    pub fn new(overall_score: i64) -> Self {
        Self {
            overall_score,
            category_scores: BTreeMap::new(),
            feedback: Feedback::default(),
        }
    }

    pub fn with_category(mut self, name: impl Into<String>, score: i64) -> Self {
        self.category_scores.insert(name.into(), score);
        self
    }

    /// Add aspect feedback. Replaces flattened text feedback if present.
    pub fn with_aspect(
        mut self,
        name: impl Into<String>,
        rating: i64,
        comment: impl Into<String>,
    ) -> Self {
        let entry = AspectFeedback {
            rating,
            comment: comment.into(),
        };
        match &mut self.feedback {
            Feedback::Aspects(aspects) => {
                aspects.insert(name.into(), entry);
            }
            Feedback::Text(_) => {
                self.feedback = Feedback::Aspects(BTreeMap::from([(name.into(), entry)]));
            }
        }
        self
    }

    /// Zero-score critique standing in for a review that never happened
    /// or could not be read. Always rejected by the gate.
    pub fn rejected(reason: impl Into<String>) -> Self {
        Self {
            overall_score: 0,
            category_scores: BTreeMap::new(),
            feedback: Feedback::Text(reason.into()),
        }
    }

    /// Parse a critique from reviewer output
    ///
    /// Expected format:
    /// ```text
    /// <review>
    /// {"overall_score": 87,
    ///  "categories": {"plot": 9, "style": 8},
    ///  "feedback": {"pacing": {"rating": 7, "comment": "uneven"}}}
    /// </review>
    /// ```
    /// Falls back to the plain `Score: <n>` / `Feedback: <text>` format.
    /// Scores must be integers; `87.5` or `"87"` are errors, never truncated.
    pub fn parse(raw: &str) -> Result<Self, MalformedCritique> {
        debug!(output_len = raw.len(), "Parsing critique");

        Self::parse_inner(raw).map_err(|cause| MalformedCritique {
            raw: raw.to_string(),
            cause,
        })
    }

    fn parse_inner(raw: &str) -> Result<Self, CritiqueParseError> {
        if let Some(body) = extract_block(raw, REVIEW_TAG)? {
            debug!(json = body, "Found review block");
            return Ok(serde_json::from_str(body)?);
        }

        Self::parse_plain_markers(raw)
    }

    fn parse_plain_markers(raw: &str) -> Result<Self, CritiqueParseError> {
        let score_start = raw
            .find("Score:")
            .map(|pos| pos + "Score:".len())
            .ok_or(CritiqueParseError::NoReviewFound)?;
        let rest = &raw[score_start..];

        let (score_text, feedback) = match rest.find("Feedback:") {
            Some(pos) => (&rest[..pos], rest[pos + "Feedback:".len()..].trim()),
            None => (rest.lines().next().unwrap_or_default(), ""),
        };

        let score_text = score_text.trim();
        let overall_score = score_text
            .parse::<i64>()
            .map_err(|_| CritiqueParseError::InvalidScore(score_text.to_string()))?;

        debug!(overall_score, "Parsed critique via plain markers");
        Ok(Self {
            overall_score,
            category_scores: BTreeMap::new(),
            feedback: Feedback::Text(feedback.to_string()),
        })
    }

    /// Serialize to the `<review>` block format accepted by [`Critique::parse`]
    pub fn to_markup(&self) -> String {
        let json = serde_json::to_string_pretty(self).unwrap_or_default();
        wrap_block(REVIEW_TAG, &json)
    }

    /// Feedback flattened to one line of text, as scanned by the gate
    pub fn feedback_text(&self) -> String {
        match &self.feedback {
            Feedback::Text(text) => text.clone(),
            Feedback::Aspects(aspects) => aspects
                .iter()
                .map(|(name, entry)| format!("{} ({}): {}", name, entry.rating, entry.comment))
                .collect::<Vec<_>>()
                .join("; "),
        }
    }

    /// Get a short description of the critique for logging
    pub fn short_description(&self) -> String {
        if self.category_scores.is_empty() {
            format!("SCORE {}", self.overall_score)
        } else {
            let categories = self
                .category_scores
                .iter()
                .map(|(name, score)| format!("{} {}", name, score))
                .collect::<Vec<_>>()
                .join(", ");
            format!("SCORE {} ({})", self.overall_score, categories)
        }
    }
}
