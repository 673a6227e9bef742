use bookloops_backend::markup::extract_block;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// A book as laid out by the writer's `<book>` block
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookDocument {
    #[serde(default = "default_title")]
    pub title: String,
    #[serde(default)]
    pub chapters: Vec<Chapter>,
    /// Set when the draft could not be read as a structured book
    #[serde(skip)]
    pub parse_error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chapter {
    #[serde(default = "default_chapter_title")]
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub sections: Vec<Section>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
}

fn default_title() -> String {
    "Untitled".to_string()
}

fn default_chapter_title() -> String {
    "No Title".to_string()
}

impl BookDocument {
    /// Read a draft. Drafts that are not a valid book block still produce
    /// a document: one untitled chapter holding the raw text, with
    /// `parse_error` explaining why.
    pub fn from_markup(raw: &str) -> Self {
        match Self::try_from_markup(raw) {
            Ok(document) => document,
            Err(error) => {
                warn!(error = %error, "Draft is not a structured book, exporting raw text");
                Self {
                    title: default_title(),
                    chapters: vec![Chapter {
                        title: "Manuscript".to_string(),
                        summary: None,
                        notes: None,
                        sections: vec![Section {
                            title: None,
                            text: Some(raw.trim().to_string()),
                        }],
                    }],
                    parse_error: Some(format!("Error: {}", error)),
                }
            }
        }
    }

    /// Strictly parse a `<book>` block (or a bare JSON book)
    pub fn try_from_markup(raw: &str) -> Result<Self, String> {
        let body = extract_block(raw, "book")
            .map_err(|e| e.to_string())?
            .unwrap_or_else(|| raw.trim());
        serde_json::from_str(body).map_err(|e| e.to_string())
    }

    pub fn section_count(&self) -> usize {
        self.chapters.iter().map(|c| c.sections.len()).sum()
    }
}
