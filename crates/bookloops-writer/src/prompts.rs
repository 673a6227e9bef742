use bookloops_backend::markup::wrap_block;

use crate::{Attempt, History, Slot, WriterConfig};

const BOOK_FORMAT: &str = r#"<book>
{"title": "Book title",
 "chapters": [
  {"title": "Chapter title",
   "summary": "One or two sentences on what happens",
   "sections": [{"title": "Section title", "text": "Full prose of the section"}]}]}
</book>"#;

/// Prompt templates for the writer
pub struct WriterPrompts;

impl WriterPrompts {
    /// Pick the first-draft or the refinement prompt depending on history
    pub fn build_prompt(theme: &str, history: &History, config: &WriterConfig) -> String {
        if history.is_empty() {
            Self::build_initial_prompt(theme, config)
        } else {
            Self::build_refinement_prompt(theme, history, config)
        }
    }

    /// Build the prompt for the first draft of a run
    pub fn build_initial_prompt(theme: &str, config: &WriterConfig) -> String {
        format!(
            r#"<writer_prompt>
You are a novelist. Write a complete book on the theme below.

## Theme
{theme}

## Requirements
- At least {chapters} chapters, each with at least {sections} sections.
- Every section at least {words} words of finished prose, not an outline.
- A clear beginning, middle and end: introduce the world and its people, build to a turning point, resolve it.

{format}
</writer_prompt>"#,
            theme = theme,
            chapters = config.min_chapters,
            sections = config.min_sections_per_chapter,
            words = config.min_words_per_section,
            format = Self::format_section(),
        )
    }

    /// Build the prompt for later epochs, carrying the best and the most
    /// recent attempt with their reviews
    pub fn build_refinement_prompt(theme: &str, history: &History, config: &WriterConfig) -> String {
        format!(
            r#"<writer_prompt>
You are a novelist revising your own book. Earlier drafts and the editor's reviews are below. Write a new complete draft that keeps what the reviews praise and fixes what they criticise.

## Theme
{theme}

## Previous Attempts
{history}

## Requirements
- Address every piece of feedback, starting with the lowest-rated aspects.
- If the best attempt and the latest attempt differ, build on the best one.
- Keep at least {chapters} chapters of at least {sections} sections, each at least {words} words.
- Return the whole book, not a list of changes.

{format}
</writer_prompt>"#,
            theme = theme,
            history = Self::serialize_history(history),
            chapters = config.min_chapters,
            sections = config.min_sections_per_chapter,
            words = config.min_words_per_section,
            format = Self::format_section(),
        )
    }

    /// Serialize history as one element per slot, each closed symmetrically
    pub fn serialize_history(history: &History) -> String {
        let attempts = history
            .entries()
            .into_iter()
            .map(|(slot, attempt)| Self::serialize_attempt(slot, attempt))
            .collect::<Vec<_>>()
            .join("\n");
        wrap_block("history", &attempts)
    }

    fn serialize_attempt(slot: Slot, attempt: &Attempt) -> String {
        let tag = match slot {
            Slot::Best => "best_attempt",
            Slot::Last => "last_attempt",
        };
        format!(
            "<{tag} epoch=\"{epoch}\" score=\"{score}\">\n{draft}\n{review}\n</{tag}>",
            tag = tag,
            epoch = attempt.epoch + 1,
            score = attempt.score(),
            draft = wrap_block("draft", attempt.candidate.as_str()),
            review = attempt.critique.to_markup(),
        )
    }

    fn format_section() -> String {
        format!(
            "## Required Response Format\n\nReturn the book as a single book block containing only JSON:\n\n{}",
            BOOK_FORMAT
        )
    }
}
