use async_trait::async_trait;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{Backend, BackendError, BackendType, GenerationOptions};

const WRITER_TAG: &str = "<writer_prompt>";
const REVIEWER_TAG: &str = "<reviewer_prompt>";

const CANNED_BOOK: &str = r#"<book>
{"title": "The Lantern Keeper",
 "chapters": [
  {"title": "The Dark Harbor",
   "summary": "Mira inherits a lighthouse that has not shone in twenty years.",
   "sections": [
    {"title": "Arrival", "text": "Mira stepped off the ferry into a harbor with no light."},
    {"title": "The Key", "text": "Inside the keeper's cottage she found a key that hummed."}]},
  {"title": "The Storm",
   "sections": [
    {"title": "Warning", "text": "The fishermen said the lamp only woke when someone was lost."},
    {"title": "Ignition", "text": "The storm came and the lamp lit itself."}]},
  {"title": "Homecoming",
   "sections": [
    {"title": "Rescue", "text": "A boat followed the beam home through the rocks."},
    {"title": "Keeper", "text": "Mira stayed, and the harbor was never dark again."}]}]}
</book>"#;

const CANNED_REVIEW: &str = r#"<review>
{"overall_score": 90,
 "categories": {"plot": 9, "characters": 8, "style": 9},
 "feedback": {
  "pacing": {"rating": 8, "comment": "Steady build toward the storm."},
  "dialogue": {"rating": 7, "comment": "Sparse but fitting."}}}
</review>"#;

/// Offline backend for trying the loop without credentials.
///
/// Writer prompts get `mock/book.txt`, reviewer prompts get
/// `mock/review.txt`, both relative to the mock directory. Missing files
/// fall back to built-in responses; untagged prompts are echoed.
pub struct MockBackend {
    mock_dir: PathBuf,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            mock_dir: PathBuf::from("mock"),
        }
    }

    pub fn with_mock_dir(path: PathBuf) -> Self {
        Self { mock_dir: path }
    }

    pub fn mock_dir(&self) -> &Path {
        &self.mock_dir
    }

    fn read_or(&self, file: &str, fallback: &str) -> String {
        let path = self.mock_dir.join(file);
        match std::fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) => {
                debug!(path = %path.display(), error = %e, "Mock file unavailable, using built-in response");
                fallback.to_string()
            }
        }
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Backend for MockBackend {
    fn name(&self) -> &str {
        "Mock"
    }

    fn backend_type(&self) -> BackendType {
        BackendType::Mock
    }

    async fn generate_text(
        &self,
        prompt: &str,
        _options: &GenerationOptions,
    ) -> Result<String, BackendError> {
        if prompt.contains(REVIEWER_TAG) {
            return Ok(self.read_or("review.txt", CANNED_REVIEW));
        }
        if prompt.contains(WRITER_TAG) {
            return Ok(self.read_or("book.txt", CANNED_BOOK));
        }
        Ok(format!("Mock response for prompt: {}", prompt))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_routes_by_prompt_tag() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("review.txt"), "file review").unwrap();
        let backend = MockBackend::with_mock_dir(dir.path().to_path_buf());
        let options = GenerationOptions::new();

        let review = backend
            .generate_text("<reviewer_prompt>judge this", &options)
            .await
            .unwrap();
        assert_eq!(review, "file review");

        // book.txt is missing, so the built-in book is returned
        let book = backend
            .generate_text("<writer_prompt>write", &options)
            .await
            .unwrap();
        assert!(book.contains("<book>"));

        let echo = backend.generate_text("hello", &options).await.unwrap();
        assert_eq!(echo, "Mock response for prompt: hello");
    }
}
