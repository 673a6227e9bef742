use std::fmt::Write;
use std::path::{Path, PathBuf};
use tracing::info;

use crate::{ensure_dir, target_path, write_file, BookDocument, ExportError, Exporter};

const DEFAULT_AUTHOR: &str = "AI Book Generator";

/// Renders an approved draft as a Markdown book
pub struct MarkdownExporter {
    output_dir: PathBuf,
    author: String,
}

impl MarkdownExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let output_dir = output_dir.into();
        ensure_dir(&output_dir)?;
        info!(output_dir = %output_dir.display(), "Markdown exporter initialized");
        Ok(Self {
            output_dir,
            author: DEFAULT_AUTHOR.to_string(),
        })
    }

    pub fn with_author(mut self, author: impl Into<String>) -> Self {
        self.author = author.into();
        self
    }

    /// Render a document: cover, then one heading per chapter and section
    pub fn render(&self, document: &BookDocument) -> String {
        let mut out = String::new();
        let _ = writeln!(out, "# {}\n", document.title.trim());
        let _ = writeln!(out, "*{}*\n", self.author);

        if let Some(error) = &document.parse_error {
            let _ = writeln!(out, "> {}\n", error);
        }

        for chapter in &document.chapters {
            let _ = writeln!(out, "## {}\n", chapter.title.trim());
            for section in &chapter.sections {
                if let Some(title) = section.title.as_deref().filter(|t| !t.trim().is_empty()) {
                    let _ = writeln!(out, "### {}\n", title.trim());
                }
                if let Some(text) = section.text.as_deref().filter(|t| !t.trim().is_empty()) {
                    let _ = writeln!(out, "{}\n", text.trim());
                }
            }
        }

        out.truncate(out.trim_end().len());
        out.push('\n');
        out
    }
}

impl Exporter for MarkdownExporter {
    fn name(&self) -> &str {
        "markdown"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, content: &str, filename: &str) -> Result<PathBuf, ExportError> {
        let document = BookDocument::from_markup(content);
        let path = target_path(&self.output_dir, filename, "md")?;
        write_file(&path, &self.render(&document))?;
        info!(
            path = %path.display(),
            chapters = document.chapters.len(),
            sections = document.section_count(),
            "Book exported"
        );
        Ok(path)
    }
}
