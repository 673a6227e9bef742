//! # bookloops-export
//!
//! Turns an approved draft into a file a person can read.
//!
//! The loop hands an [`Exporter`] the raw draft and a filename stem;
//! how the draft is laid out is entirely the exporter's business.

mod document;
mod markdown;
mod text;

pub use document::{BookDocument, Chapter, Section};
pub use markdown::MarkdownExporter;
pub use text::TextExporter;

use std::path::{Path, PathBuf};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ExportError {
    #[error("Failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid export filename: {0:?}")]
    InvalidFilename(String),
}

/// Renders content into a file under an output directory
pub trait Exporter: Send + Sync {
    /// Human-readable name of the exporter
    fn name(&self) -> &str;

    /// Directory files are written to
    fn output_dir(&self) -> &Path;

    /// Export `content` as `<output_dir>/<filename>.<ext>`, returning the path
    fn export(&self, content: &str, filename: &str) -> Result<PathBuf, ExportError>;
}

/// Create the output directory if needed
pub(crate) fn ensure_dir(dir: &Path) -> Result<(), ExportError> {
    std::fs::create_dir_all(dir).map_err(|source| ExportError::Io {
        path: dir.to_path_buf(),
        source,
    })
}

/// Resolve `<dir>/<filename>.<ext>`, refusing stems that would escape `dir`
pub(crate) fn target_path(dir: &Path, filename: &str, ext: &str) -> Result<PathBuf, ExportError> {
    let stem = filename.trim();
    if stem.is_empty() || stem.contains(['/', '\\']) || stem == "." || stem == ".." {
        return Err(ExportError::InvalidFilename(filename.to_string()));
    }
    Ok(dir.join(format!("{}.{}", stem, ext)))
}

pub(crate) fn write_file(path: &Path, content: &str) -> Result<(), ExportError> {
    std::fs::write(path, content).map_err(|source| ExportError::Io {
        path: path.to_path_buf(),
        source,
    })
}
