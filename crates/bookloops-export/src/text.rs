use std::path::{Path, PathBuf};
use tracing::debug;

use crate::{ensure_dir, target_path, write_file, ExportError, Exporter};

/// Writes content verbatim to `.txt` files. Used for per-epoch drafts.
pub struct TextExporter {
    output_dir: PathBuf,
}

impl TextExporter {
    pub fn new(output_dir: impl Into<PathBuf>) -> Result<Self, ExportError> {
        let output_dir = output_dir.into();
        ensure_dir(&output_dir)?;
        Ok(Self { output_dir })
    }
}

impl Exporter for TextExporter {
    fn name(&self) -> &str {
        "text"
    }

    fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    fn export(&self, content: &str, filename: &str) -> Result<PathBuf, ExportError> {
        let path = target_path(&self.output_dir, filename, "txt")?;
        write_file(&path, content)?;
        debug!(path = %path.display(), bytes = content.len(), "Text written");
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_export_is_verbatim() {
        let dir = tempfile::tempdir().unwrap();
        let exporter = TextExporter::new(dir.path().join("drafts")).unwrap();

        let path = exporter.export("<book>raw</book>", "book_epoch1").unwrap();
        assert_eq!(path, dir.path().join("drafts").join("book_epoch1.txt"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "<book>raw</book>");
    }
}
