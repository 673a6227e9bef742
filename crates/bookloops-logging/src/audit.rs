use std::collections::BTreeMap;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Append-only audit trail with one line per epoch, so a run's trajectory
/// can be reconstructed after a crash. Epochs are written 1-indexed.
pub struct AuditLog {
    file: Mutex<File>,
    path: PathBuf,
}

impl AuditLog {
    /// Open (or create) the log in append mode
    pub fn open(path: &Path) -> io::Result<Self> {
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new().create(true).append(true).open(path)?;

        Ok(Self {
            file: Mutex::new(file),
            path: path.to_path_buf(),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Record a reviewed epoch
    pub fn record_score(
        &self,
        epoch: usize,
        score: i64,
        categories: &BTreeMap<String, i64>,
        feedback: &str,
    ) -> io::Result<()> {
        self.write_line(&format!(
            "Epoch: {}, Score: {}, Score Categories: {:?}, Feedback: {}",
            epoch + 1,
            score,
            categories,
            single_line(feedback)
        ))
    }

    /// Record an epoch that failed before a critique was available
    pub fn record_error(&self, epoch: usize, message: &str) -> io::Result<()> {
        self.write_line(&format!(
            "Epoch: {}, Error: {}",
            epoch + 1,
            single_line(message)
        ))
    }

    fn write_line(&self, line: &str) -> io::Result<()> {
        let mut file = self
            .file
            .lock()
            .map_err(|_| io::Error::other("audit log lock poisoned"))?;
        writeln!(file, "{}", line)?;
        file.flush()
    }
}

/// Keep every entry on one line; raw model output is full of newlines.
fn single_line(text: &str) -> String {
    text.replace('\r', "").replace('\n', "\\n")
}
