use colored::Colorize;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

/// Structured log events for the writer/reviewer loop
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LogEvent {
    LoopStarted {
        theme: String,
        backend: String,
        max_iterations: usize,
        threshold: i64,
    },
    GenerationStarted {
        epoch: usize,
        refining: bool,
    },
    GenerationCompleted {
        epoch: usize,
        chars: usize,
        duration_secs: f64,
    },
    DraftSaved {
        epoch: usize,
        path: PathBuf,
    },
    ReviewStarted {
        epoch: usize,
    },
    ReviewCompleted {
        epoch: usize,
        score: i64,
        categories: BTreeMap<String, i64>,
        duration_secs: f64,
    },
    CritiqueMalformed {
        epoch: usize,
        error: String,
    },
    GateDecided {
        epoch: usize,
        score: i64,
        threshold: i64,
        approved: bool,
        reason: String,
    },
    HistoryUpdated {
        epoch: usize,
        best_epoch: usize,
        best_score: i64,
    },
    RunApproved {
        epochs: usize,
        score: i64,
        exported_to: Option<PathBuf>,
        duration_secs: f64,
    },
    BudgetExhausted {
        epochs: usize,
        best_score: Option<i64>,
    },
    RunInterrupted {
        epochs: usize,
    },
    ErrorEncountered {
        epoch: usize,
        error: String,
    },
}

impl LogEvent {
    /// Add a timestamp to serialize with the event
    fn with_timestamp(&self) -> serde_json::Value {
        let mut value = serde_json::to_value(self).unwrap_or_default();
        if let Some(obj) = value.as_object_mut() {
            obj.insert(
                "timestamp".to_string(),
                serde_json::Value::String(chrono::Utc::now().to_rfc3339()),
            );
        }
        value
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable format with colors and visual structure
    #[default]
    Pretty,
    /// JSON lines format for machine consumption
    Json,
    /// Compact single-line format
    Compact,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "pretty" => Ok(LogFormat::Pretty),
            "json" => Ok(LogFormat::Json),
            "compact" => Ok(LogFormat::Compact),
            _ => Err(format!("Unknown log format: {}", s)),
        }
    }
}

/// Logger for bookloops events - handles both console output and file logging
pub struct Logger {
    format: LogFormat,
    file_writer: Option<Mutex<File>>,
}

impl Logger {
    pub fn new(format: LogFormat) -> Self {
        Self {
            format,
            file_writer: None,
        }
    }

    /// Create a logger with file output in addition to console
    pub fn with_file(format: LogFormat, log_path: &Path) -> std::io::Result<Self> {
        if let Some(parent) = log_path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(log_path)?;

        Ok(Self {
            format,
            file_writer: Some(Mutex::new(file)),
        })
    }

    pub fn format(&self) -> LogFormat {
        self.format
    }

    pub fn log(&self, event: &LogEvent) {
        // File output is always JSON
        if let Some(ref writer) = self.file_writer {
            if let Ok(mut file) = writer.lock() {
                let json = event.with_timestamp();
                let _ = writeln!(file, "{}", json);
            }
        }

        match self.format {
            LogFormat::Json => self.log_json(event),
            LogFormat::Pretty => self.log_pretty(event),
            LogFormat::Compact => self.log_compact(event),
        }
    }

    fn log_json(&self, event: &LogEvent) {
        if let Ok(json) = serde_json::to_string(event) {
            let _ = writeln!(std::io::stderr(), "{}", json);
        }
    }

    fn log_pretty(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        match event {
            LogEvent::LoopStarted {
                theme,
                backend,
                max_iterations,
                threshold,
            } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╭─────────────────────────────────────────────────────────────────────╮"
                        .bright_blue()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {}{}",
                    "│".bright_blue(),
                    "bookloops".bold().bright_white(),
                    " ".repeat(58) + &"│".bright_blue().to_string()
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Theme:".dimmed(),
                    Self::truncate_with_padding(theme, 60, 67).dimmed()
                );
                let settings = format!(
                    "{} | {} epochs | threshold {}",
                    backend, max_iterations, threshold
                );
                let _ = writeln!(
                    stderr,
                    "{}  {} {}",
                    "│".bright_blue(),
                    "Run:".dimmed(),
                    Self::truncate_with_padding(&settings, 62, 69).dimmed()
                );
                let _ = writeln!(
                    stderr,
                    "{}",
                    "╰─────────────────────────────────────────────────────────────────────╯"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GenerationStarted { epoch, refining } => {
                let epoch_text = format!("─ Epoch {} ", epoch + 1);
                let padding = "─".repeat(67 - epoch_text.chars().count());
                let _ = writeln!(
                    stderr,
                    "{}{}{}",
                    "┌".bright_blue(),
                    epoch_text.bright_blue().bold(),
                    padding.bright_blue()
                );
                let _ = writeln!(stderr);
                let mode = if *refining { "refining" } else { "first draft" };
                let _ = writeln!(
                    stderr,
                    "  {} {} {}",
                    "▶".bright_cyan(),
                    "WRITER".bright_cyan().bold(),
                    format!("({})", mode).dimmed()
                );
            }
            LogEvent::GenerationCompleted {
                chars,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} {} chars ({:.1}s)",
                    "✓".bright_green(),
                    chars,
                    duration_secs
                );
                let _ = writeln!(stderr);
            }
            LogEvent::DraftSaved { path, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} {}",
                    "Draft:".dimmed(),
                    path.display().to_string().dimmed()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::ReviewStarted { .. } => {
                let _ = writeln!(
                    stderr,
                    "  {} {}",
                    "▶".bright_magenta(),
                    "REVIEWER".bright_magenta().bold()
                );
            }
            LogEvent::ReviewCompleted {
                score,
                categories,
                duration_secs,
                ..
            } => {
                let _ = writeln!(
                    stderr,
                    "    {} Score {} ({:.1}s)",
                    "✓".bright_green(),
                    score.to_string().bold(),
                    duration_secs
                );
                for (name, value) in categories {
                    let _ = writeln!(stderr, "    {} {}: {}", "│".dimmed(), name, value);
                }
                let _ = writeln!(stderr);
            }
            LogEvent::CritiqueMalformed { error, .. } => {
                let _ = writeln!(
                    stderr,
                    "    {} Unreadable review, scoring 0: {}",
                    "✗".bright_red(),
                    error.bright_red()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::GateDecided {
                score,
                threshold,
                approved,
                reason,
                ..
            } => {
                let styled = if *approved {
                    format!("✓ Approved: {} ≥ {}", score, threshold)
                        .bright_green()
                        .to_string()
                } else {
                    format!("→ Rejected: {}", reason).bright_yellow().to_string()
                };
                let _ = writeln!(stderr, "    {}", styled);
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{}",
                    "└─────────────────────────────────────────────────────────────────────┘"
                        .bright_blue()
                );
                let _ = writeln!(stderr);
            }
            LogEvent::HistoryUpdated { .. } => {
                // Debug info, shown in JSON and compact modes only
            }
            LogEvent::RunApproved { .. } => {
                // The final outcome is printed by main.rs
            }
            LogEvent::BudgetExhausted { epochs, best_score } => {
                let _ = writeln!(stderr);
                let best = best_score
                    .map(|s| format!(", best score {}", s))
                    .unwrap_or_default();
                let _ = writeln!(
                    stderr,
                    "{} Iteration budget exhausted ({} epochs{})",
                    "⚠".bright_yellow(),
                    epochs,
                    best
                );
            }
            LogEvent::RunInterrupted { epochs } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Interrupted after {} epoch(s)",
                    "⚠".bright_yellow(),
                    epochs
                );
            }
            LogEvent::ErrorEncountered { epoch, error } => {
                let _ = writeln!(stderr);
                let _ = writeln!(
                    stderr,
                    "{} Error in epoch {}: {}",
                    "✗".bright_red(),
                    epoch + 1,
                    error.bright_red()
                );
            }
        }
    }

    fn log_compact(&self, event: &LogEvent) {
        let mut stderr = std::io::stderr();
        let timestamp = chrono::Utc::now().format("%H:%M:%S");
        let msg = match event {
            LogEvent::LoopStarted { backend, .. } => {
                format!("[{}] loop:start backend={}", timestamp, backend)
            }
            LogEvent::GenerationStarted { epoch, refining } => format!(
                "[{}] writer:start:{}{}",
                timestamp,
                epoch + 1,
                if *refining { " refine" } else { "" }
            ),
            LogEvent::GenerationCompleted {
                epoch,
                chars,
                duration_secs,
            } => format!(
                "[{}] writer:done:{} {}c {:.1}s",
                timestamp,
                epoch + 1,
                chars,
                duration_secs
            ),
            LogEvent::DraftSaved { epoch, path } => {
                format!("[{}] draft:{} {}", timestamp, epoch + 1, path.display())
            }
            LogEvent::ReviewStarted { epoch } => {
                format!("[{}] reviewer:start:{}", timestamp, epoch + 1)
            }
            LogEvent::ReviewCompleted {
                epoch,
                score,
                duration_secs,
                ..
            } => format!(
                "[{}] reviewer:done:{} score={} {:.1}s",
                timestamp,
                epoch + 1,
                score,
                duration_secs
            ),
            LogEvent::CritiqueMalformed { epoch, error } => {
                format!("[{}] critique:malformed:{} {}", timestamp, epoch + 1, error)
            }
            LogEvent::GateDecided {
                epoch,
                approved,
                reason,
                ..
            } => format!(
                "[{}] gate:{}:{} {}",
                timestamp,
                epoch + 1,
                if *approved { "approve" } else { "reject" },
                reason
            ),
            LogEvent::HistoryUpdated {
                epoch,
                best_epoch,
                best_score,
            } => format!(
                "[{}] history:{} best={}@{}",
                timestamp,
                epoch + 1,
                best_score,
                best_epoch + 1
            ),
            LogEvent::RunApproved {
                epochs,
                score,
                duration_secs,
                ..
            } => format!(
                "[{}] loop:approved:{} score={} {:.1}s",
                timestamp, epochs, score, duration_secs
            ),
            LogEvent::BudgetExhausted { epochs, .. } => {
                format!("[{}] loop:limit:{}", timestamp, epochs)
            }
            LogEvent::RunInterrupted { epochs } => {
                format!("[{}] loop:interrupted:{}", timestamp, epochs)
            }
            LogEvent::ErrorEncountered { epoch, error } => {
                format!("[{}] error:{}:{}", timestamp, epoch + 1, error)
            }
        };
        let _ = writeln!(stderr, "{}", msg);
    }

    /// Truncate a string and pad to exact width
    fn truncate_with_padding(s: &str, max_len: usize, total_width: usize) -> String {
        let truncated = if s.chars().count() > max_len {
            let head: String = s.chars().take(max_len - 3).collect();
            format!("{}...", head)
        } else {
            s.to_string()
        };

        let padding_needed = total_width.saturating_sub(truncated.chars().count() + 1);
        format!("{}{}│", truncated, " ".repeat(padding_needed))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_event_serializes_with_tag() {
        let event = LogEvent::GateDecided {
            epoch: 1,
            score: 80,
            threshold: 70,
            approved: true,
            reason: "approved".into(),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["event"], "gate_decided");
        assert_eq!(json["score"], 80);
    }

    #[test]
    fn test_file_output_is_timestamped_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("events.jsonl");
        let logger = Logger::with_file(LogFormat::Compact, &path).unwrap();

        logger.log(&LogEvent::ReviewStarted { epoch: 0 });

        let content = std::fs::read_to_string(&path).unwrap();
        let value: serde_json::Value = serde_json::from_str(content.trim()).unwrap();
        assert_eq!(value["event"], "review_started");
        assert!(value["timestamp"].is_string());
    }

    #[test]
    fn test_truncate_with_padding_handles_multibyte() {
        let padded = Logger::truncate_with_padding("ünïcödé théme", 5, 10);
        assert_eq!(padded, "ün...    │");
    }

    #[test]
    fn test_log_format_from_str() {
        assert_eq!("JSON".parse::<LogFormat>(), Ok(LogFormat::Json));
        assert!("xml".parse::<LogFormat>().is_err());
    }
}
