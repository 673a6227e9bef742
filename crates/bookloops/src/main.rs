mod config;
mod themes;

use std::path::{Path, PathBuf};
use std::sync::atomic::Ordering;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use colored::Colorize;

use bookloops_backend::{create_backend, Backend, BackendType, MockBackend};
use bookloops_core::{LoopOutcome, LoopRunner};
use bookloops_export::{MarkdownExporter, TextExporter};
use bookloops_logging::{init_tracing, AuditLog, LogFormat, Logger};
use bookloops_review::QualityGate;

use crate::config::ProjectConfig;

const DEFAULT_MAX_ITERATIONS: usize = 5;
const DEFAULT_OUTPUT_DIR: &str = "output";
const DEFAULT_AUDIT_LOG: &str = "review_log.txt";

#[derive(Parser, Debug)]
#[command(
    name = "bookloops",
    about = "Write, review, and refine a book until it passes a quality gate",
    version,
    author
)]
struct Cli {
    /// Backend used for both writer and reviewer (default: google)
    #[arg(long, value_enum)]
    backend: Option<BackendChoice>,

    /// API key, or a path to a file containing it
    #[arg(long)]
    api_key: Option<String>,

    /// Maximum number of epochs (default: 5)
    #[arg(short = 'n', long)]
    max_iterations: Option<usize>,

    /// Theme for the book
    #[arg(long, conflicts_with = "random_theme")]
    theme: Option<String>,

    /// Pick a theme from the built-in list
    #[arg(long)]
    random_theme: bool,

    /// Minimum score for approval (default: 86, or 8 on a 0-10 scale)
    #[arg(long)]
    threshold: Option<i64>,

    /// Reject any review whose feedback mentions this term (repeatable)
    #[arg(long = "deny", value_name = "TERM")]
    deny: Vec<String>,

    /// Directory for drafts and the final book (default: ./output)
    #[arg(long)]
    output_dir: Option<PathBuf>,

    /// Working directory (default: current directory)
    #[arg(short = 'd', long)]
    working_dir: Option<PathBuf>,

    /// Log output format
    #[arg(long, value_enum, default_value = "pretty")]
    log_format: LogFormatChoice,

    /// Also write every event as JSON lines to this file
    #[arg(long)]
    log_file: Option<PathBuf>,

    /// Output final result as JSON
    #[arg(long)]
    json_output: bool,

    /// Dry run: show what would happen without executing
    #[arg(long)]
    dry_run: bool,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BackendChoice {
    Openai,
    Deepseek,
    Google,
    Mock,
}

impl From<BackendChoice> for BackendType {
    fn from(choice: BackendChoice) -> Self {
        match choice {
            BackendChoice::Openai => BackendType::OpenAi,
            BackendChoice::Deepseek => BackendType::DeepSeek,
            BackendChoice::Google => BackendType::Google,
            BackendChoice::Mock => BackendType::Mock,
        }
    }
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum LogFormatChoice {
    Pretty,
    Json,
    Compact,
}

impl From<LogFormatChoice> for LogFormat {
    fn from(choice: LogFormatChoice) -> Self {
        match choice {
            LogFormatChoice::Pretty => LogFormat::Pretty,
            LogFormatChoice::Json => LogFormat::Json,
            LogFormatChoice::Compact => LogFormat::Compact,
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let log_format: LogFormat = cli.log_format.into();
    init_tracing("warn", log_format);

    let working_dir = match cli.working_dir.clone() {
        Some(dir) => dir,
        None => std::env::current_dir().context("Failed to get current directory")?,
    };

    let project_config = ProjectConfig::load(&working_dir)?.unwrap_or_default();

    let backend_type = resolve_backend_type(&cli, &project_config)?;
    let max_iterations = cli
        .max_iterations
        .or(project_config.max_iterations)
        .unwrap_or(DEFAULT_MAX_ITERATIONS);
    let denylist: Vec<String> = project_config
        .gate
        .denylist
        .iter()
        .chain(cli.deny.iter())
        .cloned()
        .collect();
    let output_dir = resolve_path(
        &working_dir,
        cli.output_dir
            .clone()
            .or_else(|| project_config.output_dir.clone())
            .unwrap_or_else(|| PathBuf::from(DEFAULT_OUTPUT_DIR)),
    );
    let audit_path = resolve_path(
        &working_dir,
        project_config
            .audit_log
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_AUDIT_LOG)),
    );
    let review_config = project_config.review_config()?;
    let threshold = project_config.threshold(cli.threshold, review_config.scale)?;

    if cli.dry_run {
        let theme = cli.theme.as_deref().unwrap_or(if cli.random_theme {
            "(random)"
        } else {
            "(prompted)"
        });
        println!("=== Dry Run ===");
        println!("Theme: {}", theme);
        println!("Working dir: {}", working_dir.display());
        println!("Backend: {}", backend_type);
        println!("Max iterations: {}", max_iterations);
        println!("Threshold: {}", threshold);
        println!("Denylist: {:?}", denylist);
        println!("Score scale: 0-{}", review_config.scale.max());
        println!("Output dir: {}", output_dir.display());
        println!("Audit log: {}", audit_path.display());
        return Ok(());
    }

    let theme = match (&cli.theme, cli.random_theme) {
        (Some(theme), _) => theme.trim().to_string(),
        (None, true) => themes::random_theme().to_string(),
        (None, false) => themes::prompt_theme()?,
    };
    if theme.is_empty() {
        anyhow::bail!("Theme must not be empty");
    }

    let backend: Box<dyn Backend> = match backend_type {
        BackendType::Mock => Box::new(MockBackend::with_mock_dir(working_dir.join("mock"))),
        other => create_backend(other, cli.api_key.as_deref())
            .with_context(|| format!("Failed to set up {} backend", other))?,
    };

    let exporter = MarkdownExporter::new(output_dir.clone())
        .with_context(|| format!("Failed to prepare {}", output_dir.display()))?;
    let drafts = TextExporter::new(output_dir.clone())
        .with_context(|| format!("Failed to prepare {}", output_dir.display()))?;
    let audit = AuditLog::open(&audit_path)
        .with_context(|| format!("Failed to open audit log {}", audit_path.display()))?;

    let gate = QualityGate::new(threshold).with_denied_terms(denylist);
    let logger = match &cli.log_file {
        Some(path) => {
            let path = resolve_path(&working_dir, path.clone());
            Logger::with_file(log_format, &path)
                .with_context(|| format!("Failed to open log file {}", path.display()))?
        }
        None => Logger::new(log_format),
    };
    let logger = Arc::new(logger);

    let runner = LoopRunner::new(backend.as_ref(), backend.as_ref(), gate, &exporter, logger)
        .with_writer_config(
            project_config.writer_config(),
            project_config.writer_options(),
        )
        .with_review_config(review_config, project_config.reviewer_options())
        .with_draft_exporter(&drafts)
        .with_audit_log(audit);

    // Handle Ctrl+C gracefully
    let interrupt_handle = runner.interrupt_handle();
    ctrlc::set_handler(move || {
        eprintln!("\nInterrupted. Finishing current epoch...");
        interrupt_handle.store(true, Ordering::SeqCst);
    })
    .context("Failed to set Ctrl+C handler")?;

    let outcome = runner.run(&theme, max_iterations).await?;

    if cli.json_output {
        let json = serde_json::to_string_pretty(&outcome)?;
        println!("{}", json);
    } else {
        print_outcome(&outcome);
    }

    std::process::exit(outcome.exit_code());
}

/// CLI flag > config file > google
fn resolve_backend_type(cli: &Cli, config: &ProjectConfig) -> Result<BackendType> {
    if let Some(choice) = cli.backend {
        return Ok(choice.into());
    }
    match &config.backend {
        Some(name) => name.parse().map_err(anyhow::Error::msg),
        None => Ok(BackendType::Google),
    }
}

fn resolve_path(working_dir: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        working_dir.join(path)
    }
}

fn print_outcome(outcome: &LoopOutcome) {
    match outcome {
        LoopOutcome::Approved {
            epochs,
            score,
            exported_to,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== APPROVED ===".bright_green().bold());
            eprintln!("Epochs: {}", epochs);
            eprintln!("Score: {}", score);
            eprintln!("Duration: {:.1}s", total_duration_secs);
            match exported_to {
                Some(path) => eprintln!("Book: {}", path.display()),
                None => eprintln!("Export failed; see the log above."),
            }
        }
        LoopOutcome::BudgetExhausted {
            epochs,
            best_score,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== NOT APPROVED ===".bright_yellow().bold());
            eprintln!("No draft passed the gate in {} epoch(s)", epochs);
            if let Some(best) = best_score {
                eprintln!("Best score: {}", best);
            }
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
        LoopOutcome::Interrupted {
            epochs,
            total_duration_secs,
            ..
        } => {
            eprintln!();
            eprintln!("{}", "=== INTERRUPTED ===".bright_red().bold());
            eprintln!("User stopped after {} epoch(s)", epochs);
            eprintln!("Duration: {:.1}s", total_duration_secs);
        }
    }
}
