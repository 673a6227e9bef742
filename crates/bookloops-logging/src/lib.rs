//! # bookloops-logging
//!
//! Logging for the bookloops writer/reviewer loop.
//!
//! ## Key Types
//!
//! - [`Logger`] - Structured run events for the console (and optionally a file)
//! - [`LogEvent`] - Log event types
//! - [`LogFormat`] - Output formats (Pretty, JSON, Compact)
//! - [`AuditLog`] - Append-only, one line per epoch
//!
//! ## Audit Log Format
//!
//! ```text
//! Epoch: 1, Score: 62, Score Categories: {"plot": 6}, Feedback: pacing (5): slow start
//! Epoch: 2, Error: generation failed in epoch 2: Backend call timed out after 90s
//! ```

mod audit;
mod events;

pub use audit::AuditLog;
pub use events::{LogEvent, LogFormat, Logger};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Initialize tracing for the application
pub fn init_tracing(level: &str, format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    match format {
        LogFormat::Json => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().json().with_target(false).with_writer(std::io::stderr))
                .init();
        }
        LogFormat::Pretty | LogFormat::Compact => {
            tracing_subscriber::registry()
                .with(filter)
                .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
                .init();
        }
    }
}
