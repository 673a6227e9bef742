use thiserror::Error;

/// Errors that stop a run before its first epoch. Failures inside an epoch
/// never surface here; they become rejections.
#[derive(Error, Debug)]
pub enum LoopError {
    #[error("Configuration error: {0}")]
    ConfigError(String),
}
