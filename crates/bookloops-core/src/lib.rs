mod context;
mod error;
mod loop_runner;
mod outcome;

pub use context::{EpochRecord, LoopContext, LoopState};
pub use error::LoopError;
pub use loop_runner::LoopRunner;
pub use outcome::LoopOutcome;
