//! # bookloops-writer
//!
//! The generation side of the loop: the [`WriterAgent`] that drafts a book
//! from a theme, and the [`History`] of earlier attempts it refines from.
//!
//! ## Key Types
//!
//! - [`Candidate`] - One generated draft, opaque to the loop
//! - [`Attempt`] - A candidate paired with its critique
//! - [`History`] - The best and the most recent attempt of a run
//! - [`WriterConfig`] - Structural bar for first drafts

mod history;
mod prompts;
mod writer;

pub use history::{Attempt, Candidate, History, Slot};
pub use prompts::WriterPrompts;
pub use writer::{WriterAgent, WriterConfig};
