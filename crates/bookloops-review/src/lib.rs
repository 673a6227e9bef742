mod critique;
pub mod gate;
mod prompts;
pub mod reviewer;

pub use critique::{AspectFeedback, Critique, CritiqueParseError, Feedback, MalformedCritique};
pub use gate::{GateVerdict, InvalidGateInput, QualityGate};
pub use prompts::ReviewPrompts;
pub use reviewer::{ReviewAgent, ReviewConfig, ScoreScale};
