//! # bookloops-backend
//!
//! Text-generation backends for the bookloops writer/reviewer loop.
//!
//! Every backend implements [`Backend`], a single capability: turn a prompt
//! into text. Agents and the iteration controller only ever hold a
//! `&dyn Backend`, so swapping providers never touches loop logic.
//!
//! ## Key Types
//!
//! - [`Backend`] - The capability trait
//! - [`GenerationOptions`] - Model, token limit, temperature, timeout
//! - [`BackendError`] - Why a call produced no text
//! - [`GenerationFailure`] - A backend error attributed to an epoch and stage

mod credentials;
mod deepseek;
mod google;
pub mod markup;
mod mock;
mod openai;
mod traits;

pub use credentials::resolve_api_key;
pub use deepseek::DeepSeekBackend;
pub use google::GoogleBackend;
pub use mock::MockBackend;
pub use openai::OpenAiBackend;
pub use traits::{
    Backend, BackendError, BackendType, GenerationFailure, GenerationOptions, Stage,
};

/// Create a backend by type, resolving its credential first.
///
/// `api_key` may be the key itself or a path to a file holding it; when
/// absent the backend's environment variable is consulted.
pub fn create_backend(
    backend_type: BackendType,
    api_key: Option<&str>,
) -> Result<Box<dyn Backend>, BackendError> {
    match backend_type {
        BackendType::Mock => Ok(Box::new(MockBackend::new())),
        BackendType::OpenAi => {
            let key = resolve_api_key(backend_type, api_key)?;
            Ok(Box::new(OpenAiBackend::new(key)?))
        }
        BackendType::DeepSeek => {
            let key = resolve_api_key(backend_type, api_key)?;
            Ok(Box::new(DeepSeekBackend::new(key)?))
        }
        BackendType::Google => {
            let key = resolve_api_key(backend_type, api_key)?;
            Ok(Box::new(GoogleBackend::new(key)?))
        }
    }
}
