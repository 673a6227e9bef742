use std::path::Path;
use tracing::debug;

use crate::{BackendError, BackendType};

/// Resolve the API key for a backend.
///
/// Priority:
/// 1. `explicit` naming an existing file: the trimmed file contents
/// 2. `explicit` otherwise: the key itself
/// 3. The backend's environment variable
pub fn resolve_api_key(
    backend_type: BackendType,
    explicit: Option<&str>,
) -> Result<String, BackendError> {
    if let Some(value) = explicit.map(str::trim).filter(|v| !v.is_empty()) {
        let path = Path::new(value);
        if path.is_file() {
            debug!(path = %path.display(), "Loading API key from file");
            let key = std::fs::read_to_string(path).map_err(|e| {
                BackendError::ConfigError(format!(
                    "Error reading API key file {}: {}",
                    path.display(),
                    e
                ))
            })?;
            let key = key.trim();
            if key.is_empty() {
                return Err(BackendError::ConfigError(format!(
                    "API key file {} is empty",
                    path.display()
                )));
            }
            return Ok(key.to_string());
        }
        return Ok(value.to_string());
    }

    let Some(var) = backend_type.api_key_env() else {
        return Ok(String::new());
    };

    match std::env::var(var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ => Err(BackendError::ConfigError(format!(
            "No API key for {}. Pass --api-key (key or key file) or set {}",
            backend_type, var
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_explicit_key_is_used_verbatim() {
        let key = resolve_api_key(BackendType::OpenAi, Some("sk-literal")).unwrap();
        assert_eq!(key, "sk-literal");
    }

    #[test]
    fn test_key_file_is_read_and_trimmed() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "  sk-from-file  ").unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let key = resolve_api_key(BackendType::DeepSeek, Some(&path)).unwrap();
        assert_eq!(key, "sk-from-file");
    }

    #[test]
    fn test_empty_key_file_is_an_error() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();

        let result = resolve_api_key(BackendType::Google, Some(&path));
        assert!(matches!(result, Err(BackendError::ConfigError(_))));
    }

    #[test]
    fn test_mock_needs_no_key() {
        assert_eq!(resolve_api_key(BackendType::Mock, None).unwrap(), "");
    }
}
