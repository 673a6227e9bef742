//! Extraction of tagged payloads from free-form model responses.
//!
//! Models are asked to wrap machine-readable output in a tag pair such as
//! `<review>...</review>`; everything around the block is commentary.

use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BlockError {
    #[error("<{0}> block is never closed")]
    Unterminated(String),

    #[error("</{0}> appears before <{0}>")]
    Reversed(String),
}

/// Find the last complete `<tag>...</tag>` block and return its trimmed body.
///
/// The block ends at the final closing tag and starts at the nearest opening
/// tag before it, so commentary that mentions the tag ahead of the real block
/// is skipped. Returns `Ok(None)` when the opening tag is absent. A
/// surrounding Markdown code fence inside the block is stripped.
pub fn extract_block<'a>(text: &'a str, tag: &str) -> Result<Option<&'a str>, BlockError> {
    let open = format!("<{}>", tag);
    let close = format!("</{}>", tag);

    if !text.contains(&open) {
        return Ok(None);
    }
    let Some(end) = text.rfind(&close) else {
        return Err(BlockError::Unterminated(tag.to_string()));
    };

    match text[..end].rfind(&open) {
        Some(start) => Ok(Some(strip_code_fence(text[start + open.len()..end].trim()))),
        None => Err(BlockError::Reversed(tag.to_string())),
    }
}

/// Wrap a payload in a tag pair, one tag per line.
pub fn wrap_block(tag: &str, body: &str) -> String {
    format!("<{tag}>\n{body}\n</{tag}>")
}

fn strip_code_fence(body: &str) -> &str {
    let Some(rest) = body.strip_prefix("```") else {
        return body;
    };
    // Drop the info string (e.g. "json") on the opening fence line
    let rest = match rest.find('\n') {
        Some(pos) => &rest[pos + 1..],
        None => rest,
    };
    rest.trim_end().strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_block_with_commentary() {
        let text = "Here is my verdict.\n<review>\n{\"a\": 1}\n</review>\nThanks!";
        assert_eq!(extract_block(text, "review").unwrap(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_block_missing_tag() {
        assert_eq!(extract_block("no tags here", "review").unwrap(), None);
    }

    #[test]
    fn test_extract_block_unterminated() {
        let result = extract_block("<review>{\"overall_score\": 8", "review");
        assert_eq!(result, Err(BlockError::Unterminated("review".into())));
    }

    #[test]
    fn test_extract_block_reversed() {
        let result = extract_block("</review> oops <review>", "review");
        assert_eq!(result, Err(BlockError::Reversed("review".into())));
    }

    #[test]
    fn test_extract_block_skips_tag_mentioned_in_commentary() {
        let text = "I will put my verdict in the <review> block below.\n<review>\n{\"a\": 1}\n</review>";
        assert_eq!(extract_block(text, "review").unwrap(), Some("{\"a\": 1}"));
    }

    #[test]
    fn test_extract_block_takes_last_block() {
        let text = "<review>draft</review>\nOn reflection:\n<review>final</review>\nDone.";
        assert_eq!(extract_block(text, "review").unwrap(), Some("final"));
    }

    #[test]
    fn test_extract_block_strips_code_fence() {
        let text = "<book>\n```json\n{\"title\": \"T\"}\n```\n</book>";
        assert_eq!(extract_block(text, "book").unwrap(), Some("{\"title\": \"T\"}"));
    }
}
