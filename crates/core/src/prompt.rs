//! Prompt validation shared by the proxy endpoints and the composer.

use crate::error::CoreError;

/// Maximum length of a prompt in bytes.
pub const MAX_PROMPT_LENGTH: usize = 4_000;

/// `true` when the prompt has no visible content.
///
/// A blank prompt never reaches the image backend and resets the
/// composer's generation state.
pub fn is_blank(text: &str) -> bool {
    text.trim().is_empty()
}

/// Validate a prompt: must contain non-whitespace text and stay within
/// [`MAX_PROMPT_LENGTH`].
pub fn validate_prompt(text: &str) -> Result<(), CoreError> {
    if is_blank(text) {
        return Err(CoreError::Validation(
            "Prompt must not be empty".to_string(),
        ));
    }
    if text.len() > MAX_PROMPT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Prompt exceeds maximum length of {MAX_PROMPT_LENGTH} characters (got {})",
            text.len()
        )));
    }
    Ok(())
}

/// Normalize a model-produced rewrite.
///
/// Chat models like to wrap their answer in quotes or pad it with blank
/// lines. Returns `None` when nothing usable is left.
pub fn clean_rewrite(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    let unquoted = trimmed
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(trimmed)
        .trim();
    if unquoted.is_empty() {
        None
    } else {
        Some(unquoted.to_string())
    }
}
