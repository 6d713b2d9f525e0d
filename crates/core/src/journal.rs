//! Dream journal validation.

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine as _;

use crate::error::CoreError;
use crate::types::Timestamp;

/// Maximum length of a journal title.
pub const MAX_TITLE_LENGTH: usize = 200;

/// Maximum length of a journal entry body.
pub const MAX_CONTENT_LENGTH: usize = 10_000;

/// Maximum size of an attached base64 image (about 12 MB decoded).
pub const MAX_IMAGE_B64_LENGTH: usize = 16 * 1024 * 1024;

/// Validate a journal title: non-blank and within [`MAX_TITLE_LENGTH`].
pub fn validate_title(title: &str) -> Result<(), CoreError> {
    if title.trim().is_empty() {
        return Err(CoreError::Validation(
            "Journal title must not be empty".to_string(),
        ));
    }
    if title.len() > MAX_TITLE_LENGTH {
        return Err(CoreError::Validation(format!(
            "Journal title exceeds maximum length of {MAX_TITLE_LENGTH} characters (got {})",
            title.len()
        )));
    }
    Ok(())
}

/// Validate a journal body: non-blank and within [`MAX_CONTENT_LENGTH`].
pub fn validate_content(content: &str) -> Result<(), CoreError> {
    if content.trim().is_empty() {
        return Err(CoreError::Validation(
            "Journal content must not be empty".to_string(),
        ));
    }
    if content.len() > MAX_CONTENT_LENGTH {
        return Err(CoreError::Validation(format!(
            "Journal content exceeds maximum length of {MAX_CONTENT_LENGTH} characters (got {})",
            content.len()
        )));
    }
    Ok(())
}

/// Validate an attached image: decodable standard base64, bounded size.
pub fn validate_image_b64(image: &str) -> Result<(), CoreError> {
    if image.is_empty() {
        return Err(CoreError::Validation(
            "Attached image must not be empty".to_string(),
        ));
    }
    if image.len() > MAX_IMAGE_B64_LENGTH {
        return Err(CoreError::Validation(format!(
            "Attached image exceeds maximum size of {MAX_IMAGE_B64_LENGTH} bytes"
        )));
    }
    BASE64.decode(image).map_err(|e| {
        CoreError::Validation(format!("Attached image must be base64 encoded: {e}"))
    })?;
    Ok(())
}

/// Validate an optional `[from, to]` listing range.
pub fn validate_date_range(
    from: Option<Timestamp>,
    to: Option<Timestamp>,
) -> Result<(), CoreError> {
    if let (Some(from), Some(to)) = (from, to) {
        if from > to {
            return Err(CoreError::Validation(
                "'from' must not be after 'to'".to_string(),
            ));
        }
    }
    Ok(())
}
