/// Input validators for the administrative endpoints
///
/// Identifiers end up inside store keys, so they are restricted to a small
/// alphabet: anything with `:` or whitespace could address a different key.

use regex::Regex;
use lazy_static::lazy_static;

use crate::error::ValidationError;

const MAX_IDENTIFIER_LENGTH: usize = 128;
const MAX_REASON_LENGTH: usize = 256;

lazy_static! {
    static ref IDENTIFIER_REGEX: Regex = Regex::new(r"^[A-Za-z0-9_-]+$").unwrap();
}

/// Validates a jti, family id or username used as a store key component
pub fn is_valid_identifier(field: &str, value: &str) -> Result<String, ValidationError> {
    let trimmed = value.trim();

    if trimmed.is_empty() {
        return Err(ValidationError::EmptyField(field.to_string()));
    }

    if trimmed.len() > MAX_IDENTIFIER_LENGTH {
        return Err(ValidationError::TooLong(field.to_string(), MAX_IDENTIFIER_LENGTH));
    }

    if !IDENTIFIER_REGEX.is_match(trimmed) {
        return Err(ValidationError::InvalidFormat(field.to_string()));
    }

    Ok(trimmed.to_string())
}

/// Validates the optional free-text revocation reason
pub fn is_valid_reason(reason: Option<&str>) -> Result<Option<String>, ValidationError> {
    match reason.map(str::trim) {
        None | Some("") => Ok(None),
        Some(r) if r.len() > MAX_REASON_LENGTH => {
            Err(ValidationError::TooLong("reason".to_string(), MAX_REASON_LENGTH))
        }
        Some(r) if r.chars().any(|c| c.is_control()) => {
            Err(ValidationError::InvalidFormat("reason".to_string()))
        }
        Some(r) => Ok(Some(r.to_string())),
    }
}
