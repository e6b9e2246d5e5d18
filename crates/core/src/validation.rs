//! Input validation helpers shared by configuration and request payloads

use crate::error::CoreError;
use once_cell::sync::Lazy;
use regex::Regex;

static EMAIL_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email pattern is valid"));

/// Common validation helpers
pub mod validators {
    use super::{CoreError, EMAIL_PATTERN};

    /// Validate that a string is not empty
    pub fn validate_not_empty(value: &str, field: &str) -> Result<(), CoreError> {
        if value.trim().is_empty() {
            return Err(CoreError::validation(format!("{field}: cannot be empty")));
        }
        Ok(())
    }

    /// Validate an absolute http(s) URL
    pub fn validate_http_url(value: &str, field: &str) -> Result<url::Url, CoreError> {
        let parsed = url::Url::parse(value)
            .map_err(|e| CoreError::validation(format!("{field}: invalid URL - {e}")))?;

        match parsed.scheme() {
            "http" | "https" => Ok(parsed),
            other => Err(CoreError::validation(format!(
                "{field}: unsupported scheme '{other}'"
            ))),
        }
    }

    /// Validate email format
    pub fn validate_email(email: &str, field: &str) -> Result<(), CoreError> {
        if !EMAIL_PATTERN.is_match(email) {
            return Err(CoreError::validation(format!("{field}: invalid email format")));
        }
        Ok(())
    }

    /// Validate that a value is within range
    pub fn validate_range<T: PartialOrd + std::fmt::Display>(
        value: T,
        min: T,
        max: T,
        field: &str,
    ) -> Result<(), CoreError> {
        if value < min || value > max {
            return Err(CoreError::validation(format!(
                "{field}: must be between {min} and {max}"
            )));
        }
        Ok(())
    }
}
