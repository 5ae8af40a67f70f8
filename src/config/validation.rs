//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Negotiation tokens must be usable inside a vendor media type
//! - Validate value ranges (body limit > 0, timeouts > 0)
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ApiConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use thiserror::Error;

use crate::config::schema::ApiConfig;

/// A single semantic problem with a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("{field} must not be empty")]
    Empty { field: &'static str },

    #[error("{field} contains characters not allowed in a media type: `{value}`")]
    InvalidToken { field: &'static str, value: String },

    #[error("{field} must be greater than zero")]
    NotPositive { field: &'static str },

    #[error("router.prefix must contain more than slashes")]
    BlankPrefix,
}

fn is_media_token(value: &str) -> bool {
    value
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_'))
}

fn check_token(errors: &mut Vec<ValidationError>, field: &'static str, value: &str, allow_dots: bool) {
    if value.is_empty() {
        errors.push(ValidationError::Empty { field });
    } else if !is_media_token(value) || (!allow_dots && value.contains(['.', '-'])) {
        errors.push(ValidationError::InvalidToken {
            field,
            value: value.to_string(),
        });
    }
}

/// Validate a parsed configuration.
pub fn validate_config(config: &ApiConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();
    let negotiation = &config.negotiation;

    check_token(&mut errors, "negotiation.standards_tree", &negotiation.standards_tree, false);
    check_token(&mut errors, "negotiation.subtype", &negotiation.subtype, true);
    check_token(&mut errors, "negotiation.default_version", &negotiation.default_version, true);
    check_token(&mut errors, "negotiation.default_format", &negotiation.default_format, false);

    if let Some(prefix) = &config.router.prefix {
        if !prefix.is_empty() && prefix.trim_matches('/').is_empty() {
            errors.push(ValidationError::BlankPrefix);
        }
    }

    if config.router.max_body_bytes == 0 {
        errors.push(ValidationError::NotPositive {
            field: "router.max_body_bytes",
        });
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::NotPositive {
            field: "timeouts.request_secs",
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
