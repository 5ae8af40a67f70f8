//! Response formatters.
//!
//! # Data Flow
//! ```text
//! negotiated format ("json")
//!     → FormatterRegistry::get (unknown → ApiError::NotAcceptable)
//!     → Formatter::format(structured content, request context)
//!     → wire bytes + Content-Type
//! ```
//!
//! # Design Decisions
//! - Formatters are stateless and shared via `Arc`
//! - The registry doubles as the list of formats negotiation will accept
//! - Request context is passed in rather than stored on the formatter

pub mod json;

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use axum::body::Bytes;
use serde_json::Value;

use crate::exception::ApiError;
use crate::http::request::RequestHead;

pub use json::{JsonFormatter, JsonpFormatter};

/// Request details a formatter may consult.
#[derive(Debug, Clone, Copy)]
pub struct FormatContext<'a> {
    pub request: &'a RequestHead,
}

impl<'a> FormatContext<'a> {
    pub fn new(request: &'a RequestHead) -> Self {
        Self { request }
    }
}

/// Converts structured content into one wire media type.
pub trait Formatter: Send + Sync + fmt::Debug {
    /// Media type written to `Content-Type` when the handler set none.
    fn content_type(&self, context: &FormatContext<'_>) -> &'static str;

    /// Serialize the content.
    fn format(&self, content: &Value, context: &FormatContext<'_>) -> Result<Bytes, ApiError>;
}

/// Formatters keyed by format token (the `+json` part of the Accept header).
#[derive(Debug, Clone, Default)]
pub struct FormatterRegistry {
    formatters: BTreeMap<String, Arc<dyn Formatter>>,
}

impl FormatterRegistry {
    /// An empty registry. Every format will be unacceptable.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with `json` and `jsonp`.
    pub fn with_defaults() -> Self {
        Self::new()
            .with("json", JsonFormatter)
            .with("jsonp", JsonpFormatter::default())
    }

    /// Builder-style [`register`](Self::register).
    pub fn with(mut self, format: impl Into<String>, formatter: impl Formatter + 'static) -> Self {
        self.register(format, formatter);
        self
    }

    /// Register or replace the formatter for a format token.
    pub fn register(&mut self, format: impl Into<String>, formatter: impl Formatter + 'static) {
        self.formatters
            .insert(format.into().to_ascii_lowercase(), Arc::new(formatter));
    }

    /// Look up the formatter for `format`.
    pub fn get(&self, format: &str) -> Result<Arc<dyn Formatter>, ApiError> {
        self.formatters
            .get(&format.to_ascii_lowercase())
            .cloned()
            .ok_or_else(|| ApiError::NotAcceptable {
                format: format.to_string(),
            })
    }

    pub fn supports(&self, format: &str) -> bool {
        self.formatters.contains_key(&format.to_ascii_lowercase())
    }

    /// Registered format tokens, sorted.
    pub fn formats(&self) -> impl Iterator<Item = &str> {
        self.formatters.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_registry_lookup_is_case_insensitive() {
        let registry = FormatterRegistry::with_defaults();
        assert!(registry.supports("JSON"));
        assert!(registry.get("Json").is_ok());
        assert_eq!(registry.formats().collect::<Vec<_>>(), vec!["json", "jsonp"]);
    }

    #[test]
    fn test_unknown_format_is_not_acceptable() {
        let registry = FormatterRegistry::with_defaults();
        match registry.get("xml") {
            Err(ApiError::NotAcceptable { format }) => assert_eq!(format, "xml"),
            other => panic!("expected NotAcceptable, got {other:?}"),
        }
    }
}
