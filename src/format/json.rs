//! JSON and JSONP formatters.

use axum::body::Bytes;
use serde_json::Value;

use crate::exception::ApiError;
use crate::format::{FormatContext, Formatter};

/// `application/json` via serde_json.
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonFormatter;

impl Formatter for JsonFormatter {
    fn content_type(&self, _context: &FormatContext<'_>) -> &'static str {
        "application/json"
    }

    fn format(&self, content: &Value, _context: &FormatContext<'_>) -> Result<Bytes, ApiError> {
        serde_json::to_vec(content)
            .map(Bytes::from)
            .map_err(|e| ApiError::Internal(e.into()))
    }
}

/// JSON wrapped in a callback named by a query parameter.
///
/// Without the parameter (or with an unsafe callback name) it behaves as plain JSON.
#[derive(Debug, Clone)]
pub struct JsonpFormatter {
    callback_param: String,
}

impl JsonpFormatter {
    pub fn new(callback_param: impl Into<String>) -> Self {
        Self {
            callback_param: callback_param.into(),
        }
    }

    fn callback<'a>(&self, context: &FormatContext<'a>) -> Option<&'a str> {
        context
            .request
            .query_param(&self.callback_param)
            .filter(|name| is_safe_callback(name))
    }
}

impl Default for JsonpFormatter {
    fn default() -> Self {
        Self::new("callback")
    }
}

fn is_safe_callback(name: &str) -> bool {
    !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '$' | '.'))
}

impl Formatter for JsonpFormatter {
    fn content_type(&self, context: &FormatContext<'_>) -> &'static str {
        if self.callback(context).is_some() {
            "application/javascript"
        } else {
            "application/json"
        }
    }

    fn format(&self, content: &Value, context: &FormatContext<'_>) -> Result<Bytes, ApiError> {
        let json = JsonFormatter.format(content, context)?;
        match self.callback(context) {
            Some(callback) => {
                let mut wrapped = Vec::with_capacity(json.len() + callback.len() + 2);
                wrapped.extend_from_slice(callback.as_bytes());
                wrapped.push(b'(');
                wrapped.extend_from_slice(&json);
                wrapped.push(b')');
                Ok(Bytes::from(wrapped))
            }
            None => Ok(json),
        }
    }
}
