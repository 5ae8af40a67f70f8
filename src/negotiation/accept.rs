//! Vendor media type parsing for the `Accept` header.

use std::collections::BTreeSet;

use axum::http::header::{HeaderMap, ACCEPT};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::config::NegotiationConfig;

/// Negotiated API version and response format for one request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NegotiatedAccept {
    pub version: String,
    pub format: String,
}

impl NegotiatedAccept {
    pub fn new(version: impl Into<String>, format: impl Into<String>) -> Self {
        Self {
            version: version.into(),
            format: format.into(),
        }
    }
}

/// Parses `application/<tree>.<subtype>.<version>+<format>`.
#[derive(Debug, Clone)]
pub struct AcceptNegotiator {
    pattern: Regex,
    default: NegotiatedAccept,
    formats: BTreeSet<String>,
}

impl AcceptNegotiator {
    /// Build a negotiator accepting only the given format tokens.
    ///
    /// An empty format list accepts any structurally valid token.
    pub fn new<I, S>(config: &NegotiationConfig, formats: I) -> Result<Self, regex::Error>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let pattern = Regex::new(&format!(
            r"(?i)^application/{}\.({})\.([\w.\-]+)\+([\w.\-]+)\s*(?:;|$)",
            regex::escape(&config.standards_tree),
            regex::escape(&config.subtype),
        ))?;

        Ok(Self {
            pattern,
            default: NegotiatedAccept::new(&config.default_version, config.default_format.to_ascii_lowercase()),
            formats: formats
                .into_iter()
                .map(|f| f.as_ref().to_ascii_lowercase())
                .collect(),
        })
    }

    /// The pair used when the header is missing or unparsable.
    pub fn default_accept(&self) -> &NegotiatedAccept {
        &self.default
    }

    /// Negotiate from request headers. Never fails.
    pub fn parse(&self, headers: &HeaderMap) -> NegotiatedAccept {
        let candidates = headers
            .get_all(ACCEPT)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|value| value.split(','));

        for candidate in candidates {
            if let Some(accept) = self.parse_media_type(candidate.trim()) {
                return accept;
            }
        }

        self.default.clone()
    }

    fn parse_media_type(&self, media_type: &str) -> Option<NegotiatedAccept> {
        let captures = self.pattern.captures(media_type)?;
        let version = captures.get(2)?.as_str();
        let format = captures.get(3)?.as_str().to_ascii_lowercase();

        let format = if self.formats.is_empty() || self.formats.contains(&format) {
            format
        } else {
            tracing::debug!(requested = %format, fallback = %self.default.format, "Unsupported format requested");
            self.default.format.clone()
        };

        Some(NegotiatedAccept::new(version, format))
    }
}
