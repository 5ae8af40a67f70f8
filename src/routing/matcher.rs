//! Route matching logic.
//!
//! # Responsibilities
//! - Match the request host against a route's domain (exact, case-insensitive)
//! - Match the request path against a URI pattern and extract parameters
//!
//! # Design Decisions
//! - Host matching is case-insensitive, port ignored
//! - Path matching is case-sensitive
//! - `{param}` matches one segment, `{param?}` an optional trailing segment
//! - `where` constraints replace the default segment pattern and are anchored
//! - A trailing slash on the request path is tolerated

use regex::Regex;

use crate::http::request::{RequestHead, RouteParams};
use crate::routing::error::RouterError;
use std::collections::BTreeMap;

/// Trait for matching requests against conditions.
pub trait Matcher: Send + Sync + std::fmt::Debug {
    /// Returns true if the request matches this condition.
    fn matches(&self, request: &RequestHead) -> bool;
}

/// Matches the Host header.
#[derive(Debug, Clone)]
pub struct HostMatcher {
    expected_host: String,
}

impl HostMatcher {
    /// Create a new host matcher.
    /// The host is normalized to lowercase for case-insensitive matching.
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            expected_host: host.into().to_lowercase(),
        }
    }
}

impl Matcher for HostMatcher {
    fn matches(&self, request: &RequestHead) -> bool {
        request
            .host()
            .map(|h| h == self.expected_host)
            .unwrap_or(false)
    }
}

const DEFAULT_SEGMENT: &str = "[^/]+";

/// Compiled path pattern such as `/users/{id}/posts/{post?}`.
#[derive(Debug, Clone)]
pub struct UriPattern {
    uri: String,
    regex: Regex,
    params: Vec<String>,
}

impl UriPattern {
    /// Compile a normalized URI with the given parameter constraints.
    pub fn compile(uri: &str, wheres: &BTreeMap<String, String>) -> Result<Self, RouterError> {
        for (param, pattern) in wheres {
            Regex::new(pattern).map_err(|source| RouterError::InvalidPattern {
                param: param.clone(),
                source,
            })?;
        }

        let mut params = Vec::new();
        let mut source = String::from("^");
        let segments: Vec<&str> = uri.split('/').filter(|s| !s.is_empty()).collect();

        for segment in &segments {
            let optional = segment.starts_with('{') && segment.ends_with("?}");
            let piece = Self::segment_regex(segment, wheres, &mut params);
            if optional {
                source.push_str(&format!("(?:/{piece})?"));
            } else {
                source.push('/');
                source.push_str(&piece);
            }
        }

        if segments.is_empty() {
            source.push_str("/$");
        } else {
            source.push_str("/?$");
        }

        let regex = Regex::new(&source).map_err(|source| RouterError::InvalidPattern {
            param: uri.to_string(),
            source,
        })?;

        Ok(Self {
            uri: uri.to_string(),
            regex,
            params,
        })
    }

    fn segment_regex(segment: &str, wheres: &BTreeMap<String, String>, params: &mut Vec<String>) -> String {
        let mut out = String::new();
        let mut rest = segment;

        while let Some(open) = rest.find('{') {
            let Some(close) = rest[open..].find('}').map(|c| open + c) else {
                break;
            };
            out.push_str(&regex::escape(&rest[..open]));

            let inner = &rest[open + 1..close];
            let (name, optional) = match inner.strip_suffix('?') {
                Some(name) => (name, true),
                None => (inner, false),
            };
            let pattern = wheres.get(name).map(String::as_str).unwrap_or(DEFAULT_SEGMENT);
            out.push_str(&format!("(?P<{name}>(?:{pattern}))"));
            if optional && segment != format!("{{{inner}}}") {
                out.push('?');
            }
            params.push(name.to_string());

            rest = &rest[close + 1..];
        }

        out.push_str(&regex::escape(rest));
        out
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }

    /// Parameter names in declaration order.
    pub fn params(&self) -> &[String] {
        &self.params
    }

    /// Match a request path, returning the captured parameters.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let captures = self.regex.captures(path)?;
        Some(
            self.params
                .iter()
                .filter_map(|name| {
                    captures
                        .name(name)
                        .map(|m| (name.clone(), m.as_str().to_string()))
                })
                .collect(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Bytes;
    use axum::http::Request;

    fn head(uri: &str, host: &str) -> RequestHead {
        let request = Request::builder()
            .uri(uri)
            .header("Host", host)
            .body(Bytes::new())
            .unwrap();
        RequestHead::from_parts(&request.into_parts().0)
    }

    #[test]
    fn test_host_matcher() {
        let matcher = HostMatcher::new("example.com");

        assert!(matcher.matches(&head("/", "example.com")));
        assert!(matcher.matches(&head("/", "EXAMPLE.COM:8080"))); // Case insensitive, port ignored
        assert!(!matcher.matches(&head("/", "other.com")));
    }

    #[test]
    fn test_static_and_root_patterns() {
        let root = UriPattern::compile("/", &BTreeMap::new()).unwrap();
        assert!(root.captures("/").is_some());
        assert!(root.captures("/users").is_none());

        let users = UriPattern::compile("/api/users", &BTreeMap::new()).unwrap();
        assert!(users.captures("/api/users").is_some());
        assert!(users.captures("/api/users/").is_some());
        assert!(users.captures("/api/Users").is_none());
        assert!(users.captures("/api/users/1").is_none());
    }

    #[test]
    fn test_parameters() {
        let pattern = UriPattern::compile("/users/{id}/posts/{post?}", &BTreeMap::new()).unwrap();

        let params = pattern.captures("/users/7/posts/12").unwrap();
        assert_eq!(params["id"], "7");
        assert_eq!(params["post"], "12");

        let params = pattern.captures("/users/7/posts").unwrap();
        assert_eq!(params["id"], "7");
        assert!(!params.contains_key("post"));

        assert_eq!(pattern.params(), ["id", "post"]);
    }

    #[test]
    fn test_where_constraints() {
        let wheres = BTreeMap::from([("id".to_string(), "[0-9]+".to_string())]);
        let pattern = UriPattern::compile("/users/{id}", &wheres).unwrap();

        assert!(pattern.captures("/users/42").is_some());
        assert!(pattern.captures("/users/ada").is_none());
        assert!(pattern.captures("/users/42abc").is_none());
    }

    #[test]
    fn test_mixed_segment() {
        let pattern = UriPattern::compile("/files/{name}.json", &BTreeMap::new()).unwrap();
        assert_eq!(pattern.captures("/files/report.json").unwrap()["name"], "report");
        assert!(pattern.captures("/files/report.xml").is_none());
    }

    #[test]
    fn test_invalid_where_pattern() {
        let wheres = BTreeMap::from([("id".to_string(), "[0-9".to_string())]);
        let err = UriPattern::compile("/users/{id}", &wheres).unwrap_err();
        assert!(matches!(err, RouterError::InvalidPattern { ref param, .. } if param == "id"));
    }
}
