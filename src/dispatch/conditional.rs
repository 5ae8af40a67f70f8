//! ETag validators and `If-None-Match` evaluation.
//!
//! # Responsibilities
//! - Derive a strong validator from the finalized body
//! - Decide whether the client's cached copy is current
//! - Downgrade the response to 304 when it is
//!
//! # Design Decisions
//! - The validator is the first 16 bytes of a SHA-256 digest, hex-encoded and quoted
//! - A validator set by the handler is never replaced
//! - Comparison is weak (the `W/` marker is ignored), as `If-None-Match` requires
//! - Only safe methods (GET, HEAD) are downgraded

use axum::http::header::{HeaderMap, HeaderValue, ETAG, IF_NONE_MATCH};
use axum::http::Method;
use sha2::{Digest, Sha256};

use crate::http::request::RequestHead;
use crate::http::response::ApiResponse;

/// Quoted validator for a body.
pub fn compute_etag(body: &[u8]) -> String {
    let digest = Sha256::digest(body);
    format!("\"{}\"", hex::encode(&digest[..16]))
}

fn opaque(tag: &str) -> &str {
    let tag = tag.trim();
    tag.strip_prefix("W/").unwrap_or(tag)
}

/// True if any `If-None-Match` value matches `etag`.
pub fn if_none_match(headers: &HeaderMap, etag: &str) -> bool {
    let etag = opaque(etag);
    headers
        .get_all(IF_NONE_MATCH)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|candidate| !candidate.is_empty())
        .any(|candidate| candidate == "*" || opaque(candidate) == etag)
}

/// Attach a validator and downgrade to 304 if the request already holds it.
///
/// Returns true when the response was downgraded. Responses without final
/// bytes, and responses carrying a non-ASCII validator, are left untouched.
pub fn apply(response: &mut ApiResponse, request: &RequestHead) -> bool {
    let etag = match response.headers().get(ETAG) {
        Some(existing) => match existing.to_str() {
            Ok(existing) => existing.to_string(),
            // Opaque bytes cannot be compared against `If-None-Match`.
            Err(_) => return false,
        },
        None => {
            let Some(body) = response.body() else {
                return false;
            };
            let etag = compute_etag(body);
            match HeaderValue::from_str(&etag) {
                Ok(value) => {
                    response.headers_mut().insert(ETAG, value);
                }
                Err(_) => return false,
            }
            etag
        }
    };

    let safe = request.method == Method::GET || request.method == Method::HEAD;
    if safe && if_none_match(&request.headers, &etag) {
        response.set_not_modified();
        return true;
    }
    false
}
