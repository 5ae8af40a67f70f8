//! Request abstraction handed to the engine and to handlers.
//!
//! # Responsibilities
//! - Carry method, URI, headers and the buffered body
//! - Flag internal (self-issued) requests
//! - Expose the negotiated version/format once dispatch has started
//! - Hold the back-reference to the matched route and its parameters
//!
//! # Design Decisions
//! - The head is cloneable and shared with the dispatch context; the body is not
//! - The matched-route slot is write-once and shared with the dispatch context,
//!   so the route survives the request being moved into the handler
//! - Request ID taken from `x-request-id` when the transport set one

use std::collections::BTreeMap;
use std::sync::{Arc, OnceLock};

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap};
use axum::http::request::Parts;
use axum::http::{Method, Request, StatusCode, Uri};
use http_body_util::{BodyExt, LengthLimitError, Limited};
use serde::de::DeserializeOwned;

use crate::exception::ApiError;
use crate::negotiation::NegotiatedAccept;
use crate::routing::RouteRecord;

/// Header carrying the correlation ID.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Parameters extracted from the matched URI pattern.
pub type RouteParams = BTreeMap<String, String>;

/// Route matched by the engine for one request.
#[derive(Debug, Clone)]
pub struct MatchedRoute {
    pub record: Arc<RouteRecord>,
    pub params: RouteParams,
}

pub(crate) type RouteSlot = Arc<OnceLock<MatchedRoute>>;

/// Method, URI and headers of a request.
#[derive(Debug, Clone)]
pub struct RequestHead {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    pub request_id: String,
}

impl RequestHead {
    pub fn from_parts(parts: &Parts) -> Self {
        let request_id = parts
            .headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string)
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

        Self {
            method: parts.method.clone(),
            uri: parts.uri.clone(),
            headers: parts.headers.clone(),
            request_id,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    /// First value of a header, if it is valid visible ASCII.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Host without port, lowercased. Falls back to the URI authority.
    pub fn host(&self) -> Option<String> {
        let raw = self
            .headers
            .get(header::HOST)
            .and_then(|v| v.to_str().ok())
            .or_else(|| self.uri.host())?;
        let host = if raw.ends_with(']') {
            raw
        } else {
            raw.rsplit_once(':').map_or(raw, |(host, _port)| host)
        };
        Some(host.to_ascii_lowercase())
    }

    /// Raw value of a query string parameter.
    pub fn query_param(&self, name: &str) -> Option<&str> {
        self.uri.query()?.split('&').find_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            (key == name).then_some(value)
        })
    }
}

/// A request travelling through the dispatch pipeline.
#[derive(Debug)]
pub struct ApiRequest {
    head: RequestHead,
    body: Bytes,
    internal: bool,
    accept: Option<NegotiatedAccept>,
    matched: RouteSlot,
}

impl ApiRequest {
    pub fn from_parts(parts: Parts, body: Bytes) -> Self {
        Self {
            head: RequestHead::from_parts(&parts),
            body,
            internal: false,
            accept: None,
            matched: RouteSlot::default(),
        }
    }

    /// Buffer an axum request body, up to `limit` bytes.
    pub async fn from_http(request: Request<Body>, limit: usize) -> Result<Self, ApiError> {
        let (parts, body) = request.into_parts();
        let body = read_body(body, limit).await?;
        Ok(Self::from_parts(parts, body))
    }

    /// Mark this request as self-issued. Handler failures will propagate raw.
    pub fn into_internal(mut self) -> Self {
        self.internal = true;
        self
    }

    pub fn is_internal(&self) -> bool {
        self.internal
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn method(&self) -> &Method {
        &self.head.method
    }

    pub fn uri(&self) -> &Uri {
        &self.head.uri
    }

    pub fn path(&self) -> &str {
        self.head.path()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.head.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.head.header(name)
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Deserialize the body as JSON.
    pub fn json<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        serde_json::from_slice(&self.body).map_err(|e| ApiError::bad_request(format!("invalid JSON body: {e}")))
    }

    /// Negotiated version and format; set when dispatch starts.
    pub fn accept(&self) -> Option<&NegotiatedAccept> {
        self.accept.as_ref()
    }

    pub fn version(&self) -> Option<&str> {
        self.accept.as_ref().map(|a| a.version.as_str())
    }

    pub fn format(&self) -> Option<&str> {
        self.accept.as_ref().map(|a| a.format.as_str())
    }

    /// Route the engine matched, if matching has happened.
    pub fn matched_route(&self) -> Option<&MatchedRoute> {
        self.matched.get()
    }

    /// Value of a matched URI parameter.
    pub fn param(&self, name: &str) -> Option<&str> {
        self.matched.get()?.params.get(name).map(String::as_str)
    }

    pub(crate) fn set_accept(&mut self, accept: NegotiatedAccept) {
        self.accept = Some(accept);
    }

    pub(crate) fn route_slot(&self) -> RouteSlot {
        Arc::clone(&self.matched)
    }

    /// Record the route the engine matched. Only the first binding is kept.
    pub fn bind_route(&self, record: Arc<RouteRecord>, params: RouteParams) {
        if self.matched.set(MatchedRoute { record, params }).is_err() {
            tracing::warn!(request_id = %self.head.request_id, "Route already bound for request");
        }
    }
}

impl From<Request<Bytes>> for ApiRequest {
    fn from(request: Request<Bytes>) -> Self {
        let (parts, body) = request.into_parts();
        Self::from_parts(parts, body)
    }
}

/// Collect a body of at most `limit` bytes.
///
/// Exceeding the limit is a 413; any other read failure is a 400.
pub async fn read_body(body: Body, limit: usize) -> Result<Bytes, ApiError> {
    match Limited::new(body, limit).collect().await {
        Ok(collected) => Ok(collected.to_bytes()),
        Err(error) if error.is::<LengthLimitError>() => Err(ApiError::http(
            StatusCode::PAYLOAD_TOO_LARGE,
            format!("request body exceeds {limit} bytes"),
        )),
        Err(error) => Err(ApiError::bad_request(format!("unreadable request body: {error}"))),
    }
}
