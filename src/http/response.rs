//! Canonical response shape.
//!
//! # Responsibilities
//! - Hold status, headers and a body that may still need formatting
//! - Adapt foreign (already-built axum) responses once, at the finalization boundary
//! - Morph structured content into a wire format via a [`Formatter`]
//! - Downgrade to 304 Not Modified while keeping the validator
//!
//! # Design Decisions
//! - Structured content stays a `serde_json::Value` until a formatter is chosen
//! - Raw bytes and empty bodies are already in final wire form
//! - Foreign responses are buffered so validators can be computed from their body

use axum::body::{Body, Bytes};
use axum::http::header::{self, HeaderMap, HeaderName, HeaderValue};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use serde_json::Value;

use crate::exception::ApiError;
use crate::format::{FormatContext, Formatter};
use crate::http::request::RequestHead;

/// Body of an [`ApiResponse`].
#[derive(Debug, Clone, PartialEq)]
pub enum Content {
    /// No body.
    Empty,
    /// Structured content awaiting a formatter.
    Value(Value),
    /// Final wire bytes.
    Raw(Bytes),
}

/// Response produced by handlers and the exception policy.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    status: StatusCode,
    headers: HeaderMap,
    content: Content,
}

impl ApiResponse {
    /// Empty response with the given status.
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            content: Content::Empty,
        }
    }

    /// 200 with structured content.
    pub fn ok(value: impl Into<Value>) -> Self {
        Self::new(StatusCode::OK).with_value(value)
    }

    /// 201 with structured content.
    pub fn created(value: impl Into<Value>) -> Self {
        Self::new(StatusCode::CREATED).with_value(value)
    }

    /// 204.
    pub fn no_content() -> Self {
        Self::new(StatusCode::NO_CONTENT)
    }

    /// 200 from any serializable item.
    pub fn item<T: Serialize>(item: &T) -> Result<Self, ApiError> {
        let value = serde_json::to_value(item).map_err(|e| ApiError::Internal(e.into()))?;
        Ok(Self::ok(value))
    }

    /// Replace the body with structured content.
    pub fn with_value(mut self, value: impl Into<Value>) -> Self {
        self.content = Content::Value(value.into());
        self
    }

    /// Replace the body with final bytes.
    pub fn with_raw(mut self, bytes: impl Into<Bytes>) -> Self {
        self.content = Content::Raw(bytes.into());
        self
    }

    /// Replace the status.
    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Set a header, replacing previous values.
    pub fn with_header(mut self, name: HeaderName, value: HeaderValue) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    pub fn content(&self) -> &Content {
        &self.content
    }

    /// True for 2xx.
    pub fn is_successful(&self) -> bool {
        self.status.is_success()
    }

    /// True when no formatter is needed before sending.
    pub fn is_final(&self) -> bool {
        !matches!(self.content, Content::Value(_))
    }

    /// Final body bytes. Structured content that has not been morphed yields `None`.
    pub fn body(&self) -> Option<&[u8]> {
        match &self.content {
            Content::Empty => Some(&[][..]),
            Content::Raw(bytes) => Some(bytes.as_ref()),
            Content::Value(_) => None,
        }
    }

    /// Adapt a response built outside this crate into the canonical shape.
    pub async fn from_existing(response: Response, limit: usize) -> Result<Self, ApiError> {
        let (parts, body) = response.into_parts();
        let bytes = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| ApiError::Internal(anyhow::Error::new(e).context("buffering response body")))?;

        Ok(Self {
            status: parts.status,
            headers: parts.headers,
            content: if bytes.is_empty() {
                Content::Empty
            } else {
                Content::Raw(bytes)
            },
        })
    }

    /// Transform structured content into the formatter's wire representation.
    ///
    /// The formatter's content type is applied only if the handler did not set one.
    pub fn morph(&mut self, formatter: &dyn Formatter, request: &RequestHead) -> Result<(), ApiError> {
        let Content::Value(value) = &self.content else {
            return Ok(());
        };

        let context = FormatContext::new(request);
        let bytes = formatter.format(value, &context)?;
        if !self.headers.contains_key(header::CONTENT_TYPE) {
            self.headers
                .insert(header::CONTENT_TYPE, HeaderValue::from_static(formatter.content_type(&context)));
        }
        self.content = Content::Raw(bytes);
        Ok(())
    }

    /// Downgrade to 304, dropping the body and entity headers but keeping validators.
    pub fn set_not_modified(&mut self) {
        self.status = StatusCode::NOT_MODIFIED;
        self.content = Content::Empty;
        for name in [
            header::ALLOW,
            header::CONTENT_ENCODING,
            header::CONTENT_LANGUAGE,
            header::CONTENT_LENGTH,
            header::CONTENT_TYPE,
            header::LAST_MODIFIED,
        ] {
            self.headers.remove(name);
        }
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let body = match self.content {
            Content::Empty => Body::empty(),
            Content::Raw(bytes) => Body::from(bytes),
            // Unformatted content only reaches the wire if a caller bypassed the finalizer.
            Content::Value(value) => match serde_json::to_vec(&value) {
                Ok(bytes) => Body::from(bytes),
                Err(_) => return StatusCode::INTERNAL_SERVER_ERROR.into_response(),
            },
        };

        let mut response = Response::new(body);
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

/// What a handler may hand back to the dispatcher.
#[derive(Debug)]
pub enum HandlerOutput {
    /// The crate's canonical shape.
    Api(ApiResponse),
    /// A fully built axum response; adapted during finalization.
    Foreign(Response),
}

impl From<ApiResponse> for HandlerOutput {
    fn from(response: ApiResponse) -> Self {
        HandlerOutput::Api(response)
    }
}

impl From<Response> for HandlerOutput {
    fn from(response: Response) -> Self {
        HandlerOutput::Foreign(response)
    }
}

impl From<Value> for HandlerOutput {
    fn from(value: Value) -> Self {
        HandlerOutput::Api(ApiResponse::ok(value))
    }
}
