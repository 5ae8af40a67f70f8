//! Request-time error taxonomy.

use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Errors raised while negotiating, routing, executing or formatting a request.
#[derive(Debug, Error)]
pub enum ApiError {
    /// No route is registered for the path under the negotiated version.
    #[error("no route matches {method} {path}")]
    NotFound { method: Method, path: String },

    /// The path matched but not for this method.
    #[error("method {method} is not allowed for this route")]
    MethodNotAllowed { method: Method, allowed: Vec<Method> },

    /// No formatter is registered for the requested format.
    #[error("unable to format response as `{format}`")]
    NotAcceptable { format: String },

    /// The request could not be understood.
    #[error("{0}")]
    BadRequest(String),

    /// Handler-chosen status with a client-facing message.
    #[error("{message}")]
    Http { status: StatusCode, message: String },

    /// Anything else. Details are only exposed in debug mode.
    #[error(transparent)]
    Internal(#[from] anyhow::Error),
}

impl ApiError {
    /// Build an error with an explicit status.
    pub fn http(status: StatusCode, message: impl Into<String>) -> Self {
        ApiError::Http {
            status,
            message: message.into(),
        }
    }

    /// Build a 400.
    pub fn bad_request(message: impl Into<String>) -> Self {
        ApiError::BadRequest(message.into())
    }

    /// Build a 500 from a plain message.
    pub fn internal(message: impl std::fmt::Display) -> Self {
        ApiError::Internal(anyhow::anyhow!("{}", message))
    }

    /// HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
            ApiError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            ApiError::NotAcceptable { .. } => StatusCode::NOT_ACCEPTABLE,
            ApiError::BadRequest(_) => StatusCode::BAD_REQUEST,
            ApiError::Http { status, .. } => *status,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Short label used for metrics and log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            ApiError::NotFound { .. } => "not_found",
            ApiError::MethodNotAllowed { .. } => "method_not_allowed",
            ApiError::NotAcceptable { .. } => "not_acceptable",
            ApiError::BadRequest(_) => "bad_request",
            ApiError::Http { .. } => "http",
            ApiError::Internal(_) => "internal",
        }
    }
}

/// Bare plain-text rendering for callers that embed the crate without an
/// exception handler.
impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match &self {
            ApiError::Internal(_) => status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string(),
            other => other.to_string(),
        };
        (status, message).into_response()
    }
}
