//! Exception policy: turn an [`ApiError`] into a response.

use async_trait::async_trait;
use axum::http::header::{HeaderValue, ALLOW};
use serde_json::{json, Map, Value};

use crate::exception::ApiError;
use crate::http::response::ApiResponse;
use crate::observability::metrics;

/// Converts failures of external requests into responses.
#[async_trait]
pub trait ExceptionHandler: Send + Sync {
    /// Log and count the failure. Called once per handled error.
    fn report(&self, error: &ApiError) {
        metrics::record_failure(error.kind());
        if error.status().is_server_error() {
            tracing::error!(kind = error.kind(), error = %error, "Request failed");
        } else {
            tracing::warn!(kind = error.kind(), error = %error, "Request rejected");
        }
    }

    /// Produce a best-effort response. Never fails.
    async fn handle(&self, error: ApiError) -> ApiResponse;
}

/// JSON body `{"message", "status_code"}`, plus `debug` details for internal
/// errors when enabled.
#[derive(Debug, Clone, Default)]
pub struct DefaultExceptionHandler {
    debug: bool,
}

impl DefaultExceptionHandler {
    pub fn new(debug: bool) -> Self {
        Self { debug }
    }

    fn body(&self, error: &ApiError) -> Value {
        let status = error.status();
        let mut body = Map::new();

        let message = match error {
            ApiError::Internal(_) => status
                .canonical_reason()
                .unwrap_or("Internal Server Error")
                .to_string(),
            other => other.to_string(),
        };
        body.insert("message".into(), Value::String(message));
        body.insert("status_code".into(), json!(status.as_u16()));

        if let ApiError::MethodNotAllowed { allowed, .. } = error {
            let allowed: Vec<&str> = allowed.iter().map(|m| m.as_str()).collect();
            body.insert("errors".into(), json!({ "allowed_methods": allowed }));
        }

        if self.debug {
            if let ApiError::Internal(source) = error {
                let chain: Vec<String> = source.chain().map(ToString::to_string).collect();
                body.insert("debug".into(), json!({ "chain": chain }));
            }
        }

        Value::Object(body)
    }
}

#[async_trait]
impl ExceptionHandler for DefaultExceptionHandler {
    async fn handle(&self, error: ApiError) -> ApiResponse {
        let mut response = ApiResponse::new(error.status()).with_value(self.body(&error));

        if let ApiError::MethodNotAllowed { allowed, .. } = &error {
            let allow = allowed
                .iter()
                .map(|m| m.as_str())
                .collect::<Vec<_>>()
                .join(", ");
            if let Ok(value) = HeaderValue::from_str(&allow) {
                response.headers_mut().insert(ALLOW, value);
            }
        }

        response
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::http::response::Content;
    use axum::http::{Method, StatusCode};

    fn value(response: &ApiResponse) -> &Value {
        match response.content() {
            Content::Value(value) => value,
            other => panic!("expected structured content, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_not_found_body() {
        let handler = DefaultExceptionHandler::default();
        let response = handler
            .handle(ApiError::NotFound {
                method: Method::GET,
                path: "/nope".into(),
            })
            .await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(value(&response)["status_code"], 404);
        assert_eq!(value(&response)["message"], "no route matches GET /nope");
    }

    #[tokio::test]
    async fn test_method_not_allowed_sets_allow() {
        let handler = DefaultExceptionHandler::default();
        let response = handler
            .handle(ApiError::MethodNotAllowed {
                method: Method::DELETE,
                allowed: vec![Method::GET, Method::HEAD],
            })
            .await;

        assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(response.headers()[ALLOW], "GET, HEAD");
        assert_eq!(value(&response)["errors"]["allowed_methods"][1], "HEAD");
    }

    #[tokio::test]
    async fn test_internal_details_only_in_debug() {
        let hidden = DefaultExceptionHandler::new(false)
            .handle(ApiError::internal("pool exhausted"))
            .await;
        assert_eq!(value(&hidden)["message"], "Internal Server Error");
        assert!(value(&hidden).get("debug").is_none());

        let shown = DefaultExceptionHandler::new(true)
            .handle(ApiError::internal("pool exhausted"))
            .await;
        assert_eq!(value(&shown)["debug"]["chain"][0], "pool exhausted");
    }
}
