//! Response finalization.
//!
//! # Responsibilities
//! - Adapt foreign responses into the canonical shape
//! - Morph structured content with the formatter for the negotiated format
//! - Apply ETag handling for successful responses of conditional routes
//! - Absorb finalization failures into handled error responses
//!
//! # Design Decisions
//! - Finalization never fails; it always yields a wire response
//! - Error responses produced here render with the default format, falling
//!   back to JSON, never with the format that just failed

use std::sync::Arc;

use axum::response::{IntoResponse, Response};

use crate::dispatch::conditional;
use crate::dispatch::context::DispatchContext;
use crate::exception::{ApiError, ExceptionHandler};
use crate::format::{Formatter, FormatterRegistry, JsonFormatter};
use crate::http::request::RequestHead;
use crate::http::response::{ApiResponse, HandlerOutput};
use crate::observability::metrics;

/// Turns handler output into the wire response.
pub struct ResponseFinalizer {
    formatters: FormatterRegistry,
    default_format: String,
    exceptions: Arc<dyn ExceptionHandler>,
    max_body_bytes: usize,
}

impl ResponseFinalizer {
    pub fn new(
        formatters: FormatterRegistry,
        default_format: impl Into<String>,
        exceptions: Arc<dyn ExceptionHandler>,
        max_body_bytes: usize,
    ) -> Self {
        Self {
            formatters,
            default_format: default_format.into(),
            exceptions,
            max_body_bytes,
        }
    }

    pub fn formatters(&self) -> &FormatterRegistry {
        &self.formatters
    }

    /// Produce the wire response for one dispatch.
    pub async fn finalize(&self, output: HandlerOutput, context: &DispatchContext) -> Response {
        let mut response = match output {
            HandlerOutput::Api(response) => response,
            HandlerOutput::Foreign(foreign) => match ApiResponse::from_existing(foreign, self.max_body_bytes).await {
                Ok(response) => response,
                Err(error) => return self.recover(error, context).await,
            },
        };

        if !response.is_final() {
            let format = context.accept().format.as_str();
            let morphed = self
                .formatters
                .get(format)
                .and_then(|formatter| response.morph(formatter.as_ref(), context.head()));
            if let Err(error) = morphed {
                return self.recover(error, context).await;
            }
        }

        if response.is_successful() && context.current_route().is_some_and(|route| route.is_conditional()) {
            if conditional::apply(&mut response, context.head()) {
                metrics::record_not_modified();
                tracing::debug!(request_id = %context.head().request_id, "Not modified");
            }
        }

        response.into_response()
    }

    /// Hand a finalization failure to the exception handler and render the result.
    async fn recover(&self, error: ApiError, context: &DispatchContext) -> Response {
        self.render_failure(error, context.head()).await
    }

    /// Report `error`, let the exception handler shape it, and render it with
    /// the default format.
    pub async fn render_failure(&self, error: ApiError, head: &RequestHead) -> Response {
        self.exceptions.report(&error);
        let mut response = self.exceptions.handle(error).await;

        if !response.is_final() {
            let fallback: Arc<dyn Formatter> = self
                .formatters
                .get(&self.default_format)
                .unwrap_or_else(|_| Arc::new(JsonFormatter));
            if response.morph(fallback.as_ref(), head).is_err() {
                // Default formatter refused the error body; JSON always accepts a Value.
                let _ = response.morph(&JsonFormatter, head);
            }
        }

        response.into_response()
    }
}

impl std::fmt::Debug for ResponseFinalizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResponseFinalizer")
            .field("formatters", &self.formatters)
            .field("default_format", &self.default_format)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exception::DefaultExceptionHandler;
    use crate::http::request::{MatchedRoute, RequestHead, RouteSlot};
    use crate::negotiation::NegotiatedAccept;
    use crate::routing::{GroupAttributes, RouteRecord};
    use axum::body::Bytes;
    use axum::http::header::{CONTENT_TYPE, ETAG, IF_NONE_MATCH};
    use axum::http::{Method, Request, StatusCode};
    use http_body_util::BodyExt;
    use serde_json::json;

    fn finalizer(formatters: FormatterRegistry) -> ResponseFinalizer {
        ResponseFinalizer::new(formatters, "json", Arc::new(DefaultExceptionHandler::default()), 1024)
    }

    fn context(format: &str, conditional: Option<bool>, if_none_match: Option<&str>) -> DispatchContext {
        let mut builder = Request::builder().uri("/users");
        if let Some(tag) = if_none_match {
            builder = builder.header(IF_NONE_MATCH, tag);
        }
        let request = builder.body(Bytes::new()).unwrap();
        let head = RequestHead::from_parts(&request.into_parts().0);

        let slot = RouteSlot::default();
        if let Some(enabled) = conditional {
            let action = GroupAttributes::new().version("v1").conditional_request(enabled);
            let _ = slot.set(MatchedRoute {
                record: Arc::new(RouteRecord {
                    methods: vec![Method::GET],
                    uri: "/users".into(),
                    versions: action.version.clone(),
                    action,
                    handler: None,
                }),
                params: Default::default(),
            });
        }
        DispatchContext::new(head, NegotiatedAccept::new("v1", format), slot, 1)
    }

    async fn body(response: Response) -> Bytes {
        response.into_body().collect().await.unwrap().to_bytes()
    }

    #[tokio::test]
    async fn test_formats_structured_content() {
        let response = finalizer(FormatterRegistry::with_defaults())
            .finalize(ApiResponse::ok(json!({"id": 1})).into(), &context("json", None, None))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        assert!(!response.headers().contains_key(ETAG));
        assert_eq!(body(response).await, br#"{"id":1}"#.as_slice());
    }

    #[tokio::test]
    async fn test_conditional_route_gets_etag_and_304() {
        let finalizer = finalizer(FormatterRegistry::with_defaults());
        let first = finalizer
            .finalize(ApiResponse::ok(json!([1, 2])).into(), &context("json", Some(true), None))
            .await;
        let etag = first.headers()[ETAG].to_str().unwrap().to_string();

        let second = finalizer
            .finalize(ApiResponse::ok(json!([1, 2])).into(), &context("json", Some(true), Some(&etag)))
            .await;
        assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
        assert_eq!(second.headers()[ETAG], etag.as_str());
        assert!(body(second).await.is_empty());
    }

    #[tokio::test]
    async fn test_non_conditional_route_untouched() {
        let response = finalizer(FormatterRegistry::with_defaults())
            .finalize(ApiResponse::ok(json!([1])).into(), &context("json", Some(false), Some("*")))
            .await;
        assert_eq!(response.status(), StatusCode::OK);
        assert!(!response.headers().contains_key(ETAG));
    }

    #[tokio::test]
    async fn test_unknown_format_is_handled_406() {
        let response = finalizer(FormatterRegistry::with_defaults())
            .finalize(ApiResponse::ok(json!({"id": 1})).into(), &context("yaml", None, None))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
        let value: serde_json::Value = serde_json::from_slice(&body(response).await).unwrap();
        assert_eq!(value["status_code"], 406);
    }

    #[tokio::test]
    async fn test_missing_default_formatter_falls_back_to_json() {
        let response = finalizer(FormatterRegistry::new())
            .finalize(ApiResponse::ok(json!({"id": 1})).into(), &context("json", None, None))
            .await;

        assert_eq!(response.status(), StatusCode::NOT_ACCEPTABLE);
        assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    }

    #[tokio::test]
    async fn test_foreign_response_is_adapted() {
        let foreign = (StatusCode::OK, "plain text").into_response();
        let response = finalizer(FormatterRegistry::with_defaults())
            .finalize(foreign.into(), &context("json", Some(true), None))
            .await;

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key(ETAG));
        assert_eq!(body(response).await, "plain text".as_bytes());
    }
}
