//! Shared fixtures for integration tests.

#![allow(dead_code)]

use axum::body::Bytes;
use axum::http::header::ACCEPT;
use axum::http::{Method, Request};
use axum::response::Response;
use http_body_util::BodyExt;
use serde_json::{json, Value};

use versioned_api::config::RouterConfig;
use versioned_api::exception::ApiError;
use versioned_api::http::{ApiRequest, ApiResponse};
use versioned_api::routing::{MemoryEngine, RouteAction, Router, RouterError};
use versioned_api::Dispatcher;

/// Build a request with an optional Accept header.
pub fn request(method: Method, uri: &str, accept: Option<&str>) -> ApiRequest {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(accept) = accept {
        builder = builder.header(ACCEPT, accept);
    }
    builder.body(Bytes::new()).unwrap().into()
}

pub fn get(uri: &str) -> ApiRequest {
    request(Method::GET, uri, None)
}

/// Handler answering with the negotiated pair and the matched parameters.
pub fn echo() -> RouteAction {
    RouteAction::handler(|request: ApiRequest| async move {
        let params = request
            .matched_route()
            .map(|m| json!(m.params))
            .unwrap_or(Value::Null);
        Ok::<_, ApiError>(ApiResponse::ok(json!({
            "version": request.version(),
            "format": request.format(),
            "path": request.path(),
            "params": params,
        })))
    })
}

/// Handler that always fails with a 500.
pub fn failing() -> RouteAction {
    RouteAction::handler(|_request: ApiRequest| async {
        Err::<ApiResponse, _>(ApiError::internal("storage offline"))
    })
}

/// Declare routes and build a dispatcher with default configuration.
pub fn dispatcher<F>(declare: F) -> Dispatcher<MemoryEngine>
where
    F: FnOnce(&mut Router<MemoryEngine>) -> Result<(), RouterError>,
{
    let mut router = Router::new(MemoryEngine::new(), RouterConfig::default());
    declare(&mut router).unwrap();
    Dispatcher::builder(router.into_engine().unwrap()).build().unwrap()
}

pub async fn body(response: Response) -> Bytes {
    response.into_body().collect().await.unwrap().to_bytes()
}

pub async fn body_json(response: Response) -> Value {
    serde_json::from_slice(&body(response).await).unwrap()
}
