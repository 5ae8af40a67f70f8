//! End-to-end tests through the Axum transport, without sockets.

mod common;

use std::sync::Arc;

use axum::body::Body;
use axum::http::header::{ACCEPT, CONTENT_TYPE, ETAG, IF_NONE_MATCH};
use axum::http::{Request, StatusCode};
use serde_json::json;
use tower::ServiceExt;

use versioned_api::config::ApiConfig;
use versioned_api::exception::ApiError;
use versioned_api::http::{ApiRequest, ApiResponse, HttpServer, X_REQUEST_ID};
use versioned_api::routing::{GroupAttributes, HandlerRegistry, MemoryEngine, RouteAction, Router};
use versioned_api::{current_request, Dispatcher};

fn app() -> axum::Router {
    let config = ApiConfig::default();
    let handlers = HandlerRegistry::new().with("Api::Users@index", |_request: ApiRequest| async {
        Ok::<_, ApiError>(ApiResponse::ok(json!([{"id": 1}])))
    });

    let mut router = Router::new(MemoryEngine::with_handlers(handlers), config.router.clone());
    router
        .version_with(["v1"], GroupAttributes::new().prefix("api").namespace("Api"), |r| {
            r.get("users", "Users@index")?;
            r.post(
                "users",
                RouteAction::handler(|request: ApiRequest| async move {
                    let user: serde_json::Value = request.json()?;
                    Ok::<_, ApiError>(ApiResponse::created(user))
                }),
            )?;
            Ok(())
        })
        .unwrap();

    let dispatcher = Dispatcher::builder(router.into_engine().unwrap()).build().unwrap();
    HttpServer::new(dispatcher, &config).router()
}

#[tokio::test]
async fn test_get_through_transport() {
    let response = app()
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header(ACCEPT, "application/vnd.app.v1+json")
                .header(X_REQUEST_ID, "req-42")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(response.headers()[CONTENT_TYPE], "application/json");
    assert_eq!(response.headers()[X_REQUEST_ID], "req-42");
    assert!(response.headers().contains_key(ETAG));
    assert_eq!(common::body_json(response).await, json!([{"id": 1}]));
}

#[tokio::test]
async fn test_not_modified_through_transport() {
    let app = app();
    let first = app
        .clone()
        .oneshot(Request::builder().uri("/api/users").body(Body::empty()).unwrap())
        .await
        .unwrap();
    let etag = first.headers()[ETAG].clone();

    let second = app
        .oneshot(
            Request::builder()
                .uri("/api/users")
                .header(IF_NONE_MATCH, etag.clone())
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(second.status(), StatusCode::NOT_MODIFIED);
    assert_eq!(second.headers()[ETAG], etag);
    assert!(common::body(second).await.is_empty());
}

#[tokio::test]
async fn test_post_body_and_bad_json() {
    let created = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .body(Body::from(r#"{"name":"ada"}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(created.status(), StatusCode::CREATED);
    assert_eq!(common::body_json(created).await["name"], "ada");

    let rejected = app()
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/users")
                .body(Body::from("{"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(rejected.status(), StatusCode::BAD_REQUEST);
    assert_eq!(common::body_json(rejected).await["status_code"], 400);
}

#[tokio::test]
async fn test_unknown_path_is_json_404() {
    let response = app()
        .oneshot(Request::builder().uri("/nowhere").body(Body::empty()).unwrap())
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.headers().contains_key(X_REQUEST_ID));
    assert_eq!(common::body_json(response).await["status_code"], 404);
}

#[tokio::test]
async fn test_concurrent_dispatches_see_their_own_request() {
    let dispatcher = Arc::new(common::dispatcher(|r| {
        r.version(["v1"], |r| {
            r.get(
                "items/{id}",
                RouteAction::handler(|request: ApiRequest| async move {
                    tokio::task::yield_now().await;
                    let current = current_request().map(|head| head.path().to_string());
                    Ok::<_, ApiError>(ApiResponse::ok(json!({
                        "current": current,
                        "own": request.path(),
                    })))
                }),
            )?;
            Ok(())
        })
    }));

    let tasks: Vec<_> = (0..16)
        .map(|i| {
            let dispatcher = Arc::clone(&dispatcher);
            tokio::spawn(async move {
                let response = dispatcher
                    .dispatch(common::get(&format!("/items/{i}")))
                    .await
                    .unwrap();
                common::body_json(response).await
            })
        })
        .collect();

    for task in tasks {
        let body = task.await.unwrap();
        assert_eq!(body["current"], body["own"]);
    }
    assert_eq!(dispatcher.dispatched(), 16);
}
