//! Versioned API demo server.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────────────┐
//!                      │                    VERSIONED API                      │
//!                      │                                                       │
//!   Client Request     │  ┌─────────┐   ┌──────────────┐   ┌───────────────┐  │
//!   ───────────────────┼─▶│  http   │──▶│ negotiation  │──▶│   dispatch    │  │
//!                      │  │ server  │   │   (Accept)   │   │  dispatcher   │  │
//!                      │  └─────────┘   └──────────────┘   └───────┬───────┘  │
//!                      │                                           │          │
//!                      │                                           ▼          │
//!                      │                                   ┌───────────────┐  │
//!                      │                                   │    routing    │  │
//!                      │                                   │ engine+handler│  │
//!                      │                                   └───────┬───────┘  │
//!                      │                                           │          │
//!   Client Response    │  ┌─────────┐   ┌──────────────┐           ▼          │
//!   ◀──────────────────┼──│ format  │◀──│  finalizer   │◀── output / error    │
//!                      │  │ + ETag  │   │ + exception  │                      │
//!                      │  └─────────┘   └──────────────┘                      │
//!                      │                                                       │
//!                      │  Cross-cutting: config, observability                │
//!                      └──────────────────────────────────────────────────────┘
//! ```
//!
//! Configuration is read from the TOML file named by `API_CONFIG`, or defaults.

use std::path::PathBuf;

use tokio::net::TcpListener;

use versioned_api::config::{load_config, ApiConfig};
use versioned_api::exception::ApiError;
use versioned_api::http::{ApiRequest, ApiResponse, HttpServer};
use versioned_api::observability::logging;
use versioned_api::routing::{GroupAttributes, HandlerRegistry, MemoryEngine, RouteAction, Router, RouterError};
use versioned_api::Dispatcher;

fn handlers() -> HandlerRegistry {
    HandlerRegistry::new()
        .with("App::V1::Users@index", |_request: ApiRequest| async {
            Ok::<_, ApiError>(ApiResponse::ok(serde_json::json!([
                {"id": 1, "name": "ada"},
                {"id": 2, "name": "grace"}
            ])))
        })
        .with("App::V1::Users@show", |request: ApiRequest| async move {
            let id: u64 = request
                .param("id")
                .and_then(|id| id.parse().ok())
                .ok_or_else(|| ApiError::bad_request("invalid user id"))?;
            Ok::<_, ApiError>(ApiResponse::ok(serde_json::json!({"id": id})))
        })
        .with("App::V2::Users@index", |_request: ApiRequest| async {
            Ok::<_, ApiError>(ApiResponse::ok(serde_json::json!({
                "data": [{"id": 1, "name": "ada"}, {"id": 2, "name": "grace"}],
                "meta": {"total": 2}
            })))
        })
}

fn declare(router: &mut Router<MemoryEngine>) -> Result<(), RouterError> {
    router.version_with(["v1"], GroupAttributes::new().namespace("App::V1").name("v1."), |r| {
        r.get("users", "Users@index")?.name("users.index");
        r.group(GroupAttributes::new().constrain("id", "[0-9]+"), |r| {
            r.get("users/{id}", "Users@show")?.name("users.show");
            Ok(())
        })
    })?;

    router.version_with(["v2"], GroupAttributes::new().namespace("App::V2"), |r| {
        r.get("users", "Users@index")?;
        r.get(
            "ping",
            RouteAction::handler(|_request: ApiRequest| async {
                Ok::<_, ApiError>(ApiResponse::no_content())
            })
            .with_attributes(GroupAttributes::new().conditional_request(false)),
        )?;
        Ok(())
    })
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = match std::env::var_os("API_CONFIG").map(PathBuf::from) {
        Some(path) => load_config(&path)?,
        None => ApiConfig::default(),
    };

    logging::init(&config.observability)?;

    tracing::info!("versioned-api v0.1.0 starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        default_version = %config.negotiation.default_version,
        default_format = %config.negotiation.default_format,
        request_timeout_secs = config.timeouts.request_secs,
        "Configuration loaded"
    );

    let mut router = Router::new(MemoryEngine::with_handlers(handlers()), config.router.clone());
    declare(&mut router)?;
    tracing::info!(versions = ?router.versions(), "Routes declared");

    let dispatcher = Dispatcher::builder(router.into_engine()?)
        .negotiation(config.negotiation.clone())
        .router(config.router.clone())
        .build()?;

    // Bind TCP listener
    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let server = HttpServer::new(dispatcher, &config);
    server.run(listener).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
