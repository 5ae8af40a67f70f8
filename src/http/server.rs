//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the dispatcher mounted as the fallback
//! - Wire up middleware (tracing, timeout, request ID)
//! - Buffer request bodies within the configured limit
//! - Bind server to listener and shut down gracefully

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Body;
use axum::extract::State;
use axum::http::Request;
use axum::response::Response;
use axum::Router;
use tokio::net::TcpListener;
use tower_http::request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;

use crate::config::ApiConfig;
use crate::dispatch::Dispatcher;
use crate::http::request::{read_body, ApiRequest, RequestHead};
use crate::routing::RouteEngine;

/// Application state injected into the handler.
pub struct AppState<E> {
    pub dispatcher: Arc<Dispatcher<E>>,
    pub max_body_bytes: usize,
}

impl<E> Clone for AppState<E> {
    fn clone(&self) -> Self {
        Self {
            dispatcher: Arc::clone(&self.dispatcher),
            max_body_bytes: self.max_body_bytes,
        }
    }
}

/// HTTP transport for a [`Dispatcher`].
pub struct HttpServer<E> {
    router: Router,
    dispatcher: Arc<Dispatcher<E>>,
}

impl<E: RouteEngine> HttpServer<E> {
    /// Create a new HTTP server with the given configuration.
    pub fn new(dispatcher: Dispatcher<E>, config: &ApiConfig) -> Self {
        let dispatcher = Arc::new(dispatcher);
        let state = AppState {
            dispatcher: Arc::clone(&dispatcher),
            max_body_bytes: config.router.max_body_bytes,
        };

        Self {
            router: Self::build_router(config, state),
            dispatcher,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &ApiConfig, state: AppState<E>) -> Router {
        Router::new()
            .fallback(dispatch_handler::<E>)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.request_secs)))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled Axum router, for embedding or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher<E>> {
        &self.dispatcher
    }

    /// Run the server until Ctrl+C.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        self.run_until(listener, shutdown_signal()).await
    }

    /// Run the server until `shutdown` resolves, then drain in-flight requests.
    pub async fn run_until<F>(self, listener: TcpListener, shutdown: F) -> Result<(), std::io::Error>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            routes = self.dispatcher.engine().routes(None).len(),
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown)
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Fallback handler: every request goes through the dispatcher.
async fn dispatch_handler<E: RouteEngine>(State(state): State<AppState<E>>, request: Request<Body>) -> Response {
    let (parts, body) = request.into_parts();
    let request = match read_body(body, state.max_body_bytes).await {
        Ok(body) => ApiRequest::from_parts(parts, body),
        Err(error) => {
            tracing::warn!(error = %error, "Rejected request body");
            return state.dispatcher.reject(error, &RequestHead::from_parts(&parts)).await;
        }
    };

    // Requests arriving over the wire are never internal, so this only errs
    // if a custom engine breaks that contract.
    let head = request.head().clone();
    match state.dispatcher.dispatch(request).await {
        Ok(response) => response,
        Err(error) => state.dispatcher.reject(error, &head).await,
    }
}

/// Wait for shutdown signal (Ctrl+C).
async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to install Ctrl+C handler");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
