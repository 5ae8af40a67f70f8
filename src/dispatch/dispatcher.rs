//! Request dispatch pipeline.
//!
//! # Responsibilities
//! - Negotiate version and format from the `Accept` header
//! - Bind the request as the task's current request for the whole dispatch
//! - Ask the engine to find and execute the route for the negotiated version
//! - Recover handler failures of external requests; pass internal ones through
//! - Hand every result to the finalizer
//!
//! # Design Decisions
//! - One `DispatchContext` per call; nothing per-request is shared
//! - The dispatch counter is atomic and counts attempts, before execution
//! - No retries and no timeouts here; callers wrap `dispatch` if they need them

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::response::Response;
use tracing::Instrument;

use crate::config::{NegotiationConfig, RouterConfig};
use crate::dispatch::context::DispatchContext;
use crate::dispatch::finalizer::ResponseFinalizer;
use crate::exception::{ApiError, DefaultExceptionHandler, ExceptionHandler};
use crate::format::FormatterRegistry;
use crate::http::request::{ApiRequest, RequestHead};
use crate::negotiation::AcceptNegotiator;
use crate::observability::metrics;
use crate::routing::{RouteEngine, RouterError};

tokio::task_local! {
    static CURRENT_REQUEST: RequestHead;
}

/// The request being dispatched on this task, if any.
pub fn current_request() -> Option<RequestHead> {
    CURRENT_REQUEST.try_with(Clone::clone).ok()
}

/// Runs requests through negotiation, the engine and finalization.
pub struct Dispatcher<E> {
    engine: Arc<E>,
    negotiator: AcceptNegotiator,
    finalizer: ResponseFinalizer,
    exceptions: Arc<dyn ExceptionHandler>,
    dispatched: AtomicU64,
}

impl<E: RouteEngine> Dispatcher<E> {
    pub fn builder(engine: E) -> DispatcherBuilder<E> {
        DispatcherBuilder::new(engine)
    }

    pub fn engine(&self) -> &Arc<E> {
        &self.engine
    }

    pub fn negotiator(&self) -> &AcceptNegotiator {
        &self.negotiator
    }

    /// Number of dispatches started so far.
    pub fn dispatched(&self) -> u64 {
        self.dispatched.load(Ordering::Relaxed)
    }

    /// Serve one request.
    ///
    /// External requests always yield `Ok`. Internal requests get the raw
    /// error back when the engine or handler fails.
    pub async fn dispatch(&self, mut request: ApiRequest) -> Result<Response, ApiError> {
        let start = Instant::now();
        let accept = self.negotiator.parse(request.headers());
        request.set_accept(accept.clone());

        let sequence = self.dispatched.fetch_add(1, Ordering::Relaxed) + 1;
        let internal = request.is_internal();
        let context = DispatchContext::new(request.head().clone(), accept, request.route_slot(), sequence);

        let span = tracing::info_span!(
            "dispatch",
            request_id = %context.head().request_id,
            method = %context.head().method,
            path = %context.head().path(),
            version = %context.accept().version,
            format = %context.accept().format,
            internal,
        );

        let run = async {
            tracing::debug!(sequence, "Dispatching request");

            let version = context.accept().version.as_str();
            let output = match self.engine.find_and_execute(request, version).await {
                Ok(output) => output,
                Err(error) if internal => {
                    tracing::debug!(kind = error.kind(), error = %error, "Internal request failed");
                    metrics::record_failure(error.kind());
                    return Err(error);
                }
                Err(error) => {
                    self.exceptions.report(&error);
                    self.exceptions.handle(error).await.into()
                }
            };

            let response = self.finalizer.finalize(output, &context).await;
            metrics::record_dispatch(version, response.status().as_u16(), start);
            Ok(response)
        };

        CURRENT_REQUEST
            .scope(context.head().clone(), run)
            .instrument(span)
            .await
    }

    /// Render a failure raised before dispatch could start, such as an
    /// unreadable body, through the configured exception handler.
    pub async fn reject(&self, error: ApiError, head: &RequestHead) -> Response {
        let span = tracing::info_span!(
            "reject",
            request_id = %head.request_id,
            method = %head.method,
            path = %head.path(),
        );
        self.finalizer.render_failure(error, head).instrument(span).await
    }
}

impl<E> std::fmt::Debug for Dispatcher<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("negotiator", &self.negotiator)
            .field("finalizer", &self.finalizer)
            .field("dispatched", &self.dispatched)
            .finish_non_exhaustive()
    }
}

/// Assembles a [`Dispatcher`] from configuration and collaborators.
pub struct DispatcherBuilder<E> {
    engine: E,
    negotiation: NegotiationConfig,
    router: RouterConfig,
    formatters: FormatterRegistry,
    exceptions: Option<Arc<dyn ExceptionHandler>>,
}

impl<E: RouteEngine> DispatcherBuilder<E> {
    pub fn new(engine: E) -> Self {
        Self {
            engine,
            negotiation: NegotiationConfig::default(),
            router: RouterConfig::default(),
            formatters: FormatterRegistry::with_defaults(),
            exceptions: None,
        }
    }

    pub fn negotiation(mut self, config: NegotiationConfig) -> Self {
        self.negotiation = config;
        self
    }

    pub fn router(mut self, config: RouterConfig) -> Self {
        self.router = config;
        self
    }

    pub fn formatters(mut self, formatters: FormatterRegistry) -> Self {
        self.formatters = formatters;
        self
    }

    pub fn exception_handler(mut self, handler: impl ExceptionHandler + 'static) -> Self {
        self.exceptions = Some(Arc::new(handler));
        self
    }

    pub fn build(self) -> Result<Dispatcher<E>, RouterError> {
        let negotiator = AcceptNegotiator::new(&self.negotiation, self.formatters.formats())?;
        let exceptions = self
            .exceptions
            .unwrap_or_else(|| Arc::new(DefaultExceptionHandler::new(self.router.debug)));

        let finalizer = ResponseFinalizer::new(
            self.formatters,
            self.negotiation.default_format.clone(),
            Arc::clone(&exceptions),
            self.router.max_body_bytes,
        );

        Ok(Dispatcher {
            engine: Arc::new(self.engine),
            negotiator,
            finalizer,
            exceptions,
            dispatched: AtomicU64::new(0),
        })
    }
}
