//! Route storage and execution.
//!
//! # Responsibilities
//! - Store registered routes indexed by version
//! - Find the route for a request under one version and run its handler
//! - Distinguish "no such path" (404) from "path exists, wrong method" (405)
//! - Expose the table for introspection and hot swapping
//!
//! # Design Decisions
//! - The table is an immutable snapshot behind `ArcSwap`; readers never lock
//! - Patterns are compiled at registration, so bad constraints fail at startup
//! - First registered match wins within a version
//! - Handler references are resolved through a `HandlerRegistry` at request time

use std::collections::BTreeMap;
use std::sync::Arc;

use arc_swap::ArcSwap;
use async_trait::async_trait;
use axum::http::Method;

use crate::exception::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::HandlerOutput;
use crate::routing::error::RouterError;
use crate::routing::matcher::{HostMatcher, Matcher, UriPattern};
use crate::routing::route::{BoxedHandler, HandlerRegistry, RouteId, RouteRecord};

/// Storage and lookup backend fed by the [`Router`](crate::routing::Router).
#[async_trait]
pub trait RouteEngine: Send + Sync + 'static {
    /// Opaque copy of the whole route table.
    type Snapshot: Clone + Send + Sync;

    /// Store a route under every version it declares.
    fn add_route(&mut self, record: RouteRecord) -> Result<RouteId, RouterError>;

    /// Set the full name of a registered route.
    fn name_route(&mut self, id: RouteId, name: &str);

    /// Find the route for `request` under `version`, bind it to the request and run it.
    async fn find_and_execute(&self, request: ApiRequest, version: &str) -> Result<HandlerOutput, ApiError>;

    /// Routes registered for one version, or all of them.
    fn routes(&self, version: Option<&str>) -> Vec<Arc<RouteRecord>>;

    fn raw_routes(&self) -> Self::Snapshot;

    fn set_raw_routes(&self, routes: Self::Snapshot);
}

#[derive(Debug)]
struct CompiledRoute {
    record: Arc<RouteRecord>,
    pattern: UriPattern,
    host: Option<HostMatcher>,
}

/// Snapshot of every route known to a [`MemoryEngine`].
#[derive(Debug, Clone, Default)]
pub struct RouteTable {
    routes: Vec<Arc<CompiledRoute>>,
    by_version: BTreeMap<String, Vec<usize>>,
}

impl RouteTable {
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    fn insert(&mut self, route: CompiledRoute) -> RouteId {
        let index = self.routes.len();
        for version in &route.record.versions {
            self.by_version.entry(version.clone()).or_default().push(index);
        }
        self.routes.push(Arc::new(route));
        RouteId(index)
    }

    fn candidates<'a>(&'a self, version: &str) -> impl Iterator<Item = &'a CompiledRoute> + 'a {
        self.by_version
            .get(version)
            .into_iter()
            .flatten()
            .filter_map(move |&index| self.routes.get(index).map(Arc::as_ref))
    }
}

/// In-process reference engine.
#[derive(Debug, Default)]
pub struct MemoryEngine {
    table: ArcSwap<RouteTable>,
    handlers: HandlerRegistry,
}

impl MemoryEngine {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_handlers(handlers: HandlerRegistry) -> Self {
        Self {
            table: ArcSwap::default(),
            handlers,
        }
    }

    pub fn handlers_mut(&mut self) -> &mut HandlerRegistry {
        &mut self.handlers
    }

    fn resolve_handler(&self, record: &RouteRecord) -> Result<BoxedHandler, ApiError> {
        if let Some(handler) = &record.handler {
            return Ok(Arc::clone(handler));
        }
        let reference = record
            .action
            .uses
            .as_deref()
            .ok_or_else(|| ApiError::internal(format!("route `{}` has no handler", record.uri)))?;
        self.handlers
            .get(reference)
            .ok_or_else(|| ApiError::internal(format!("handler `{reference}` is not registered")))
    }
}

#[async_trait]
impl RouteEngine for MemoryEngine {
    type Snapshot = Arc<RouteTable>;

    fn add_route(&mut self, record: RouteRecord) -> Result<RouteId, RouterError> {
        let pattern = UriPattern::compile(&record.uri, &record.action.wheres)?;
        let host = record.action.trimmed_domain().map(HostMatcher::new);

        let mut table = RouteTable::clone(&self.table.load());
        let id = table.insert(CompiledRoute {
            record: Arc::new(record),
            pattern,
            host,
        });
        self.table.store(Arc::new(table));
        Ok(id)
    }

    fn name_route(&mut self, id: RouteId, name: &str) {
        let mut table = RouteTable::clone(&self.table.load());
        let Some(route) = table.routes.get_mut(id.0) else {
            tracing::warn!(route_id = id.0, name = %name, "Cannot name unknown route");
            return;
        };

        let mut record = RouteRecord::clone(&route.record);
        record.action.name = Some(name.to_string());
        *route = Arc::new(CompiledRoute {
            record: Arc::new(record),
            pattern: route.pattern.clone(),
            host: route.host.clone(),
        });
        self.table.store(Arc::new(table));
    }

    async fn find_and_execute(&self, request: ApiRequest, version: &str) -> Result<HandlerOutput, ApiError> {
        let table = self.table.load_full();
        let head = request.head();
        let mut allowed: Vec<Method> = Vec::new();

        let mut found = None;
        for route in table.candidates(version) {
            if route.host.as_ref().is_some_and(|host| !host.matches(head)) {
                continue;
            }
            let Some(params) = route.pattern.captures(head.path()) else {
                continue;
            };
            if route.record.allows(&head.method) {
                found = Some((Arc::clone(&route.record), params));
                break;
            }
            for method in &route.record.methods {
                if !allowed.contains(method) {
                    allowed.push(method.clone());
                }
            }
        }

        let Some((record, params)) = found else {
            if allowed.is_empty() {
                return Err(ApiError::NotFound {
                    method: head.method.clone(),
                    path: head.path().to_string(),
                });
            }
            return Err(ApiError::MethodNotAllowed {
                method: head.method.clone(),
                allowed,
            });
        };

        tracing::debug!(
            request_id = %head.request_id,
            version = %version,
            uri = %record.uri,
            "Route matched"
        );

        let handler = self.resolve_handler(&record)?;
        request.bind_route(record, params);
        handler.call(request).await
    }

    fn routes(&self, version: Option<&str>) -> Vec<Arc<RouteRecord>> {
        let table = self.table.load();
        match version {
            Some(version) => table.candidates(version).map(|r| Arc::clone(&r.record)).collect(),
            None => table.routes.iter().map(|r| Arc::clone(&r.record)).collect(),
        }
    }

    fn raw_routes(&self) -> Self::Snapshot {
        self.table.load_full()
    }

    fn set_raw_routes(&self, routes: Self::Snapshot) {
        tracing::info!(routes = routes.len(), "Route table replaced");
        self.table.store(routes);
    }
}
