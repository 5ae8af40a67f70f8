//! Route records, actions and handlers.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::http::Method;

use crate::exception::ApiError;
use crate::http::request::ApiRequest;
use crate::http::response::HandlerOutput;
use crate::routing::attributes::GroupAttributes;

/// Business logic bound to a route.
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    async fn call(&self, request: ApiRequest) -> Result<HandlerOutput, ApiError>;
}

#[async_trait]
impl<F, Fut, O> Handler for F
where
    F: Fn(ApiRequest) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<O, ApiError>> + Send + 'static,
    O: Into<HandlerOutput> + Send + 'static,
{
    async fn call(&self, request: ApiRequest) -> Result<HandlerOutput, ApiError> {
        (self)(request).await.map(Into::into)
    }
}

pub type BoxedHandler = Arc<dyn Handler>;

/// Handlers addressed by reference string (`Namespace::Controller@action`).
#[derive(Clone, Default)]
pub struct HandlerRegistry {
    handlers: BTreeMap<String, BoxedHandler>,
}

impl HandlerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, reference: impl Into<String>, handler: impl Handler) {
        self.handlers.insert(reference.into(), Arc::new(handler));
    }

    pub fn with(mut self, reference: impl Into<String>, handler: impl Handler) -> Self {
        self.register(reference, handler);
        self
    }

    pub fn get(&self, reference: &str) -> Option<BoxedHandler> {
        self.handlers.get(reference).cloned()
    }

    pub fn references(&self) -> impl Iterator<Item = &str> {
        self.handlers.keys().map(String::as_str)
    }
}

impl fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.handlers.keys()).finish()
    }
}

/// What a route declaration binds: attributes plus, optionally, a direct handler.
#[derive(Clone, Default)]
pub struct RouteAction {
    pub(crate) attributes: GroupAttributes,
    pub(crate) handler: Option<BoxedHandler>,
}

impl RouteAction {
    /// Bind by handler reference, resolved through the engine's registry.
    pub fn uses(reference: impl Into<String>) -> Self {
        Self {
            attributes: GroupAttributes::new().uses(reference),
            handler: None,
        }
    }

    /// Bind a handler directly.
    pub fn handler(handler: impl Handler) -> Self {
        Self {
            attributes: GroupAttributes::new(),
            handler: Some(Arc::new(handler)),
        }
    }

    /// Set route-level attributes, keeping any reference already bound.
    pub fn with_attributes(mut self, attributes: GroupAttributes) -> Self {
        let uses = self.attributes.uses.take();
        self.attributes = attributes;
        if self.attributes.uses.is_none() {
            self.attributes.uses = uses;
        }
        self
    }

    pub fn attributes(&self) -> &GroupAttributes {
        &self.attributes
    }
}

impl From<&str> for RouteAction {
    fn from(reference: &str) -> Self {
        RouteAction::uses(reference)
    }
}

impl From<String> for RouteAction {
    fn from(reference: String) -> Self {
        RouteAction::uses(reference)
    }
}

impl From<GroupAttributes> for RouteAction {
    fn from(attributes: GroupAttributes) -> Self {
        Self {
            attributes,
            handler: None,
        }
    }
}

impl fmt::Debug for RouteAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteAction")
            .field("attributes", &self.attributes)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}

/// Engine-assigned identifier of a registered route.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RouteId(pub usize);

/// A normalized route declaration, immutable once registered.
#[derive(Clone)]
pub struct RouteRecord {
    pub methods: Vec<Method>,
    /// Always starts with `/`; no trailing slash except the root.
    pub uri: String,
    pub versions: BTreeSet<String>,
    /// Fully merged attributes, including the inherited ones.
    pub action: GroupAttributes,
    pub handler: Option<BoxedHandler>,
}

impl RouteRecord {
    pub fn name(&self) -> Option<&str> {
        self.action.name.as_deref()
    }

    pub fn allows(&self, method: &Method) -> bool {
        self.methods.contains(method)
    }

    pub fn is_versioned(&self, version: &str) -> bool {
        self.versions.contains(version)
    }
}

impl fmt::Debug for RouteRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RouteRecord")
            .field("methods", &self.methods)
            .field("uri", &self.uri)
            .field("versions", &self.versions)
            .field("action", &self.action)
            .field("handler", &self.handler.is_some())
            .finish()
    }
}
