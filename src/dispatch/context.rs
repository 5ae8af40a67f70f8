//! Per-request dispatch state.

use std::collections::BTreeSet;
use std::sync::{Arc, OnceLock};

use axum::http::Method;
use serde_json::Value;

use crate::http::request::{MatchedRoute, RequestHead, RouteParams, RouteSlot};
use crate::negotiation::NegotiatedAccept;
use crate::routing::{GroupAttributes, RouteRecord};

/// State owned by one dispatch. Dropped when the response is returned.
#[derive(Debug)]
pub struct DispatchContext {
    head: RequestHead,
    accept: NegotiatedAccept,
    slot: RouteSlot,
    current: OnceLock<CurrentRoute>,
    sequence: u64,
}

impl DispatchContext {
    pub(crate) fn new(head: RequestHead, accept: NegotiatedAccept, slot: RouteSlot, sequence: u64) -> Self {
        Self {
            head,
            accept,
            slot,
            current: OnceLock::new(),
            sequence,
        }
    }

    pub fn head(&self) -> &RequestHead {
        &self.head
    }

    pub fn accept(&self) -> &NegotiatedAccept {
        &self.accept
    }

    /// Position of this dispatch in the process-wide count, starting at 1.
    pub fn sequence(&self) -> u64 {
        self.sequence
    }

    /// The matched route, built on first access once the engine has bound one.
    pub fn current_route(&self) -> Option<&CurrentRoute> {
        if let Some(current) = self.current.get() {
            return Some(current);
        }
        let matched = self.slot.get()?;
        Some(
            self.current
                .get_or_init(|| CurrentRoute::new(matched.clone(), self.head.clone())),
        )
    }
}

/// Read view of the matched route for the live request.
#[derive(Debug, Clone)]
pub struct CurrentRoute {
    matched: MatchedRoute,
    request: RequestHead,
}

impl CurrentRoute {
    pub fn new(matched: MatchedRoute, request: RequestHead) -> Self {
        Self { matched, request }
    }

    pub fn record(&self) -> &Arc<RouteRecord> {
        &self.matched.record
    }

    pub fn request(&self) -> &RequestHead {
        &self.request
    }

    pub fn uri(&self) -> &str {
        &self.matched.record.uri
    }

    pub fn name(&self) -> Option<&str> {
        self.matched.record.name()
    }

    /// True if the route carries any of the given names.
    pub fn is_named<'a>(&self, names: impl IntoIterator<Item = &'a str>) -> bool {
        match self.name() {
            Some(name) => names.into_iter().any(|candidate| candidate == name),
            None => false,
        }
    }

    /// Fully qualified handler reference.
    pub fn uses(&self) -> Option<&str> {
        self.matched.record.action.uses.as_deref()
    }

    /// The `action` part of `Controller@action`.
    pub fn action_method(&self) -> Option<&str> {
        self.uses()?.rsplit_once('@').map(|(_, action)| action)
    }

    /// True if the handler reference equals `reference`.
    pub fn uses_action(&self, reference: &str) -> bool {
        self.uses() == Some(reference)
    }

    pub fn action(&self) -> &GroupAttributes {
        &self.matched.record.action
    }

    pub fn versions(&self) -> &BTreeSet<String> {
        &self.matched.record.versions
    }

    pub fn methods(&self) -> &[Method] {
        &self.matched.record.methods
    }

    pub fn scopes(&self) -> &[String] {
        &self.matched.record.action.scopes
    }

    pub fn providers(&self) -> &[String] {
        &self.matched.record.action.providers
    }

    pub fn middleware(&self) -> &[String] {
        &self.matched.record.action.middleware
    }

    pub fn domain(&self) -> Option<&str> {
        self.matched.record.action.trimmed_domain()
    }

    pub fn parameter(&self, name: &str) -> Option<&str> {
        self.matched.params.get(name).map(String::as_str)
    }

    pub fn parameters(&self) -> &RouteParams {
        &self.matched.params
    }

    /// Whether successful responses take part in ETag handling.
    pub fn is_conditional(&self) -> bool {
        self.matched.record.action.conditional_request.unwrap_or(true)
    }

    pub fn extension(&self, key: &str) -> Option<&Value> {
        self.matched.record.action.extensions.get(key)
    }
}
