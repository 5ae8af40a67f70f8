//! Route declaration.
//!
//! # Responsibilities
//! - Open and close attribute groups around a declaration body
//! - Normalize each route declaration against the inherited attributes
//! - Reject groups and routes without a version before anything is served
//! - Submit normalized records to the route engine
//!
//! # Design Decisions
//! - The router owns the engine while routes are declared, then hands it over
//! - A group frame is popped by a guard, so errors and panics in the body
//!   cannot leak attributes into sibling groups
//! - Router defaults (prefix, domain, conditional requests) are resolved here,
//!   so records carry final values

use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use axum::http::Method;

use crate::config::RouterConfig;
use crate::routing::attributes::GroupAttributes;
use crate::routing::engine::RouteEngine;
use crate::routing::error::RouterError;
use crate::routing::group_stack::GroupStack;
use crate::routing::route::{RouteAction, RouteId, RouteRecord};

/// Methods registered by [`Router::any`].
pub const ANY_METHODS: [Method; 7] = [
    Method::GET,
    Method::HEAD,
    Method::POST,
    Method::PUT,
    Method::PATCH,
    Method::DELETE,
    Method::OPTIONS,
];

/// Normalize a route URI: one leading slash, no trailing slash except the root,
/// prefixed when a prefix is given.
pub fn normalize_uri(uri: &str, prefix: Option<&str>) -> String {
    let path = uri.trim_matches('/');
    let prefix = prefix.map(|p| p.trim_matches('/')).unwrap_or("");

    match (prefix.is_empty(), path.is_empty()) {
        (true, _) => format!("/{path}"),
        (false, true) => format!("/{prefix}"),
        (false, false) => format!("/{prefix}/{path}"),
    }
}

/// Declares versioned routes into a [`RouteEngine`].
#[derive(Debug)]
pub struct Router<E> {
    engine: E,
    stack: GroupStack,
    config: RouterConfig,
}

impl<E: RouteEngine> Router<E> {
    pub fn new(engine: E, config: RouterConfig) -> Self {
        Self {
            engine,
            stack: GroupStack::new(),
            config,
        }
    }

    /// Run `body` with `attributes` merged onto the current group.
    pub fn group<F>(&mut self, attributes: GroupAttributes, body: F) -> Result<(), RouterError>
    where
        F: FnOnce(&mut Router<E>) -> Result<(), RouterError>,
    {
        let mut merged = self.stack.merge_with_top(attributes);
        if merged.version.is_empty() {
            return Err(RouterError::MissingGroupVersion);
        }

        if merged.trimmed_prefix().is_none() && merged.trimmed_domain().is_none() {
            if let Some(prefix) = &self.config.prefix {
                merged.prefix = Some(prefix.trim_matches('/').to_string());
            }
            // An explicit empty domain opts out of the router default.
            if merged.domain.is_none() {
                merged.domain.clone_from(&self.config.domain);
            }
        }

        self.stack.push(merged);
        let mut scope = GroupScope { router: self };
        body(&mut *scope)
    }

    /// Group routes under one or more versions.
    pub fn version<I, S, F>(&mut self, versions: I, body: F) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Router<E>) -> Result<(), RouterError>,
    {
        self.group(GroupAttributes::new().versions(versions), body)
    }

    /// Group routes under versions with extra attributes.
    pub fn version_with<I, S, F>(
        &mut self,
        versions: I,
        attributes: GroupAttributes,
        body: F,
    ) -> Result<(), RouterError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
        F: FnOnce(&mut Router<E>) -> Result<(), RouterError>,
    {
        self.group(attributes.versions(versions), body)
    }

    /// Register a route for the given methods.
    pub fn add_route<M>(
        &mut self,
        methods: M,
        uri: &str,
        action: impl Into<RouteAction>,
    ) -> Result<RouteHandle<'_, E>, RouterError>
    where
        M: IntoIterator<Item = Method>,
    {
        let RouteAction { attributes, handler } = action.into();
        let mut action = self.stack.merge_with_top(attributes);

        if action.version.is_empty() {
            return Err(RouterError::MissingVersion { uri: uri.to_string() });
        }
        if action.conditional_request.is_none() {
            action.conditional_request = Some(self.config.conditional_request);
        }

        let mut unique: Vec<Method> = Vec::new();
        for method in methods {
            if !unique.contains(&method) {
                unique.push(method);
            }
        }

        let uri = normalize_uri(uri, action.prefix.as_deref());
        let name = action.name.clone();

        tracing::debug!(
            methods = ?unique,
            uri = %uri,
            versions = ?action.version,
            uses = ?action.uses,
            "Registering route"
        );

        let id = self.engine.add_route(RouteRecord {
            methods: unique,
            uri,
            versions: action.version.clone(),
            action,
            handler,
        })?;

        Ok(RouteHandle {
            engine: &mut self.engine,
            id,
            name,
        })
    }

    /// GET and HEAD.
    pub fn get(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::GET, Method::HEAD], uri, action)
    }

    pub fn post(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::POST], uri, action)
    }

    pub fn put(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::PUT], uri, action)
    }

    pub fn patch(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::PATCH], uri, action)
    }

    pub fn delete(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::DELETE], uri, action)
    }

    pub fn options(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route([Method::OPTIONS], uri, action)
    }

    pub fn any(&mut self, uri: &str, action: impl Into<RouteAction>) -> Result<RouteHandle<'_, E>, RouterError> {
        self.add_route(ANY_METHODS, uri, action)
    }

    pub fn match_methods<M>(
        &mut self,
        methods: M,
        uri: &str,
        action: impl Into<RouteAction>,
    ) -> Result<RouteHandle<'_, E>, RouterError>
    where
        M: IntoIterator<Item = Method>,
    {
        self.add_route(methods, uri, action)
    }

    /// Currently inherited attributes.
    pub fn current_attributes(&self) -> &GroupAttributes {
        self.stack.peek()
    }

    /// True while a group body is running.
    pub fn has_group_stack(&self) -> bool {
        !self.stack.is_empty()
    }

    pub fn routes(&self, version: Option<&str>) -> Vec<Arc<RouteRecord>> {
        self.engine.routes(version)
    }

    /// Every version at least one route answers to.
    pub fn versions(&self) -> Vec<String> {
        let mut versions: Vec<String> = self
            .engine
            .routes(None)
            .iter()
            .flat_map(|r| r.versions.iter().cloned())
            .collect();
        versions.sort();
        versions.dedup();
        versions
    }

    pub fn config(&self) -> &RouterConfig {
        &self.config
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    pub fn engine_mut(&mut self) -> &mut E {
        &mut self.engine
    }

    /// Finish declaration and hand the engine over.
    pub fn into_engine(self) -> Result<E, RouterError> {
        if !self.stack.is_empty() {
            return Err(RouterError::UnbalancedGroups);
        }
        Ok(self.engine)
    }
}

/// Pops its group frame when dropped.
struct GroupScope<'r, E> {
    router: &'r mut Router<E>,
}

impl<E> Deref for GroupScope<'_, E> {
    type Target = Router<E>;

    fn deref(&self) -> &Router<E> {
        self.router
    }
}

impl<E> DerefMut for GroupScope<'_, E> {
    fn deref_mut(&mut self) -> &mut Router<E> {
        self.router
    }
}

impl<E> Drop for GroupScope<'_, E> {
    fn drop(&mut self) {
        self.router.stack.pop();
    }
}

/// Returned by route registration; allows naming the route.
pub struct RouteHandle<'r, E> {
    engine: &'r mut E,
    id: RouteId,
    name: Option<String>,
}

impl<E: RouteEngine> RouteHandle<'_, E> {
    pub fn id(&self) -> RouteId {
        self.id
    }

    /// Name the route. The inherited `as` prefix is prepended.
    pub fn name(mut self, name: &str) -> Self {
        let full = format!("{}{}", self.name.as_deref().unwrap_or(""), name);
        self.engine.name_route(self.id, &full);
        self.name = Some(full);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::routing::engine::MemoryEngine;
    use std::panic::{catch_unwind, AssertUnwindSafe};

    fn router() -> Router<MemoryEngine> {
        Router::new(MemoryEngine::new(), RouterConfig::default())
    }

    #[test]
    fn test_normalize_uri() {
        assert_eq!(normalize_uri("/", None), "/");
        assert_eq!(normalize_uri("", None), "/");
        assert_eq!(normalize_uri("users/", None), "/users");
        assert_eq!(normalize_uri("//users//", None), "/users");
        assert_eq!(normalize_uri("/", Some("api/")), "/api");
        assert_eq!(normalize_uri("users", Some("/api")), "/api/users");
    }

    #[test]
    fn test_nested_prefixes() {
        let mut router = router();
        router
            .version(["v1"], |r| {
                r.group(GroupAttributes::new().prefix("a"), |r| {
                    r.group(GroupAttributes::new().prefix("b"), |r| {
                        r.get("c", "Ctrl@index")?;
                        Ok(())
                    })
                })
            })
            .unwrap();

        let routes = router.routes(Some("v1"));
        assert_eq!(routes.len(), 1);
        assert_eq!(routes[0].uri, "/a/b/c");
        assert_eq!(routes[0].methods, vec![Method::GET, Method::HEAD]);
        assert!(!router.has_group_stack());
    }

    #[test]
    fn test_route_without_version_fails() {
        let mut router = router();
        let err = router.get("users", "Users@index").err().unwrap();
        assert!(matches!(err, RouterError::MissingVersion { ref uri } if uri == "users"));
    }

    #[test]
    fn test_group_without_version_fails() {
        let mut router = router();
        let err = router
            .group(GroupAttributes::new().prefix("api"), |_| Ok(()))
            .unwrap_err();
        assert!(matches!(err, RouterError::MissingGroupVersion));
    }

    #[test]
    fn test_version_inherited_through_nesting() {
        let mut router = router();
        router
            .version(["v1"], |r| {
                r.group(GroupAttributes::new().namespace("App"), |r| {
                    r.group(GroupAttributes::new().prefix("users"), |r| {
                        r.get("/", "Users@index")?;
                        Ok(())
                    })
                })
            })
            .unwrap();

        let routes = router.routes(None);
        assert_eq!(routes[0].versions.iter().collect::<Vec<_>>(), vec!["v1"]);
        assert_eq!(routes[0].action.uses.as_deref(), Some("App::Users@index"));
        assert_eq!(router.versions(), vec!["v1"]);
    }

    #[test]
    fn test_stack_popped_after_error() {
        let mut router = router();
        let result = router.version(["v1"], |r| {
            r.group(GroupAttributes::new().prefix("broken"), |_| {
                Err(RouterError::UnbalancedGroups)
            })
        });
        assert!(result.is_err());
        assert!(!router.has_group_stack());

        router
            .version(["v2"], |r| {
                r.get("sibling", "Ctrl@index")?;
                Ok(())
            })
            .unwrap();
        assert_eq!(router.routes(Some("v2"))[0].uri, "/sibling");
    }

    #[test]
    fn test_stack_popped_after_panic() {
        let mut router = router();
        let outcome = catch_unwind(AssertUnwindSafe(|| {
            let _ = router.version(["v1"], |_| panic!("declaration blew up"));
        }));
        assert!(outcome.is_err());
        assert!(!router.has_group_stack());
    }

    #[test]
    fn test_router_default_prefix_and_conditional() {
        let config = RouterConfig {
            prefix: Some("/api/".into()),
            conditional_request: false,
            ..RouterConfig::default()
        };
        let mut router = Router::new(MemoryEngine::new(), config);
        router
            .version(["v1"], |r| {
                r.get("users", "Users@index")?;
                r.group(GroupAttributes::new().prefix("admin").conditional_request(true), |r| {
                    r.get("stats", "Stats@index")?;
                    Ok(())
                })
            })
            .unwrap();

        let routes = router.routes(Some("v1"));
        assert_eq!(routes[0].uri, "/api/users");
        assert_eq!(routes[0].action.conditional_request, Some(false));
        assert_eq!(routes[1].uri, "/api/admin/stats");
        assert_eq!(routes[1].action.conditional_request, Some(true));
    }

    #[test]
    fn test_domain_group_skips_default_prefix() {
        let config = RouterConfig {
            prefix: Some("api".into()),
            ..RouterConfig::default()
        };
        let mut router = Router::new(MemoryEngine::new(), config);
        router
            .version_with(["v1"], GroupAttributes::new().domain("api.example.com"), |r| {
                r.get("users", "Users@index")?;
                Ok(())
            })
            .unwrap();

        let route = &router.routes(None)[0];
        assert_eq!(route.uri, "/users");
        assert_eq!(route.action.domain.as_deref(), Some("api.example.com"));
    }

    #[test]
    fn test_empty_domain_opts_out_of_inherited_domain() {
        let config = RouterConfig {
            domain: Some("api.example.com".into()),
            ..RouterConfig::default()
        };
        let mut router = Router::new(MemoryEngine::new(), config);
        router
            .version(["v1"], |r| {
                r.get("scoped", "Users@index")?;
                r.group(GroupAttributes::new().domain(""), |r| {
                    r.get("anywhere", "Users@index")?;
                    Ok(())
                })
            })
            .unwrap();

        let routes = router.routes(None);
        assert_eq!(routes[0].action.trimmed_domain(), Some("api.example.com"));
        assert_eq!(routes[1].uri, "/anywhere");
        assert_eq!(routes[1].action.trimmed_domain(), None);
    }

    #[test]
    fn test_route_names_are_prefixed() {
        let mut router = router();
        router
            .version_with(["v1"], GroupAttributes::new().name("api."), |r| {
                r.group(GroupAttributes::new().name("users."), |r| {
                    r.get("users/{id}", "Users@show")?.name("show");
                    r.post("users", "Users@store")?;
                    Ok(())
                })
            })
            .unwrap();

        let routes = router.routes(Some("v1"));
        assert_eq!(routes[0].name(), Some("api.users.show"));
        assert_eq!(routes[1].name(), Some("api.users."));
    }

    #[test]
    fn test_any_and_match_methods() {
        let mut router = router();
        router
            .version(["v1"], |r| {
                r.any("anything", "Ctrl@any")?;
                r.match_methods([Method::PUT, Method::PATCH, Method::PUT], "both", "Ctrl@both")?;
                Ok(())
            })
            .unwrap();

        let routes = router.routes(None);
        assert_eq!(routes[0].methods.len(), ANY_METHODS.len());
        assert_eq!(routes[1].methods, vec![Method::PUT, Method::PATCH]);
        assert!(router.into_engine().is_ok());
    }
}
