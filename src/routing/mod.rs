//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Declaration (at startup):
//!     Router::group / version (attributes)
//!     → group_stack.rs (push merge(declared, top), guaranteed pop)
//!     → attributes.rs (inheritance rules)
//!     → router.rs add_route (RouteRecord, version required)
//!     → engine.rs (compile matchers, index by version)
//!
//! Request time:
//!     (request, negotiated version)
//!     → engine.rs (candidates for version)
//!     → matcher.rs (domain, URI pattern)
//!     → bind matched route, run handler
//! ```
//!
//! # Design Decisions
//! - Declaration errors are fatal and surface before serving
//! - Records are immutable once registered; the engine swaps whole tables
//! - Deterministic: same input always matches same route
//! - First match wins (ordered by registration)

pub mod attributes;
pub mod engine;
pub mod error;
pub mod group_stack;
pub mod matcher;
pub mod route;
pub mod router;

pub use attributes::{merge, GroupAttributes};
pub use engine::{MemoryEngine, RouteEngine, RouteTable};
pub use error::RouterError;
pub use group_stack::GroupStack;
pub use route::{BoxedHandler, Handler, HandlerRegistry, RouteAction, RouteId, RouteRecord};
pub use router::{normalize_uri, RouteHandle, Router};
