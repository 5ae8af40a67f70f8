//! Dispatch subsystem.
//!
//! # Data Flow
//! ```text
//! ApiRequest
//!     → dispatcher.rs (negotiate, count, bind current request)
//!     → RouteEngine::find_and_execute(request, version)
//!         ├─ Ok(output)
//!         └─ Err(error) → internal? return Err(error)
//!                       → ExceptionHandler::handle(error)
//!     → finalizer.rs (adapt, format, conditional.rs)
//!     → wire Response
//! ```
//!
//! # Design Decisions
//! - Per-request state lives in `DispatchContext`, never in globals
//! - The current request is task-local and scoped to one dispatch
//! - The current route is built lazily from the engine's binding and memoized

pub mod conditional;
pub mod context;
pub mod dispatcher;
pub mod finalizer;

pub use context::{CurrentRoute, DispatchContext};
pub use dispatcher::{current_request, Dispatcher, DispatcherBuilder};
pub use finalizer::ResponseFinalizer;
