//! Request-time failure handling.
//!
//! # Data Flow
//! ```text
//! handler / engine failure (ApiError)
//!     → dispatcher (internal request? propagate unchanged)
//!     → handler.rs report() (structured log + metrics)
//!     → handler.rs handle() (best-effort ApiResponse)
//!     → finalizer renders it like any other response
//! ```
//!
//! # Design Decisions
//! - One error enum for everything that can go wrong while serving
//! - Each variant owns its HTTP status; the policy only shapes the body
//! - `handle` is infallible: it always yields a response

pub mod error;
pub mod handler;

pub use error::ApiError;
pub use handler::{DefaultExceptionHandler, ExceptionHandler};
