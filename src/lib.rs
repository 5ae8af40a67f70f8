//! Versioned API routing and content negotiation.

pub mod config;
pub mod dispatch;
pub mod exception;
pub mod format;
pub mod http;
pub mod negotiation;
pub mod observability;
pub mod routing;

pub use config::schema::ApiConfig;
pub use dispatch::{current_request, Dispatcher};
pub use exception::ApiError;
pub use http::{ApiRequest, ApiResponse, HttpServer};
pub use routing::{GroupAttributes, MemoryEngine, RouteAction, Router};
