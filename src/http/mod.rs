//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, tower-http layers, body buffering)
//!     → request.rs (ApiRequest: head, body, internal flag, route slot)
//!     → [dispatcher negotiates, engine executes handler]
//!     → response.rs (ApiResponse / HandlerOutput, morph, 304 downgrade)
//!     → Send to client
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{ApiRequest, MatchedRoute, RequestHead, RouteParams, X_REQUEST_ID};
pub use response::{ApiResponse, Content, HandlerOutput};
pub use server::HttpServer;
