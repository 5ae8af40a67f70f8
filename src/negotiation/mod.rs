//! Version and format negotiation.
//!
//! # Data Flow
//! ```text
//! Accept: application/vnd.app.v2+json
//!     → accept.rs (first structurally valid vendor media type)
//!     → unsupported format → default format
//!     → missing / unparsable → default version + default format
//!     → NegotiatedAccept { version, format }
//! ```
//!
//! # Design Decisions
//! - Negotiation never fails; format problems surface at finalization
//! - Exactly one pair per request, no quality weighting
//! - Pattern compiled once from configuration

pub mod accept;

pub use accept::{AcceptNegotiator, NegotiatedAccept};
