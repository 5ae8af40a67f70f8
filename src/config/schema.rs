//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the API layer.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ApiConfig {
    /// Accept-header negotiation defaults.
    pub negotiation: NegotiationConfig,

    /// Router-wide declaration and dispatch defaults.
    pub router: RouterConfig,

    /// Listener configuration for the bundled server.
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Vendor media type used by `Accept` negotiation:
/// `application/<standards_tree>.<subtype>.<version>+<format>`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct NegotiationConfig {
    /// Standards tree (`vnd`, `x`, `prs`).
    pub standards_tree: String,

    /// Vendor subtype, usually the application's short name.
    pub subtype: String,

    /// Version used when the header is missing or unparsable.
    pub default_version: String,

    /// Format used when the header is missing, unparsable or names an unknown format.
    pub default_format: String,
}

impl Default for NegotiationConfig {
    fn default() -> Self {
        Self {
            standards_tree: "vnd".to_string(),
            subtype: "app".to_string(),
            default_version: "v1".to_string(),
            default_format: "json".to_string(),
        }
    }
}

/// Router-wide defaults.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RouterConfig {
    /// Prefix applied to groups that end up with neither prefix nor domain.
    pub prefix: Option<String>,

    /// Domain applied to groups that end up with neither prefix nor domain.
    pub domain: Option<String>,

    /// Whether routes take part in ETag handling unless their groups say otherwise.
    pub conditional_request: bool,

    /// Maximum buffered request/response body size in bytes.
    pub max_body_bytes: usize,

    /// Expose internal error details in error responses.
    pub debug: bool,
}

impl Default for RouterConfig {
    fn default() -> Self {
        Self {
            prefix: None,
            domain: None,
            conditional_request: true,
            max_body_bytes: 2 * 1024 * 1024, // 2MB
            debug: false,
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Total time allowed for one request, enforced at the transport boundary.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self { request_secs: 30 }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error). `RUST_LOG` takes precedence.
    pub log_level: String,

    /// Emit JSON log lines instead of human-readable ones.
    pub json_logs: bool,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
        }
    }
}
