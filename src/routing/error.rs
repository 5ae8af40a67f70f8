//! Declaration-time errors.

use thiserror::Error;

/// Errors raised while routes are being declared. These abort startup.
#[derive(Debug, Error)]
pub enum RouterError {
    #[error("a version is required for route `{uri}`")]
    MissingVersion { uri: String },

    #[error("a version is required for an API group definition")]
    MissingGroupVersion,

    #[error("invalid pattern for `{param}`: {source}")]
    InvalidPattern {
        param: String,
        #[source]
        source: regex::Error,
    },

    #[error("route groups were left open when the router was finalized")]
    UnbalancedGroups,

    #[error("invalid Accept negotiation pattern: {0}")]
    Negotiation(#[from] regex::Error),
}
