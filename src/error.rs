//! Discovery error types

use std::time::Duration;

/// Errors raised while talking to the model catalog or loading configuration.
///
/// Malformed upstream records are never surfaced here; they are reported
/// through [`AssociationReport`](crate::discovery::AssociationReport) instead.
#[derive(Debug, thiserror::Error)]
pub enum DiscoveryError {
    // Provider/network errors
    #[error("HTTP error: {0}")]
    Http(String),

    #[error("API error ({status}): {message}")]
    Api { status: u16, message: String },

    #[error("throttled, retry after {retry_after:?}")]
    Throttled { retry_after: Option<Duration> },

    /// The caller's identity may not list models or profiles in this region.
    ///
    /// Points at a configuration problem, not at a fact about model
    /// availability.
    #[error("access denied in {region}: {message}")]
    AccessDenied { region: String, message: String },

    #[error("listing timed out in {region} after {after:?}")]
    Timeout { region: String, after: Duration },

    // Data errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    // Configuration errors
    #[error("configuration error: {0}")]
    Configuration(String),
}

impl DiscoveryError {
    /// Whether the failure is worth retrying on a later scan.
    ///
    /// Network errors, throttling, timeouts and 5xx responses are transient.
    /// Permission failures and client errors are not.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Http(_) | Self::Throttled { .. } | Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Whether the failure is a permission/authorization problem.
    pub fn is_access_denied(&self) -> bool {
        matches!(self, Self::AccessDenied { .. })
    }

    /// Provider-supplied retry hint, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        match self {
            Self::Throttled { retry_after } => *retry_after,
            _ => None,
        }
    }
}

/// Result type alias for discovery operations
pub type Result<T> = std::result::Result<T, DiscoveryError>;
