//! Error types for the licensing module.

use thiserror::Error;

/// Licensing-specific errors.
#[derive(Debug, Error)]
pub enum LicenseError {
    /// The request never produced an HTTP response (timeout, refused, TLS).
    #[error("network error: {0}")]
    Transport(#[source] reqwest::Error),

    /// The authorization service answered with a non-success status.
    #[error("license server rejected key ({status}): {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, truncated for diagnostics.
        body: String,
    },

    /// The authorization service refused access for this key.
    #[error("license server denied access")]
    Denied,

    /// The response did not follow the authorization contract.
    #[error("malformed license server response: {0}")]
    Protocol(String),

    /// Key cache storage error.
    #[error("storage error: {0}")]
    Storage(#[from] std::io::Error),

    /// The endpoint URL or client configuration is unusable.
    #[error("invalid configuration: {0}")]
    Config(String),
}

/// Result type for license operations.
pub type LicenseResult<T> = Result<T, LicenseError>;
