//! Licensing for the TBlock Guard bootstrap.
//!
//! This crate handles:
//! - The opaque [`LicenseKey`] token and the cached-vs-typed decision
//! - Best-effort persistence of the last good key ([`KeyCache`])
//! - Exchanging a license key for a payload key ([`LicenseBroker`])
//!
//! # Exchange outcomes
//!
//! | Condition | Error |
//! |---|---|
//! | no HTTP response (timeout, refused, TLS) | [`LicenseError::Transport`] |
//! | status is not 2xx | [`LicenseError::Rejected`] |
//! | body is not the expected JSON | [`LicenseError::Protocol`] |
//! | `allowed` false or missing | [`LicenseError::Denied`] |
//! | `payload_key` missing or not base64 | [`LicenseError::Protocol`] |

mod broker;
mod cache;
mod error;
mod key;

pub use broker::{
    BrokerConfig, LicenseBroker, DEFAULT_LICENSE_API_URL, DEFAULT_TIMEOUT_SECS, LICENSE_API_ENV,
};
pub use cache::{FileKeyCache, KeyCache, MemoryKeyCache, DEFAULT_CACHE_PATH};
pub use error::{LicenseError, LicenseResult};
pub use key::{resolve_license_key, LicenseKey};
