//! The license key token.

use std::fmt;

use serde::{Deserialize, Serialize};

/// An opaque license key as typed by the operator or read from the cache.
///
/// No structure is assumed. The only normalisation is trimming surrounding
/// whitespace; the result is forwarded verbatim to the authorization service.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LicenseKey(String);

impl LicenseKey {
    /// Builds a key from raw input, returning `None` for blank input.
    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(Self(trimmed.to_string()))
        }
    }

    /// Returns the raw key string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for LicenseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Decides which key a run uses given the cached value and operator input.
///
/// Non-blank input always wins; blank input falls back to the cached key.
/// Returns `None` when neither is available.
#[must_use]
pub fn resolve_license_key(cached: Option<&LicenseKey>, input: &str) -> Option<LicenseKey> {
    LicenseKey::parse(input).or_else(|| cached.cloned())
}
