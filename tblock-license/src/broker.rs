//! Payload-key exchange with the TBlock authorization service.
//!
//! One POST per run: `{"license_key": "..."}` in, `{"allowed": bool,
//! "payload_key": "<base64>"}` out. Nothing is retried here; re-running the
//! tool is the retry policy.

use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tblock_crypto::PayloadKey;
use tracing::{debug, info};

use crate::error::{LicenseError, LicenseResult};
use crate::key::LicenseKey;

/// Environment variable overriding the authorization endpoint.
pub const LICENSE_API_ENV: &str = "TBLOCK_LICENSE_API";

/// Production authorization endpoint.
pub const DEFAULT_LICENSE_API_URL: &str = "https://tblock-licence-api-t4cao.ondigitalocean.app/verify";

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Longest response body kept in a [`LicenseError::Rejected`].
const MAX_DIAGNOSTIC_BODY: usize = 512;

/// Broker client configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BrokerConfig {
    /// Full URL of the verify endpoint.
    pub endpoint: String,
    /// Whole-request timeout.
    pub timeout: Duration,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            endpoint: DEFAULT_LICENSE_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

#[derive(Debug, Serialize)]
struct VerifyRequest<'a> {
    license_key: &'a str,
}

#[derive(Debug, Deserialize)]
struct VerifyResponse {
    #[serde(default)]
    allowed: bool,
    #[serde(default)]
    payload_key: Option<String>,
}

/// HTTP client for the authorization service.
#[derive(Debug, Clone)]
pub struct LicenseBroker {
    config: BrokerConfig,
    client: Client,
}

impl LicenseBroker {
    /// Creates a broker client.
    ///
    /// # Errors
    ///
    /// Returns [`LicenseError::Config`] if the HTTP client cannot be built.
    pub fn new(config: BrokerConfig) -> LicenseResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .user_agent(concat!("tblock-bootstrap/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| LicenseError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { config, client })
    }

    /// Returns the active configuration.
    #[must_use]
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Exchanges a license key for the payload decryption key.
    ///
    /// # Errors
    ///
    /// See the crate docs for the full decision table: transport failures,
    /// non-2xx statuses, `allowed: false` and malformed bodies each map to a
    /// distinct [`LicenseError`] variant.
    pub async fn exchange(&self, license_key: &LicenseKey) -> LicenseResult<PayloadKey> {
        info!("Requesting payload key from {}", self.config.endpoint);

        let response = self
            .client
            .post(&self.config.endpoint)
            .json(&VerifyRequest {
                license_key: license_key.as_str(),
            })
            .send()
            .await
            .map_err(LicenseError::Transport)?;

        let status = response.status();
        let body = response.bytes().await.map_err(LicenseError::Transport)?;
        debug!("License server answered {} ({} bytes)", status, body.len());

        if !status.is_success() {
            let text: String = String::from_utf8_lossy(&body)
                .chars()
                .take(MAX_DIAGNOSTIC_BODY)
                .collect();
            return Err(LicenseError::Rejected {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: VerifyResponse = serde_json::from_slice(&body)
            .map_err(|e| LicenseError::Protocol(format!("invalid JSON body: {e}")))?;

        if !parsed.allowed {
            return Err(LicenseError::Denied);
        }

        let encoded = parsed
            .payload_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| LicenseError::Protocol("response has no payload_key".to_string()))?;

        let bytes = BASE64
            .decode(encoded.trim())
            .map_err(|e| LicenseError::Protocol(format!("payload_key is not base64: {e}")))?;

        Ok(PayloadKey::from_vec(bytes))
    }
}
