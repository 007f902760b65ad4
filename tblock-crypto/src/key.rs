//! Payload key handling.

use zeroize::{Zeroize, ZeroizeOnDrop};

/// Size of payload keys in bytes (AES-256).
pub const KEY_SIZE: usize = 32;

/// Symmetric key for one payload, as handed out by the authorization service.
///
/// The length is not checked on construction: the broker forwards whatever
/// it decoded and the decryptor rejects anything that is not [`KEY_SIZE`]
/// bytes. Zeroized on drop.
#[derive(Clone, PartialEq, Eq, Zeroize, ZeroizeOnDrop)]
pub struct PayloadKey {
    bytes: Vec<u8>,
}

impl PayloadKey {
    /// Wraps raw key material of any length.
    #[must_use]
    pub fn from_vec(bytes: Vec<u8>) -> Self {
        Self { bytes }
    }

    /// Wraps a correctly sized key.
    #[must_use]
    pub fn from_bytes(bytes: [u8; KEY_SIZE]) -> Self {
        Self {
            bytes: bytes.to_vec(),
        }
    }

    /// Returns the key bytes.
    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Returns the key length in bytes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    /// Returns true if the key holds no bytes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

impl std::fmt::Debug for PayloadKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PayloadKey")
            .field("len", &self.bytes.len())
            .field("bytes", &"[REDACTED]")
            .finish()
    }
}
