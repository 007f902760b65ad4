//! Payload archive encryption using AES-256-GCM.
//!
//! Artifact layout: `nonce (12 bytes) || ciphertext || tag (16 bytes)`, no
//! associated data.

use std::path::Path;

use aes_gcm::aead::{Aead, KeyInit};
use aes_gcm::{Aes256Gcm, Nonce};

use crate::error::{CryptoError, CryptoResult};
use crate::key::{PayloadKey, KEY_SIZE};

/// Size of nonce in bytes (96 bits, the GCM standard nonce).
pub const NONCE_SIZE: usize = 12;

/// Size of authentication tag in bytes.
pub const TAG_SIZE: usize = 16;

/// A parsed payload artifact.
#[derive(Clone, Debug)]
pub struct EncryptedArchive {
    /// The nonce the archive was sealed with.
    pub nonce: [u8; NONCE_SIZE],
    /// The ciphertext (includes auth tag).
    pub ciphertext: Vec<u8>,
}

impl EncryptedArchive {
    /// Splits a raw artifact into nonce and ciphertext.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if the blob cannot even hold a
    /// nonce and a tag.
    pub fn from_bytes(blob: &[u8]) -> CryptoResult<Self> {
        if blob.len() < NONCE_SIZE + TAG_SIZE {
            return Err(CryptoError::Decryption(format!(
                "archive too short ({} bytes, need at least {})",
                blob.len(),
                NONCE_SIZE + TAG_SIZE
            )));
        }

        let mut nonce = [0u8; NONCE_SIZE];
        nonce.copy_from_slice(&blob[..NONCE_SIZE]);

        Ok(Self {
            nonce,
            ciphertext: blob[NONCE_SIZE..].to_vec(),
        })
    }

    /// Serializes back to the artifact layout.
    #[must_use]
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut bytes = Vec::with_capacity(self.len());
        bytes.extend_from_slice(&self.nonce);
        bytes.extend_from_slice(&self.ciphertext);
        bytes
    }

    /// Returns the total artifact size.
    #[must_use]
    pub fn len(&self) -> usize {
        NONCE_SIZE + self.ciphertext.len()
    }

    /// Returns true if the ciphertext is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.ciphertext.is_empty()
    }
}

fn cipher_for(key: &PayloadKey) -> CryptoResult<Aes256Gcm> {
    if key.len() != KEY_SIZE {
        return Err(CryptoError::Decryption(format!(
            "invalid key length: expected {KEY_SIZE}, got {}",
            key.len()
        )));
    }
    Aes256Gcm::new_from_slice(key.as_bytes())
        .map_err(|_| CryptoError::Decryption("invalid key".to_string()))
}

/// Reads the payload artifact from disk.
///
/// # Errors
///
/// Returns [`CryptoError::ArchiveUnreadable`] on any I/O failure.
pub fn read_archive(path: &Path) -> CryptoResult<Vec<u8>> {
    std::fs::read(path).map_err(|source| CryptoError::ArchiveUnreadable {
        path: path.to_path_buf(),
        source,
    })
}

/// Decrypts a parsed archive.
///
/// # Errors
///
/// Fails closed with [`CryptoError::Decryption`] on a wrong-length key or
/// any authentication failure. No partial plaintext is ever returned.
pub fn decrypt(key: &PayloadKey, archive: &EncryptedArchive) -> CryptoResult<Vec<u8>> {
    let cipher = cipher_for(key)?;
    let nonce = Nonce::from_slice(&archive.nonce);

    cipher
        .decrypt(nonce, archive.ciphertext.as_ref())
        .map_err(|_| {
            CryptoError::Decryption("decryption failed (wrong key or tampered data)".to_string())
        })
}

/// Decrypts a raw artifact blob.
///
/// # Errors
///
/// Same as [`decrypt`], plus truncated blobs.
pub fn decrypt_archive(blob: &[u8], key: &PayloadKey) -> CryptoResult<Vec<u8>> {
    let archive = EncryptedArchive::from_bytes(blob)?;
    decrypt(key, &archive)
}

/// Seals `plaintext` into the artifact layout with an explicit nonce.
///
/// Used to build fixtures; production artifacts are produced upstream.
///
/// # Errors
///
/// Returns [`CryptoError::Encryption`] on a wrong-length key.
pub fn seal(key: &PayloadKey, nonce: [u8; NONCE_SIZE], plaintext: &[u8]) -> CryptoResult<Vec<u8>> {
    let cipher = cipher_for(key).map_err(|e| CryptoError::Encryption(e.to_string()))?;

    let ciphertext = cipher
        .encrypt(Nonce::from_slice(&nonce), plaintext)
        .map_err(|e| CryptoError::Encryption(e.to_string()))?;

    Ok(EncryptedArchive { nonce, ciphertext }.to_bytes())
}
