//! Error types for payload decryption.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Errors that can occur while opening or sealing a payload archive.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Encryption failed.
    #[error("encryption failed: {0}")]
    Encryption(String),

    /// Decryption failed (wrong key, truncated or tampered data).
    #[error("decryption failed: {0}")]
    Decryption(String),

    /// The archive artifact could not be read from disk.
    #[error("cannot read payload archive {}: {source}", .path.display())]
    ArchiveUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}
