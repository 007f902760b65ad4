//! Error types for the staging crate.

use std::path::PathBuf;

use thiserror::Error;

/// Result type for staging operations.
pub type StageResult<T> = Result<T, StageError>;

#[derive(Debug, Error)]
pub enum StageError {
    /// The decrypted payload is not a usable installation archive.
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// The installer entry point is missing from the normalized tree.
    #[error("payload is missing installer entry point {0}")]
    MissingEntryPoint(PathBuf),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The rename swap into the installation root failed.
    #[error("promotion failed: {0}")]
    Promote(String),

    /// Installation root or entry point cannot be used.
    #[error("invalid configuration: {0}")]
    Config(String),

    /// An interrupt was observed at a checkpoint.
    #[error("interrupted")]
    Interrupted,
}

impl StageError {
    /// Returns true if the payload itself is at fault.
    pub fn is_malformed(&self) -> bool {
        matches!(self, Self::Malformed(_) | Self::MissingEntryPoint(_))
    }
}

impl From<zip::result::ZipError> for StageError {
    fn from(err: zip::result::ZipError) -> Self {
        match err {
            zip::result::ZipError::Io(e) => Self::Io(e),
            other => Self::Malformed(other.to_string()),
        }
    }
}
