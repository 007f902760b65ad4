//! Run-level failure taxonomy and the process exit codes it maps to.

use tblock_crypto::CryptoError;
use tblock_license::LicenseError;
use tblock_stage::StageError;
use thiserror::Error;

use crate::invoker::InvokeError;

/// Stable process exit codes.
///
/// `2` matches clap's own exit code for usage errors, so every rejected
/// invocation looks the same to callers. Run failures start at `10`.
pub mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const CONFIG: u8 = 2;
    pub const NO_LICENSE_KEY: u8 = 10;
    pub const TRANSPORT: u8 = 11;
    pub const LICENSE_REJECTED: u8 = 12;
    pub const LICENSE_DENIED: u8 = 13;
    pub const PROTOCOL: u8 = 14;
    pub const DECRYPTION_FAILED: u8 = 15;
    pub const PAYLOAD_MALFORMED: u8 = 16;
    pub const INSTALL_FAILED: u8 = 17;
    pub const INSTALLER_FAILED: u8 = 18;
    pub const ARCHIVE_UNREADABLE: u8 = 19;
    pub const INTERRUPTED: u8 = 130;
}

/// Every way a bootstrap run can end other than success.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("license key required")]
    NoLicenseKey,

    #[error("cannot read license key: {0}")]
    Prompt(#[source] std::io::Error),

    #[error("cannot reach license server: {0}")]
    Transport(String),

    #[error("license server rejected key ({status}): {body}")]
    LicenseRejected { status: u16, body: String },

    #[error("license server denied access")]
    LicenseDenied,

    #[error("license server protocol error: {0}")]
    Protocol(String),

    #[error("{0}")]
    ArchiveUnreadable(String),

    #[error("payload decryption failed: {0}")]
    DecryptionFailed(String),

    #[error("payload is malformed: {0}")]
    PayloadMalformed(String),

    #[error("installation failed: {0}")]
    InstallFailed(String),

    #[error(transparent)]
    InstallerFailed(#[from] InvokeError),

    #[error("interrupted")]
    Interrupted,

    #[error("invalid configuration: {0}")]
    Config(String),
}

impl BootstrapError {
    /// Returns the process exit code for this failure.
    pub fn exit_code(&self) -> u8 {
        match self {
            Self::NoLicenseKey | Self::Prompt(_) => exit_code::NO_LICENSE_KEY,
            Self::Transport(_) => exit_code::TRANSPORT,
            Self::LicenseRejected { .. } => exit_code::LICENSE_REJECTED,
            Self::LicenseDenied => exit_code::LICENSE_DENIED,
            Self::Protocol(_) => exit_code::PROTOCOL,
            Self::ArchiveUnreadable(_) => exit_code::ARCHIVE_UNREADABLE,
            Self::DecryptionFailed(_) => exit_code::DECRYPTION_FAILED,
            Self::PayloadMalformed(_) => exit_code::PAYLOAD_MALFORMED,
            Self::InstallFailed(_) => exit_code::INSTALL_FAILED,
            Self::InstallerFailed(_) => exit_code::INSTALLER_FAILED,
            Self::Interrupted => exit_code::INTERRUPTED,
            Self::Config(_) => exit_code::CONFIG,
        }
    }
}

impl From<LicenseError> for BootstrapError {
    fn from(err: LicenseError) -> Self {
        match err {
            LicenseError::Transport(e) => Self::Transport(error_chain(&e)),
            LicenseError::Rejected { status, body } => Self::LicenseRejected { status, body },
            LicenseError::Denied => Self::LicenseDenied,
            LicenseError::Protocol(msg) => Self::Protocol(msg),
            other @ (LicenseError::Storage(_) | LicenseError::Config(_)) => {
                Self::Config(other.to_string())
            }
        }
    }
}

/// Joins an error with its sources, `outer: inner: root`.
fn error_chain(err: &dyn std::error::Error) -> String {
    let mut msg = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        msg.push_str(": ");
        msg.push_str(&cause.to_string());
        source = cause.source();
    }
    msg
}

impl From<CryptoError> for BootstrapError {
    fn from(err: CryptoError) -> Self {
        match err {
            CryptoError::ArchiveUnreadable { .. } => Self::ArchiveUnreadable(err.to_string()),
            CryptoError::Decryption(msg) | CryptoError::Encryption(msg) => {
                Self::DecryptionFailed(msg)
            }
        }
    }
}

impl From<StageError> for BootstrapError {
    fn from(err: StageError) -> Self {
        match err {
            StageError::Interrupted => Self::Interrupted,
            e if e.is_malformed() => Self::PayloadMalformed(e.to_string()),
            e => Self::InstallFailed(e.to_string()),
        }
    }
}
