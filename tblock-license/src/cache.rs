//! Last-used license key persistence.
//!
//! The cache is a convenience: a missing or unreadable file simply means the
//! operator is asked for the key again. Nothing here is a source of truth.

use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::error::LicenseResult;
use crate::key::LicenseKey;

/// Default system-wide cache location.
pub const DEFAULT_CACHE_PATH: &str = "/etc/tblock/license";

/// Storage for the last license key that decrypted a payload.
pub trait KeyCache {
    /// Returns the cached key, or `None` if absent, unreadable or blank.
    fn load(&self) -> Option<LicenseKey>;

    /// Persists `key`, replacing any previous value.
    fn save(&self, key: &LicenseKey) -> LicenseResult<()>;
}

/// Single-line plaintext file cache.
#[derive(Debug, Clone)]
pub struct FileKeyCache {
    path: PathBuf,
}

impl FileKeyCache {
    /// Creates a cache backed by `path`.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the backing file path.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl Default for FileKeyCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_PATH)
    }
}

impl KeyCache for FileKeyCache {
    fn load(&self) -> Option<LicenseKey> {
        match fs::read_to_string(&self.path) {
            Ok(content) => LicenseKey::parse(&content),
            Err(e) => {
                debug!("No cached license key at {}: {}", self.path.display(), e);
                None
            }
        }
    }

    fn save(&self, key: &LicenseKey) -> LicenseResult<()> {
        let parent = match self.path.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        };
        fs::create_dir_all(&parent)?;

        // NamedTempFile is created owner-only on Unix; persist keeps the mode.
        let mut tmp = tempfile::NamedTempFile::new_in(&parent)?;
        writeln!(tmp, "{}", key.as_str())?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;

        debug!("Cached license key at {}", self.path.display());
        Ok(())
    }
}

/// In-memory cache for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryKeyCache {
    slot: Mutex<Option<LicenseKey>>,
}

impl MemoryKeyCache {
    /// Creates a cache pre-populated with `key`.
    #[must_use]
    pub fn new(key: Option<LicenseKey>) -> Self {
        Self {
            slot: Mutex::new(key),
        }
    }

    /// Returns the currently stored key.
    #[must_use]
    pub fn get(&self) -> Option<LicenseKey> {
        self.slot
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

impl KeyCache for MemoryKeyCache {
    fn load(&self) -> Option<LicenseKey> {
        self.get()
    }

    fn save(&self, key: &LicenseKey) -> LicenseResult<()> {
        *self.slot.lock().unwrap_or_else(PoisonError::into_inner) = Some(key.clone());
        Ok(())
    }
}
