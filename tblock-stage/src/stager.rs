//! Staging and promotion of a decrypted payload.
//!
//! The new tree is built under a hidden sibling of the installation root so
//! the final swap is a pair of same-filesystem renames. The previous root is
//! only discarded once the new one is in place.

use std::fs;
use std::io;
use std::path::{Component, Path, PathBuf};

use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::abort::AbortSignal;
use crate::error::{StageError, StageResult};
use crate::extract::{check_symlinks, extract_zip};

/// Default installation root.
pub const DEFAULT_INSTALL_ROOT: &str = "/opt/tblockguard";

/// Default installer entry point, relative to the installation root.
pub const DEFAULT_ENTRY_POINT: &str = "install.sh";

const EXTRACT_DIR: &str = "extract";
const PAYLOAD_DIR: &str = "payload";
const PREVIOUS_DIR: &str = "previous";

/// A validated payload tree waiting to be promoted.
///
/// Dropping it removes the whole staging directory.
#[derive(Debug)]
pub struct StagedPayload {
    dir: TempDir,
    payload: PathBuf,
}

impl StagedPayload {
    /// Returns the normalized payload directory.
    pub fn path(&self) -> &Path {
        &self.payload
    }

    /// Returns the staging directory that owns the payload.
    pub fn staging_dir(&self) -> &Path {
        self.dir.path()
    }
}

/// Builds staging trees and swaps them into the installation root.
#[derive(Debug, Clone)]
pub struct Stager {
    install_root: PathBuf,
    entry_point: PathBuf,
}

impl Stager {
    /// Creates a stager for `install_root` whose installer lives at
    /// `entry_point` relative to it.
    pub fn new(install_root: impl Into<PathBuf>, entry_point: impl Into<PathBuf>) -> Self {
        Self {
            install_root: install_root.into(),
            entry_point: entry_point.into(),
        }
    }

    /// Returns the installation root.
    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Returns the installer path relative to the root.
    pub fn entry_point(&self) -> &Path {
        &self.entry_point
    }

    /// Prefix shared by every staging directory of this root.
    fn staging_prefix(&self) -> StageResult<String> {
        let name = self.install_root.file_name().ok_or_else(|| {
            StageError::Config(format!(
                "installation root {} has no final component",
                self.install_root.display()
            ))
        })?;
        Ok(format!(".{}.stage-", name.to_string_lossy()))
    }

    fn root_parent(&self) -> PathBuf {
        match self.install_root.parent() {
            Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
            _ => PathBuf::from("."),
        }
    }

    fn check_entry_point(&self) -> StageResult<()> {
        let only_normal = self
            .entry_point
            .components()
            .all(|c| matches!(c, Component::Normal(_)));
        if self.entry_point.as_os_str().is_empty() || !only_normal {
            return Err(StageError::Config(format!(
                "entry point {} must be a plain relative path",
                self.entry_point.display()
            )));
        }
        Ok(())
    }

    /// Removes staging directories left behind by runs that were killed
    /// before their cleanup could run. Best effort.
    pub fn sweep_stale(&self) -> StageResult<usize> {
        let prefix = self.staging_prefix()?;
        let parent = self.root_parent();

        let entries = match fs::read_dir(&parent) {
            Ok(entries) => entries,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let mut removed = 0;
        for entry in entries.flatten() {
            let name = entry.file_name();
            if !name.to_string_lossy().starts_with(&prefix) {
                continue;
            }
            let path = entry.path();
            match fs::remove_dir_all(&path) {
                Ok(()) => {
                    info!("Removed stale staging directory {}", path.display());
                    removed += 1;
                }
                Err(e) => warn!("Could not remove stale staging directory {}: {}", path.display(), e),
            }
        }
        Ok(removed)
    }

    /// Extracts, normalizes and validates `archive` next to the root.
    ///
    /// Nothing under the installation root is touched. On any error the
    /// staging directory is removed before returning.
    pub fn stage(&self, archive: &[u8], abort: &AbortSignal) -> StageResult<StagedPayload> {
        self.check_entry_point()?;
        abort.check()?;

        if let Err(e) = self.sweep_stale() {
            warn!("Stale staging sweep failed: {}", e);
        }

        let parent = self.root_parent();
        fs::create_dir_all(&parent)?;
        let dir = tempfile::Builder::new()
            .prefix(&self.staging_prefix()?)
            .tempdir_in(&parent)?;
        debug!("Staging into {}", dir.path().display());

        let extract = dir.path().join(EXTRACT_DIR);
        fs::create_dir(&extract)?;
        let count = extract_zip(archive, &extract, abort)?;
        abort.check()?;

        let root = self.payload_root(&extract)?;
        let payload = dir.path().join(PAYLOAD_DIR);
        fs::rename(&root, &payload)?;
        check_symlinks(&payload)?;

        let installer = payload.join(&self.entry_point);
        if !installer.is_file() {
            return Err(StageError::MissingEntryPoint(self.entry_point.clone()));
        }
        ensure_executable(&installer)?;

        info!("Staged {} archive entries", count);
        Ok(StagedPayload { dir, payload })
    }

    /// Descends through single wrapper directories until the tree has a
    /// predictable top level.
    fn payload_root(&self, extract: &Path) -> StageResult<PathBuf> {
        let mut root = extract.to_path_buf();
        loop {
            if root.join(&self.entry_point).is_file() {
                return Ok(root);
            }
            let mut entries = fs::read_dir(&root)?.collect::<io::Result<Vec<_>>>()?;
            if entries.len() != 1 || !entries[0].file_type()?.is_dir() {
                return Ok(root);
            }
            let wrapper = entries.remove(0).path();
            debug!("Flattening wrapper directory {}", wrapper.display());
            root = wrapper;
        }
    }

    /// Swaps the staged tree into the installation root.
    ///
    /// The previous root is renamed into the staging directory first and
    /// renamed back if the new tree cannot be moved into place.
    pub fn promote(&self, staged: StagedPayload, abort: &AbortSignal) -> StageResult<PathBuf> {
        abort.check()?;

        let StagedPayload { dir, payload } = staged;
        let previous = dir.path().join(PREVIOUS_DIR);

        let had_previous = match fs::symlink_metadata(&self.install_root) {
            Ok(_) => true,
            Err(e) if e.kind() == io::ErrorKind::NotFound => false,
            Err(e) => return Err(e.into()),
        };

        if had_previous {
            fs::rename(&self.install_root, &previous).map_err(|e| {
                StageError::Promote(format!(
                    "cannot move existing installation {} aside: {e}",
                    self.install_root.display()
                ))
            })?;
        }

        if let Err(e) = fs::rename(&payload, &self.install_root) {
            if had_previous {
                if let Err(restore) = fs::rename(&previous, &self.install_root) {
                    let kept = dir.keep();
                    return Err(StageError::Promote(format!(
                        "cannot install new tree ({e}) nor restore the previous one ({restore}); \
                         previous installation preserved at {}",
                        kept.join(PREVIOUS_DIR).display()
                    )));
                }
            }
            return Err(StageError::Promote(format!(
                "cannot move staged tree into {}: {e}",
                self.install_root.display()
            )));
        }

        info!("Promoted new installation to {}", self.install_root.display());
        if let Err(e) = dir.close() {
            warn!("Could not remove staging directory: {}", e);
        }
        Ok(self.install_root.clone())
    }
}

#[cfg(unix)]
fn ensure_executable(path: &Path) -> StageResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let mut perms = fs::metadata(path)?.permissions();
    let mode = perms.mode();
    // Mirror each read bit onto the matching execute bit.
    let wanted = mode | ((mode & 0o444) >> 2);
    if wanted != mode {
        perms.set_mode(wanted);
        fs::set_permissions(path, perms)?;
    }
    Ok(())
}

#[cfg(not(unix))]
fn ensure_executable(_path: &Path) -> StageResult<()> {
    Ok(())
}
