//! Zip extraction into a staging directory.

use std::fs::{self, File};
use std::io::{self, Cursor, Read};
use std::path::{Component, Path};

use tracing::{debug, warn};
use zip::ZipArchive;

use crate::abort::AbortSignal;
use crate::error::{StageError, StageResult};

const S_IFMT: u32 = 0o170_000;
const S_IFLNK: u32 = 0o120_000;

/// Extracts `archive` into `dest`, checking `abort` before every entry.
///
/// Returns the number of entries written.
pub(crate) fn extract_zip(archive: &[u8], dest: &Path, abort: &AbortSignal) -> StageResult<usize> {
    let mut zip = ZipArchive::new(Cursor::new(archive))?;
    debug!("Extracting {} archive entries", zip.len());

    for i in 0..zip.len() {
        abort.check()?;

        let mut entry = zip.by_index(i)?;
        let rel = entry
            .enclosed_name()
            .ok_or_else(|| StageError::Malformed(format!("unsafe entry path: {}", entry.name())))?;
        let out = dest.join(&rel);
        reject_symlinked_parents(dest, &rel)?;

        if entry.is_dir() {
            fs::create_dir_all(&out)?;
            continue;
        }

        if let Some(parent) = out.parent() {
            fs::create_dir_all(parent)?;
        }

        let mode = entry.unix_mode();
        if mode.is_some_and(|m| m & S_IFMT == S_IFLNK) {
            let mut target = String::new();
            entry.read_to_string(&mut target)?;
            write_symlink(&rel, Path::new(&target), &out)?;
            continue;
        }

        if fs::symlink_metadata(&out).is_ok_and(|m| m.file_type().is_symlink()) {
            fs::remove_file(&out)?;
        }
        let mut file = File::create(&out)?;
        io::copy(&mut entry, &mut file)?;
        drop(file);

        if let Some(m) = mode {
            apply_mode(&out, m)?;
        }
    }

    Ok(zip.len())
}

/// Re-checks every symlink under `root` against `root` itself.
///
/// Flattening a wrapper directory moves links one or more levels up, so a
/// target that stayed inside the wrapper can now point past the new root.
pub(crate) fn check_symlinks(root: &Path) -> StageResult<()> {
    fn walk(root: &Path, dir: &Path) -> StageResult<()> {
        for entry in fs::read_dir(dir)? {
            let entry = entry?;
            let path = entry.path();
            let file_type = entry.file_type()?;
            if file_type.is_symlink() {
                let target = fs::read_link(&path)?;
                let rel = path.strip_prefix(root).unwrap_or(path.as_path());
                check_link_target(rel, &target)?;
            } else if file_type.is_dir() {
                walk(root, &path)?;
            }
        }
        Ok(())
    }
    walk(root, root)
}

/// Refuses to write through a symlink extracted by an earlier entry.
fn reject_symlinked_parents(dest: &Path, rel: &Path) -> StageResult<()> {
    let mut current = dest.to_path_buf();
    let Some(parent) = rel.parent() else {
        return Ok(());
    };
    for component in parent.components() {
        current.push(component);
        match fs::symlink_metadata(&current) {
            Ok(meta) if meta.file_type().is_symlink() => {
                return Err(StageError::Malformed(format!(
                    "entry {} is nested under symlink {}",
                    rel.display(),
                    current.strip_prefix(dest).unwrap_or(current.as_path()).display()
                )));
            }
            Ok(_) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => break,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(())
}

/// Rejects link targets that would resolve outside the staging tree.
fn check_link_target(link_rel: &Path, target: &Path) -> StageResult<()> {
    if target.is_absolute() {
        return Err(StageError::Malformed(format!(
            "symlink {} has absolute target {}",
            link_rel.display(),
            target.display()
        )));
    }

    let mut depth: usize = link_rel.parent().map_or(0, |p| p.components().count());
    for component in target.components() {
        match component {
            Component::Normal(_) => depth += 1,
            Component::CurDir => {}
            Component::ParentDir => {
                depth = depth.checked_sub(1).ok_or_else(|| {
                    StageError::Malformed(format!(
                        "symlink {} escapes the payload via {}",
                        link_rel.display(),
                        target.display()
                    ))
                })?;
            }
            Component::RootDir | Component::Prefix(_) => {
                return Err(StageError::Malformed(format!(
                    "symlink {} has absolute target {}",
                    link_rel.display(),
                    target.display()
                )));
            }
        }
    }
    Ok(())
}

#[cfg(unix)]
fn write_symlink(link_rel: &Path, target: &Path, out: &Path) -> StageResult<()> {
    check_link_target(link_rel, target)?;
    if fs::symlink_metadata(out).is_ok() {
        fs::remove_file(out)?;
    }
    std::os::unix::fs::symlink(target, out)?;
    Ok(())
}

#[cfg(not(unix))]
fn write_symlink(link_rel: &Path, target: &Path, _out: &Path) -> StageResult<()> {
    check_link_target(link_rel, target)?;
    warn!("Skipping symlink {} (unsupported on this platform)", link_rel.display());
    Ok(())
}

#[cfg(unix)]
fn apply_mode(path: &Path, mode: u32) -> StageResult<()> {
    use std::os::unix::fs::PermissionsExt;

    let perms = mode & 0o7777;
    if perms == 0 {
        warn!("Archive entry {} carries no permission bits", path.display());
        return Ok(());
    }
    fs::set_permissions(path, fs::Permissions::from_mode(perms))?;
    Ok(())
}

#[cfg(not(unix))]
fn apply_mode(_path: &Path, _mode: u32) -> StageResult<()> {
    Ok(())
}
