//! Shared helpers for staging tests.

#![allow(dead_code)]

use std::collections::BTreeSet;
use std::io::Write;
use std::path::{Path, PathBuf};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

/// Builds a zip archive from `(name, contents)` pairs.
pub fn zip_of(entries: &[(&str, &str)]) -> Vec<u8> {
    zip_with(|zip, options| {
        for (name, data) in entries {
            zip.start_file(*name, options).unwrap();
            zip.write_all(data.as_bytes()).unwrap();
        }
    })
}

/// Builds a zip archive with full control over the writer.
pub fn zip_with(
    build: impl FnOnce(&mut ZipWriter<std::io::Cursor<Vec<u8>>>, SimpleFileOptions),
) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    let options =
        SimpleFileOptions::default().compression_method(zip::CompressionMethod::Deflated);
    build(&mut zip, options);
    zip.finish().unwrap().into_inner()
}

/// The two-entry archive used throughout the end-to-end scenarios.
pub fn scenario_zip() -> Vec<u8> {
    zip_of(&[
        ("install.sh", "#!/bin/sh\necho installed\n"),
        ("data.txt", "payload data\n"),
    ])
}

/// Every path under `root`, relative and `/`-separated, files and dirs.
pub fn tree(root: &Path) -> BTreeSet<String> {
    fn walk(base: &Path, dir: &Path, out: &mut BTreeSet<String>) {
        for entry in std::fs::read_dir(dir).unwrap() {
            let entry = entry.unwrap();
            let path = entry.path();
            let rel = path.strip_prefix(base).unwrap();
            out.insert(rel.to_string_lossy().replace('\\', "/"));
            if entry.file_type().unwrap().is_dir() {
                walk(base, &path, out);
            }
        }
    }
    let mut out = BTreeSet::new();
    walk(root, root, &mut out);
    out
}

/// Builds a set of expected tree entries.
pub fn set(items: &[&str]) -> BTreeSet<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

/// Staging directories of `root` still present in its parent.
pub fn leftovers(root: &Path) -> Vec<PathBuf> {
    let prefix = format!(".{}.stage-", root.file_name().unwrap().to_string_lossy());
    std::fs::read_dir(root.parent().unwrap())
        .unwrap()
        .filter_map(Result::ok)
        .filter(|e| e.file_name().to_string_lossy().starts_with(&prefix))
        .map(|e| e.path())
        .collect()
}

/// Writes a fake previous installation.
pub fn write_previous_install(root: &Path) {
    std::fs::create_dir_all(root.join("lib")).unwrap();
    std::fs::write(root.join("install.sh"), "#!/bin/sh\necho old\n").unwrap();
    std::fs::write(root.join("old.txt"), "old version\n").unwrap();
    std::fs::write(root.join("lib").join("old.so"), "old lib\n").unwrap();
}
