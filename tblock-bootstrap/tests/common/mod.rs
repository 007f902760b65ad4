//! Fixtures shared by the bootstrap integration tests.

#![allow(dead_code)]

use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::Duration;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine};
use serde_json::json;
use tblock_crypto::{seal, PayloadKey, NONCE_SIZE};
use tblock_license::{BrokerConfig, LicenseBroker};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};
use zip::write::SimpleFileOptions;
use zip::ZipWriter;

pub const ROOT_NAME: &str = "tblockguard";

/// Installer that leaves a marker and records its arguments.
pub const MARKER_INSTALLER: &str = "#!/bin/sh\necho \"$@\" > installed.marker\n";

/// Zip archive of `(name, contents)` pairs; `.sh` entries are executable.
pub fn payload_zip(entries: &[(&str, &str)]) -> Vec<u8> {
    let mut zip = ZipWriter::new(std::io::Cursor::new(Vec::new()));
    for (name, data) in entries {
        let mode = if name.ends_with(".sh") { 0o755 } else { 0o644 };
        let options = SimpleFileOptions::default().unix_permissions(mode);
        zip.start_file(*name, options).unwrap();
        zip.write_all(data.as_bytes()).unwrap();
    }
    zip.finish().unwrap().into_inner()
}

/// The reference payload: an installer and one data file.
pub fn scenario_zip(installer: &str) -> Vec<u8> {
    payload_zip(&[("install.sh", installer), ("data.txt", "payload data\n")])
}

/// Seals `plaintext` under `key` with an all-zero nonce into `dir/payload.bin`.
pub fn write_payload(dir: &Path, key: [u8; 32], plaintext: &[u8]) -> PathBuf {
    let blob = seal(&PayloadKey::from_bytes(key), [0u8; NONCE_SIZE], plaintext).unwrap();
    let path = dir.join("payload.bin");
    std::fs::write(&path, blob).unwrap();
    path
}

/// Answers every POST to `/verify` with an allowed response carrying `key`.
pub async fn mount_allowed(server: &MockServer, key: [u8; 32]) {
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "allowed": true,
            "payload_key": BASE64.encode(key),
        })))
        .mount(server)
        .await;
}

/// Answers every POST to `/verify` with a denial.
pub async fn mount_denied(server: &MockServer) {
    Mock::given(method("POST"))
        .and(path("/verify"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "allowed": false })))
        .mount(server)
        .await;
}

pub fn endpoint(server: &MockServer) -> String {
    format!("{}/verify", server.uri())
}

pub fn broker_for(server: &MockServer) -> LicenseBroker {
    LicenseBroker::new(BrokerConfig {
        endpoint: endpoint(server),
        timeout: Duration::from_secs(2),
    })
    .unwrap()
}

/// Writes a fake previous installation.
pub fn write_previous_install(root: &Path) {
    std::fs::create_dir_all(root).unwrap();
    std::fs::write(root.join("install.sh"), "#!/bin/sh\necho old\n").unwrap();
    std::fs::write(root.join("old.txt"), "old version\n").unwrap();
}

/// Names in `parent` other than the installation root itself.
pub fn leftovers(parent: &Path) -> Vec<String> {
    let mut names: Vec<String> = std::fs::read_dir(parent)
        .unwrap()
        .filter_map(Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .filter(|name| name != ROOT_NAME)
        .collect();
    names.sort();
    names
}
