//! Shared fixtures: a vault rooted in a temp directory and tree snapshots.

use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;
use vault_runtime::{VaultConfig, VaultContext};

pub const PNG_MAGIC: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

/// Storage, user records and config files all below one temp dir. The flush
/// interval is long enough that only explicit flushes reach disk.
pub fn vault_config(dir: &Path) -> VaultConfig {
    let mut config = VaultConfig::with_root(dir.join("storage"));
    config.data_dir = dir.join("data");
    config.config_dir = dir.join("conf");
    config.audit_flush_interval = Duration::from_secs(3600);
    config
}

pub async fn start_vault() -> (TempDir, VaultContext) {
    let dir = tempfile::tempdir().unwrap();
    let ctx = VaultContext::initialize(vault_config(dir.path()))
        .await
        .unwrap();
    (dir, ctx)
}

/// A PNG that passes the signature check.
pub fn png(len: usize) -> Vec<u8> {
    let mut bytes = PNG_MAGIC.to_vec();
    bytes.resize(len.max(PNG_MAGIC.len()), 0x42);
    bytes
}

/// Every file below `dir`, keyed by `/`-joined relative path.
pub fn read_tree(dir: &Path) -> BTreeMap<String, Vec<u8>> {
    let mut out = BTreeMap::new();
    if dir.is_dir() {
        collect(dir, "", &mut out);
    }
    out
}

fn collect(dir: &Path, prefix: &str, out: &mut BTreeMap<String, Vec<u8>>) {
    for entry in std::fs::read_dir(dir).unwrap() {
        let entry = entry.unwrap();
        let name = entry.file_name().to_string_lossy().into_owned();
        let rel = if prefix.is_empty() {
            name
        } else {
            format!("{prefix}/{name}")
        };
        let path = entry.path();
        if path.is_dir() {
            collect(&path, &rel, out);
        } else {
            out.insert(rel, std::fs::read(&path).unwrap());
        }
    }
}

/// Concatenated contents of every audit file under `<root>/logs`.
pub fn audit_text(root: &Path) -> String {
    read_tree(&root.join("logs"))
        .into_values()
        .map(|bytes| String::from_utf8(bytes).unwrap())
        .collect()
}
