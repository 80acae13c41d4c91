//! Recursive capture of a directory into snapshot tree nodes.

use crate::domain::tree::TreeNode;
use futures::future::BoxFuture;
use futures::FutureExt;
use std::collections::BTreeMap;
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::warn;

/// Capture `dir` (which lies under `base`) as directory children.
///
/// Entries that cannot be represented in a snapshot (non UTF-8 names,
/// symlinks, directories named `*.json`, unreadable files) are left out and
/// recorded in `skipped` as `<relative path>: <reason>`. Only a failure to
/// list `dir` itself is returned. Symlinks are never followed.
pub(crate) fn walk_dir<'a>(
    base: &'a Path,
    dir: PathBuf,
    skipped: &'a mut Vec<String>,
) -> BoxFuture<'a, io::Result<BTreeMap<String, TreeNode>>> {
    async move {
        let mut children = BTreeMap::new();
        let mut entries = fs::read_dir(&dir).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            let rel = relative_path(base, &path);
            let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                warn!(path = %path.display(), "Skipping non UTF-8 name");
                skipped.push(format!("{rel}: name is not valid UTF-8"));
                continue;
            };
            let file_type = match entry.file_type().await {
                Ok(t) => t,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable entry");
                    skipped.push(format!("{rel}: unreadable ({e})"));
                    continue;
                }
            };

            if file_type.is_symlink() {
                warn!(path = %path.display(), "Skipping symlink");
                skipped.push(format!("{rel}: symlink"));
            } else if file_type.is_dir() {
                if name.ends_with(".json") {
                    warn!(path = %path.display(), "Skipping directory with .json name");
                    skipped.push(format!("{rel}: directory named like a JSON file"));
                    continue;
                }
                match walk_dir(base, path.clone(), skipped).await {
                    Ok(grandchildren) => {
                        children.insert(name, TreeNode::Directory(grandchildren));
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable directory");
                        skipped.push(format!("{rel}: unreadable directory ({e})"));
                    }
                }
            } else if is_transient(&name) {
                continue;
            } else {
                match fs::read(&path).await {
                    Ok(bytes) => {
                        let node = if name.ends_with(".json") {
                            TreeNode::json_file(bytes, rel)
                        } else {
                            TreeNode::Binary {
                                data: bytes,
                                original_path: rel,
                            }
                        };
                        children.insert(name, node);
                    }
                    Err(e) => {
                        warn!(path = %path.display(), error = %e, "Skipping unreadable file");
                        skipped.push(format!("{rel}: unreadable ({e})"));
                    }
                }
            }
        }
        Ok(children)
    }
    .boxed()
}

/// In-flight temp files of atomic writes.
fn is_transient(name: &str) -> bool {
    name.starts_with('.') && name.ends_with(".tmp")
}

/// `/`-separated path of `path` relative to `base`.
pub(crate) fn relative_path(base: &Path, path: &Path) -> String {
    path.strip_prefix(base)
        .unwrap_or(path)
        .components()
        .map(|c| c.as_os_str().to_string_lossy().into_owned())
        .collect::<Vec<_>>()
        .join("/")
}
