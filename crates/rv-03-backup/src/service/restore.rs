//! # Restore
//!
//! 1. Load and validate the artifact (fatal on failure)
//! 2. Take a pre-restore backup unless skipped (fatal on failure). Its
//!    retention sweep never removes the artifact being restored.
//! 3. Replay each selected storage area, clearing it first when
//!    `replace_existing` is set
//! 4. Replay the user-record area, clearing it first when `replace_existing`
//!    is set
//! 5. Write allow-listed configuration files last
//!
//! Per-file problems are collected in [`RestoreReport::errors`] and never
//! abort the remaining work.

use super::{write_atomic, BackupEngine};
use crate::domain::config::{BackupArea, BackupOptions, RestoreOptions};
use crate::domain::errors::BackupError;
use crate::domain::snapshot::Snapshot;
use crate::domain::tree::TreeNode;
use futures::future::BoxFuture;
use futures::FutureExt;
use rv_01_path_sanitizer::resolve_and_validate;
use serde_json::json;
use shared_types::{Actor, AuditAction, AuditEvent, AuditOptions};
use std::collections::BTreeMap;
use std::path::Path;
use tokio::fs;
use tracing::{info, warn};

/// Outcome of a restore that got past validation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RestoreReport {
    pub backup_id: String,
    /// Areas replayed (`students`, `events`, ..., `users`, `config`).
    pub restored: Vec<String>,
    /// Non-fatal per-file problems.
    pub errors: Vec<String>,
    pub files_written: usize,
    /// Safety snapshot taken before replay.
    pub pre_restore_backup: Option<String>,
}

impl RestoreReport {
    /// No per-file errors were recorded.
    pub fn is_complete(&self) -> bool {
        self.errors.is_empty()
    }
}

impl BackupEngine {
    /// Replay a snapshot onto the storage tree.
    ///
    /// # Errors
    ///
    /// Only fatal problems are errors: bad id, missing or invalid artifact,
    /// failed pre-restore backup.
    pub async fn restore_backup(
        &self,
        actor: &Actor,
        id: &str,
        options: RestoreOptions,
    ) -> Result<RestoreReport, BackupError> {
        let result = self.restore_inner(actor, id, &options).await;

        let audit = match &result {
            Ok(report) => {
                let base = AuditOptions::default()
                    .resource_id(report.backup_id.clone())
                    .details(json!({
                        "restored": report.restored,
                        "filesWritten": report.files_written,
                        "errors": report.errors.len(),
                        "preRestoreBackup": report.pre_restore_backup,
                    }));
                if report.is_complete() {
                    base
                } else {
                    base.failed(format!("{} files could not be restored", report.errors.len()))
                }
            }
            Err(e) => AuditOptions::default()
                .resource_id(id.to_string())
                .failed(e.to_string()),
        };
        self.audit
            .record(AuditEvent::new(actor, AuditAction::BackupRestored, "backup", audit))
            .await;

        result
    }

    async fn restore_inner(
        &self,
        actor: &Actor,
        id: &str,
        options: &RestoreOptions,
    ) -> Result<RestoreReport, BackupError> {
        let (id, parsed) = self.load(id).await?;
        let snapshot = parsed.snapshot;
        let mut report = RestoreReport {
            backup_id: id.clone(),
            errors: parsed.decode_errors,
            ..RestoreReport::default()
        };

        if !options.skip_pre_restore_backup {
            let description = format!("Pre-restore backup before restoring {id}");
            let safety = self
                .create_audited(actor, BackupOptions::described(description), Some(id.as_str()))
                .await
                .map_err(|e| BackupError::PreRestoreFailed {
                    reason: e.to_string(),
                })?;
            info!(backup_id = %safety, "Pre-restore backup taken");
            report.pre_restore_backup = Some(safety);
        }

        self.restore_storage(&snapshot, options, &mut report).await?;

        if options.includes(BackupArea::Users) {
            if let Some(TreeNode::Directory(children)) = &snapshot.data {
                self.restore_users(children, options, &mut report).await?;
            }
        }

        if options.config && !snapshot.config.is_empty() {
            self.restore_config(&snapshot, &mut report).await;
        }

        info!(
            backup_id = %id,
            restored = ?report.restored,
            files = report.files_written,
            errors = report.errors.len(),
            "Restore finished"
        );
        Ok(report)
    }

    async fn restore_storage(
        &self,
        snapshot: &Snapshot,
        options: &RestoreOptions,
        report: &mut RestoreReport,
    ) -> Result<(), BackupError> {
        let root = &self.config.storage_root;
        fs::create_dir_all(root)
            .await
            .map_err(|e| BackupError::io(root, &e))?;

        for (name, node) in &snapshot.storage {
            let Some(area) = BackupArea::from_name(name).filter(|a| *a != BackupArea::Users)
            else {
                report.errors.push(format!("{name}: unknown storage area skipped"));
                continue;
            };
            if !options.includes(area) {
                continue;
            }

            let area_dir = root.join(area.as_str());
            if options.replace_existing {
                match fs::remove_dir_all(&area_dir).await {
                    Ok(()) => {}
                    Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                    Err(e) => {
                        report
                            .errors
                            .push(format!("{name}: could not clear existing area ({e})"));
                        continue;
                    }
                }
            }

            report.files_written +=
                replay(root, name.clone(), name, node, &mut report.errors).await;
            report.restored.push(name.clone());
        }
        Ok(())
    }

    async fn restore_users(
        &self,
        children: &BTreeMap<String, TreeNode>,
        options: &RestoreOptions,
        report: &mut RestoreReport,
    ) -> Result<(), BackupError> {
        let base = &self.config.data_dir;
        if options.replace_existing {
            if let Err(e) = clear_dir(base).await {
                report
                    .errors
                    .push(format!("users: could not clear existing records ({e})"));
                return Ok(());
            }
        }
        fs::create_dir_all(base)
            .await
            .map_err(|e| BackupError::io(base, &e))?;
        for (name, child) in children {
            report.files_written += replay(base, name.clone(), "", child, &mut report.errors).await;
        }
        report.restored.push(BackupArea::Users.as_str().to_string());
        Ok(())
    }

    async fn restore_config(&self, snapshot: &Snapshot, report: &mut RestoreReport) {
        let dir = &self.config.config_dir;
        if let Err(e) = fs::create_dir_all(dir).await {
            report
                .errors
                .push(format!("config: cannot create {} ({e})", dir.display()));
            return;
        }

        let mut any = false;
        for (name, text) in &snapshot.config {
            if !self.config.is_allowed_config(name) {
                report
                    .errors
                    .push(format!("config/{name}: not in the allow-list, skipped"));
                continue;
            }
            let target = match resolve_and_validate(dir, name) {
                Ok(safe) => safe.into_path_buf(),
                Err(e) => {
                    report.errors.push(format!("config/{name}: {e}"));
                    continue;
                }
            };
            match write_atomic(&target, text.as_bytes()).await {
                Ok(()) => {
                    report.files_written += 1;
                    any = true;
                }
                Err(e) => report.errors.push(format!("config/{name}: {e}")),
            }
        }
        if any {
            report.restored.push("config".to_string());
        }
    }
}

/// Remove everything inside `dir`, keeping `dir` itself. Missing is fine.
async fn clear_dir(dir: &Path) -> std::io::Result<()> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(e),
    };
    while let Some(entry) = entries.next_entry().await? {
        if entry.file_type().await?.is_dir() {
            fs::remove_dir_all(entry.path()).await?;
        } else {
            fs::remove_file(entry.path()).await?;
        }
    }
    Ok(())
}

/// Write `node` at `rel` below `base`. Binary leaves go to their recorded
/// original path, which must stay inside `scope` (empty = anywhere in base).
/// Returns the number of files written.
fn replay<'a>(
    base: &'a Path,
    rel: String,
    scope: &'a str,
    node: &'a TreeNode,
    errors: &'a mut Vec<String>,
) -> BoxFuture<'a, usize> {
    async move {
        match node {
            TreeNode::Directory(children) => {
                let dir = match resolve_and_validate(base, &rel) {
                    Ok(safe) => safe.into_path_buf(),
                    Err(e) => {
                        errors.push(format!("{rel}: {e}"));
                        return 0;
                    }
                };
                if let Err(e) = fs::create_dir_all(&dir).await {
                    errors.push(format!("{rel}: {e}"));
                    return 0;
                }
                let mut written = 0;
                for (name, child) in children {
                    written += replay(base, format!("{rel}/{name}"), scope, child, errors).await;
                }
                written
            }
            TreeNode::Json(value) => match serde_json::to_vec_pretty(value) {
                Ok(bytes) => write_leaf(base, &rel, &bytes, errors).await,
                Err(e) => {
                    errors.push(format!("{rel}: {e}"));
                    0
                }
            },
            TreeNode::Binary {
                data,
                original_path,
            } => {
                let in_scope = scope.is_empty()
                    || original_path
                        .strip_prefix(scope)
                        .is_some_and(|rest| rest.starts_with('/'));
                if !in_scope {
                    warn!(path = %original_path, scope, "Binary leaf outside its area");
                    errors.push(format!("{rel}: originalPath {original_path} outside {scope}"));
                    return 0;
                }
                write_leaf(base, original_path, data, errors).await
            }
        }
    }
    .boxed()
}

async fn write_leaf(base: &Path, rel: &str, bytes: &[u8], errors: &mut Vec<String>) -> usize {
    let target = match resolve_and_validate(base, rel) {
        Ok(safe) => safe.into_path_buf(),
        Err(e) => {
            errors.push(format!("{rel}: {e}"));
            return 0;
        }
    };
    if let Some(parent) = target.parent() {
        if let Err(e) = fs::create_dir_all(parent).await {
            errors.push(format!("{rel}: {e}"));
            return 0;
        }
    }
    match fs::write(&target, bytes).await {
        Ok(()) => 1,
        Err(e) => {
            errors.push(format!("{rel}: {e}"));
            0
        }
    }
}
