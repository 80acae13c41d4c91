//! # Backup Service
//!
//! `BackupEngine` creates, lists, verifies, deletes and restores snapshots.
//!
//! ## Create
//!
//! 1. Walk each included storage area (missing areas are skipped)
//! 2. Walk the flat user-record directory into `data`
//! 3. Embed allow-listed configuration files as text
//! 4. Write one artifact named by a monotonic timestamp id
//! 5. Delete the oldest artifacts beyond `max_backups`
//!
//! Restore lives in `restore.rs`.

mod restore;
mod walker;

pub use restore::RestoreReport;

use crate::domain::config::{BackupArea, BackupConfig, BackupOptions};
use crate::domain::errors::BackupError;
use crate::domain::id::{backup_id_at, file_name, id_from_file_name, validate_backup_id};
use crate::domain::snapshot::{ParsedSnapshot, Snapshot, SnapshotMetadata, SNAPSHOT_VERSION};
use crate::domain::tree::{TreeNode, TreeStats};
use chrono::{SecondsFormat, TimeZone, Utc};
use serde::Deserialize;
use serde_json::json;
use shared_types::{Actor, AuditAction, AuditEvent, AuditOptions, AuditSink, Clock, SystemClock};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

/// One artifact in the backup directory.
#[derive(Debug, Clone, PartialEq)]
pub struct BackupSummary {
    pub id: String,
    pub file_name: String,
    pub size_bytes: u64,
    /// `None` when the artifact cannot be read or parsed.
    pub metadata: Option<SnapshotMetadata>,
}

/// Result of checking an artifact without restoring it.
#[derive(Debug, Clone)]
pub struct VerifyReport {
    pub id: String,
    pub metadata: SnapshotMetadata,
    pub areas: BTreeMap<String, TreeStats>,
    pub data: Option<TreeStats>,
    pub config_files: Vec<String>,
    pub decode_errors: Vec<String>,
}

impl VerifyReport {
    pub fn is_valid(&self) -> bool {
        self.decode_errors.is_empty()
    }

    pub fn total_files(&self) -> usize {
        self.areas.values().map(TreeStats::files).sum::<usize>()
            + self.data.map(|d| d.files()).unwrap_or(0)
    }
}

/// Snapshot engine over one storage root.
pub struct BackupEngine {
    config: BackupConfig,
    audit: Arc<dyn AuditSink>,
    clock: Arc<dyn Clock>,
    last_id_ms: AtomicI64,
}

impl BackupEngine {
    pub fn new(config: BackupConfig, audit: Arc<dyn AuditSink>, clock: Arc<dyn Clock>) -> Self {
        Self {
            config,
            audit,
            clock,
            last_id_ms: AtomicI64::new(0),
        }
    }

    pub fn with_system_clock(config: BackupConfig, audit: Arc<dyn AuditSink>) -> Self {
        Self::new(config, audit, Arc::new(SystemClock))
    }

    pub fn config(&self) -> &BackupConfig {
        &self.config
    }

    /// Create a snapshot and apply retention. Returns the new backup id.
    pub async fn create_backup(
        &self,
        actor: &Actor,
        options: BackupOptions,
    ) -> Result<String, BackupError> {
        self.create_audited(actor, options, None).await
    }

    /// `create_backup` whose retention sweep never removes `protect`.
    async fn create_audited(
        &self,
        actor: &Actor,
        options: BackupOptions,
        protect: Option<&str>,
    ) -> Result<String, BackupError> {
        let result = self.create_inner(actor, &options, protect).await;

        let audit = match &result {
            Ok((id, snapshot, size)) => AuditOptions::default().resource_id(id.clone()).details(
                json!({
                    "description": options.description,
                    "includedPaths": snapshot.metadata.included_paths,
                    "configFiles": snapshot.metadata.config_files,
                    "skippedPaths": snapshot.metadata.skipped_paths,
                    "size": size,
                }),
            ),
            Err(e) => AuditOptions::default()
                .details(json!({"description": options.description}))
                .failed(e.to_string()),
        };
        self.audit
            .record(AuditEvent::new(actor, AuditAction::BackupCreated, "backup", audit))
            .await;

        result.map(|(id, _, _)| id)
    }

    async fn create_inner(
        &self,
        actor: &Actor,
        options: &BackupOptions,
        protect: Option<&str>,
    ) -> Result<(String, Snapshot, usize), BackupError> {
        fs::create_dir_all(&self.config.backup_dir)
            .await
            .map_err(|e| BackupError::io(&self.config.backup_dir, &e))?;

        let (id, timestamp) = self.allocate_id().await;
        let mut included_paths = Vec::new();
        let mut skipped_paths = Vec::new();

        let mut storage = BTreeMap::new();
        for area in BackupArea::STORAGE {
            if !options.includes(area) {
                continue;
            }
            let dir = self.config.storage_root.join(area.as_str());
            if let Some(children) = capture(&self.config.storage_root, dir, &mut skipped_paths).await
            {
                storage.insert(area.as_str().to_string(), TreeNode::Directory(children));
                included_paths.push(area.as_str().to_string());
            }
        }

        let data = if options.includes(BackupArea::Users) {
            let captured = capture(
                &self.config.data_dir,
                self.config.data_dir.clone(),
                &mut skipped_paths,
            )
            .await;
            if captured.is_some() {
                included_paths.push(BackupArea::Users.as_str().to_string());
            }
            captured.map(TreeNode::Directory)
        } else {
            None
        };

        let config = if options.config {
            self.read_config_files().await
        } else {
            BTreeMap::new()
        };

        let snapshot = Snapshot {
            metadata: SnapshotMetadata {
                timestamp,
                version: SNAPSHOT_VERSION.to_string(),
                description: options.description.clone(),
                included_paths,
                config_files: config.keys().cloned().collect(),
                created_by: Some(actor.clone()),
                skipped_paths,
            },
            storage,
            data,
            config,
        };

        let bytes = snapshot.to_bytes();
        let path = self.artifact_path(&id);
        write_atomic(&path, &bytes).await?;
        info!(
            backup_id = %id,
            size = bytes.len(),
            areas = ?snapshot.metadata.included_paths,
            "Backup created"
        );
        if !snapshot.metadata.skipped_paths.is_empty() {
            warn!(
                backup_id = %id,
                skipped = ?snapshot.metadata.skipped_paths,
                "Backup left entries out"
            );
        }

        // Sweep failures never fail the backup itself.
        match self.enforce_retention(protect).await {
            Ok(pruned) if !pruned.is_empty() => {
                info!(removed = ?pruned, "Retention removed old backups");
            }
            Ok(_) => {}
            Err(e) => warn!(backup_id = %id, error = %e, "Retention sweep failed"),
        }

        Ok((id, snapshot, bytes.len()))
    }

    /// Next id strictly later than any previously issued by this engine and
    /// not already present on disk.
    async fn allocate_id(&self) -> (String, String) {
        let now = self.clock.now_ms();
        let mut ms = loop {
            let prev = self.last_id_ms.load(Ordering::SeqCst);
            let next = now.max(prev + 1);
            if self
                .last_id_ms
                .compare_exchange(prev, next, Ordering::SeqCst, Ordering::SeqCst)
                .is_ok()
            {
                break next;
            }
        };

        loop {
            let ts = Utc
                .timestamp_millis_opt(ms)
                .single()
                .unwrap_or_else(|| self.clock.now());
            let id = backup_id_at(ts);
            let taken = fs::try_exists(self.artifact_path(&id)).await.unwrap_or(false);
            if !taken {
                self.last_id_ms.fetch_max(ms, Ordering::SeqCst);
                return (id, ts.to_rfc3339_opts(SecondsFormat::Millis, true));
            }
            ms += 1;
        }
    }

    async fn read_config_files(&self) -> BTreeMap<String, String> {
        let mut files = BTreeMap::new();
        for name in &self.config.config_files {
            let path = self.config.config_dir.join(name);
            match fs::read_to_string(&path).await {
                Ok(text) => {
                    files.insert(name.clone(), text);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    debug!(file = %name, "Config file absent");
                }
                Err(e) => warn!(file = %name, error = %e, "Skipping unreadable config file"),
            }
        }
        files
    }

    /// Delete the oldest artifacts beyond `max_backups`, by name order.
    /// `protect` is never removed; the next oldest goes in its place.
    async fn enforce_retention(&self, protect: Option<&str>) -> Result<Vec<String>, BackupError> {
        let mut ids = self.artifact_ids().await?;
        if ids.len() <= self.config.max_backups {
            return Ok(Vec::new());
        }
        let excess = ids.len() - self.config.max_backups;
        ids.retain(|id| Some(id.as_str()) != protect);
        ids.sort();
        let mut removed = Vec::with_capacity(excess);
        for id in ids.into_iter().take(excess) {
            let path = self.artifact_path(&id);
            match fs::remove_file(&path).await {
                Ok(()) => removed.push(id),
                Err(e) => warn!(backup_id = %id, error = %e, "Failed to remove old backup"),
            }
        }
        Ok(removed)
    }

    async fn artifact_ids(&self) -> Result<Vec<String>, BackupError> {
        let dir = &self.config.backup_dir;
        let mut entries = match fs::read_dir(dir).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BackupError::io(dir, &e)),
        };
        let mut ids = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| BackupError::io(dir, &e))?
        {
            if let Some(id) = entry.file_name().to_str().and_then(id_from_file_name) {
                ids.push(id.to_string());
            }
        }
        Ok(ids)
    }

    fn artifact_path(&self, id: &str) -> PathBuf {
        self.config.backup_dir.join(file_name(id))
    }

    /// Every artifact, newest first.
    pub async fn list_backups(&self) -> Result<Vec<BackupSummary>, BackupError> {
        #[derive(Deserialize)]
        struct Header {
            metadata: SnapshotMetadata,
        }

        let mut ids = self.artifact_ids().await?;
        ids.sort_by(|a, b| b.cmp(a));

        let mut summaries = Vec::with_capacity(ids.len());
        for id in ids {
            let path = self.artifact_path(&id);
            let (size_bytes, metadata) = match fs::read(&path).await {
                Ok(bytes) => (
                    bytes.len() as u64,
                    serde_json::from_slice::<Header>(&bytes)
                        .map(|h| h.metadata)
                        .ok(),
                ),
                Err(e) => {
                    warn!(backup_id = %id, error = %e, "Unreadable backup artifact");
                    (0, None)
                }
            };
            summaries.push(BackupSummary {
                file_name: file_name(&id),
                id,
                size_bytes,
                metadata,
            });
        }
        Ok(summaries)
    }

    /// Parse and validate an artifact without touching the storage tree.
    pub async fn verify_backup(&self, id: &str) -> Result<VerifyReport, BackupError> {
        let (id, parsed) = self.load(id).await?;
        let ParsedSnapshot {
            snapshot,
            decode_errors,
        } = parsed;

        Ok(VerifyReport {
            id,
            areas: snapshot
                .storage
                .iter()
                .map(|(area, node)| (area.clone(), node.stats()))
                .collect(),
            data: snapshot.data.as_ref().map(TreeNode::stats),
            config_files: snapshot.config.keys().cloned().collect(),
            metadata: snapshot.metadata,
            decode_errors,
        })
    }

    pub async fn delete_backup(&self, actor: &Actor, id: &str) -> Result<(), BackupError> {
        let id = validate_backup_id(id)?;
        let path = self.artifact_path(&id);
        let result = match fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(BackupError::NotFound { id: id.clone() })
            }
            Err(e) => Err(BackupError::io(&path, &e)),
        };

        let options = AuditOptions::default().resource_id(id.clone());
        let options = match &result {
            Ok(()) => options,
            Err(e) => options.failed(e.to_string()),
        };
        self.audit
            .record(AuditEvent::new(actor, AuditAction::FileDeleted, "backup", options))
            .await;
        if result.is_ok() {
            info!(backup_id = %id, "Backup deleted");
        }
        result
    }

    /// Read and parse an artifact by (validated) id.
    async fn load(&self, id: &str) -> Result<(String, ParsedSnapshot), BackupError> {
        let id = validate_backup_id(id)?;
        let path = self.artifact_path(&id);
        let bytes = fs::read(&path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                BackupError::NotFound { id: id.clone() }
            } else {
                BackupError::io(&path, &e)
            }
        })?;
        let parsed = Snapshot::parse(&id, &bytes)?;
        Ok((id, parsed))
    }
}

/// Walk an area root; `None` when it does not exist or cannot be listed.
async fn capture(
    base: &Path,
    dir: PathBuf,
    skipped: &mut Vec<String>,
) -> Option<BTreeMap<String, TreeNode>> {
    match fs::metadata(&dir).await {
        Ok(meta) if meta.is_dir() => {}
        _ => {
            debug!(path = %dir.display(), "Area absent, skipped");
            return None;
        }
    }
    match walker::walk_dir(base, dir.clone(), skipped).await {
        Ok(children) => Some(children),
        Err(e) => {
            warn!(path = %dir.display(), error = %e, "Skipping unreadable area");
            None
        }
    }
}

pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), BackupError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let tmp = path.with_file_name(format!(".{name}.tmp"));
    fs::write(&tmp, bytes)
        .await
        .map_err(|e| BackupError::io(&tmp, &e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(BackupError::io(path, &e));
    }
    Ok(())
}
