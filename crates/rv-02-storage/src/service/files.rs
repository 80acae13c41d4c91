//! File operations under the canonical storage root.

use crate::domain::config::StorageConfig;
use crate::domain::content::{check_signature, inspect, InspectionReport};
use crate::domain::errors::StorageError;
use crate::domain::layout::{
    AssetCategory, AssetKind, EntityRef, StorageLayout, AREAS, QUARANTINE_DIR,
};
use crate::service::path_locks::PathLocks;
use rv_01_path_sanitizer::{resolve_and_validate, unique_filename, validate_filename, SafePath};
use serde_json::json;
use shared_types::{Actor, AuditAction, AuditEvent, AuditOptions, AuditSink, Severity};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

static TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

/// One binary upload.
#[derive(Debug, Clone)]
pub struct UploadRequest<'a> {
    pub entity: EntityRef,
    pub category: AssetCategory,
    pub bytes: &'a [u8],
    pub mime_type: &'a str,
    pub original_name: &'a str,
}

/// Where an accepted upload ended up.
#[derive(Debug, Clone, PartialEq)]
pub struct StoredAsset {
    /// Public reference, e.g. `/storage/events/2024/03-march/ev1/photos/x.png`.
    pub url: String,
    /// Absolute path on disk.
    pub path: PathBuf,
    /// Root-relative path.
    pub relative: String,
    /// Generated filename.
    pub filename: String,
    pub size: u64,
    pub mime_type: String,
    /// Entropy advisory raised (upload still accepted).
    pub entropy_flagged: bool,
}

/// File-backed storage rooted at a canonical directory.
pub struct FileStorage {
    config: StorageConfig,
    layout: StorageLayout,
    audit: Arc<dyn AuditSink>,
    locks: PathLocks,
}

impl FileStorage {
    /// Create the root and its top-level areas.
    ///
    /// # Errors
    ///
    /// `RootUnavailable` when the root cannot be created or canonicalized.
    /// This is the only storage error that should stop process startup.
    pub async fn open(
        config: StorageConfig,
        audit: Arc<dyn AuditSink>,
    ) -> Result<Self, StorageError> {
        let root_unavailable = |e: std::io::Error| StorageError::RootUnavailable {
            path: config.root.clone(),
            message: e.to_string(),
        };

        fs::create_dir_all(&config.root)
            .await
            .map_err(root_unavailable)?;
        let canonical = fs::canonicalize(&config.root)
            .await
            .map_err(root_unavailable)?;
        for area in AREAS {
            fs::create_dir_all(canonical.join(area))
                .await
                .map_err(root_unavailable)?;
        }

        info!(root = %canonical.display(), "Storage root ready");
        Ok(Self {
            layout: StorageLayout::new(canonical),
            config,
            audit,
            locks: PathLocks::new(),
        })
    }

    pub fn root(&self) -> &Path {
        self.layout.root()
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub(crate) fn locks(&self) -> &PathLocks {
        &self.locks
    }

    pub(crate) async fn emit(&self, event: AuditEvent) {
        self.audit.record(event).await;
    }

    /// Resolve a root-relative path, proving containment.
    pub fn resolve(&self, relative: &str) -> Result<SafePath, StorageError> {
        Ok(resolve_and_validate(self.layout.root(), relative)?)
    }

    /// Resolve an entity's directory through the containment check.
    pub(crate) fn resolve_entity(&self, entity: &EntityRef) -> Result<SafePath, StorageError> {
        entity.validate()?;
        let dir = self.layout.entity_dir(entity);
        let relative = self
            .layout
            .relative(&dir)
            .ok_or_else(|| StorageError::validation("entity directory outside root"))?;
        self.resolve(&relative)
    }

    /// Idempotent recursive directory creation.
    pub async fn ensure_directory(&self, relative: &str) -> Result<PathBuf, StorageError> {
        let safe = self.resolve(relative)?;
        fs::create_dir_all(safe.as_path())
            .await
            .map_err(|e| StorageError::io(safe.as_path(), &e))?;
        Ok(safe.into_path_buf())
    }

    /// Names in a directory, sorted.
    pub async fn list_files(&self, relative: &str) -> Result<Vec<String>, StorageError> {
        let safe = self.resolve(relative)?;
        let path = safe.as_path();
        let mut entries = fs::read_dir(path)
            .await
            .map_err(|e| StorageError::io(path, &e))?;

        let mut names = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| StorageError::io(path, &e))?
        {
            names.push(entry.file_name().to_string_lossy().into_owned());
        }
        names.sort();
        Ok(names)
    }

    /// Recursive removal. Returns `false` when nothing was there.
    pub async fn delete_subtree(&self, relative: &str) -> Result<bool, StorageError> {
        let safe = self.resolve(relative)?;
        remove_path(safe.as_path()).await
    }

    /// Remove an entity directory with all its assets and its sidecar.
    pub async fn delete_entity(
        &self,
        actor: &Actor,
        entity: &EntityRef,
    ) -> Result<bool, StorageError> {
        let safe = self.resolve_entity(entity)?;
        let result = remove_path(safe.as_path()).await;

        let options = AuditOptions::default().resource_id(entity.resource_id());
        match &result {
            Ok(true) => {
                self.emit(AuditEvent::new(
                    actor,
                    entity.delete_action(),
                    entity.resource(),
                    options,
                ))
                .await;
            }
            Ok(false) => debug!(path = %safe.as_path().display(), "Entity already absent"),
            Err(e) => {
                self.emit(AuditEvent::new(
                    actor,
                    entity.delete_action(),
                    entity.resource(),
                    options.failed(e.to_string()),
                ))
                .await;
            }
        }
        result
    }

    /// Validate, inspect and store an uploaded binary.
    ///
    /// Nothing is written unless the declared type is allowed for the
    /// category, the payload fits the size ceiling, the filename is safe and
    /// the leading bytes match the declared type. Payloads that hit a threat
    /// signature are quarantined instead of stored.
    pub async fn save_binary(
        &self,
        actor: &Actor,
        upload: UploadRequest<'_>,
    ) -> Result<StoredAsset, StorageError> {
        let result = self.save_binary_inner(actor, &upload).await;

        let details = json!({
            "category": upload.category.as_str(),
            "mimeType": upload.mime_type,
            "size": upload.bytes.len(),
            "originalName": upload.original_name,
        });
        let options = match &result {
            Ok(asset) => AuditOptions::default()
                .resource_id(asset.relative.clone())
                .details(details),
            Err(e) => AuditOptions::default()
                .resource_id(upload.entity.resource_id())
                .details(details)
                .failed(e.to_string()),
        };
        self.emit(AuditEvent::new(actor, AuditAction::FileUploaded, "file", options))
            .await;
        result
    }

    async fn save_binary_inner(
        &self,
        actor: &Actor,
        upload: &UploadRequest<'_>,
    ) -> Result<StoredAsset, StorageError> {
        self.validate_upload(upload)?;

        check_signature(upload.mime_type, upload.bytes).map_err(|reason| {
            warn!(
                mime = %upload.mime_type,
                name = %upload.original_name,
                "Upload content does not match declared type"
            );
            StorageError::validation(reason)
        })?;

        let report = inspect(
            upload.mime_type,
            upload.bytes,
            self.config.entropy_threshold,
        );
        if let Some(threat) = report.threat {
            return Err(self.reject_threat(actor, upload, &report, threat.signature).await);
        }
        if report.high_entropy {
            warn!(
                entropy = report.entropy,
                threshold = self.config.entropy_threshold,
                name = %upload.original_name,
                "High-entropy text upload accepted"
            );
            self.emit(AuditEvent::new(
                actor,
                AuditAction::SuspiciousActivity,
                "file",
                AuditOptions::default()
                    .resource_id(upload.entity.resource_id())
                    .severity(Severity::Medium)
                    .details(json!({
                        "reason": "high entropy text upload",
                        "entropy": report.entropy,
                        "threshold": self.config.entropy_threshold,
                        "originalName": upload.original_name,
                    })),
            ))
            .await;
        }

        let entity_dir = self.resolve_entity(&upload.entity)?;
        let dir = match upload.category.subdir() {
            Some(sub) => entity_dir.as_path().join(sub),
            None => entity_dir.into_path_buf(),
        };
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, &e))?;

        let filename = match upload.category {
            AssetCategory::StudentProfile => {
                let ext = rv_01_path_sanitizer::extension_of(upload.original_name)
                    .unwrap_or_else(|| "bin".to_string());
                unique_filename(&format!("profile.{ext}"))
            }
            _ => unique_filename(upload.original_name),
        };
        let path = dir.join(&filename);
        write_atomic(&path, upload.bytes).await?;

        let relative = self
            .layout
            .relative(&path)
            .ok_or_else(|| StorageError::validation("stored file outside root"))?;
        let url = format!(
            "{}/{}",
            self.config.public_prefix.trim_end_matches('/'),
            relative
        );
        info!(path = %relative, size = upload.bytes.len(), "Stored upload");

        Ok(StoredAsset {
            url,
            path,
            relative,
            filename,
            size: upload.bytes.len() as u64,
            mime_type: upload.mime_type.to_ascii_lowercase(),
            entropy_flagged: report.high_entropy,
        })
    }

    fn validate_upload(&self, upload: &UploadRequest<'_>) -> Result<(), StorageError> {
        let mut reasons = upload
            .entity
            .validate()
            .err()
            .map(|e| e.reasons())
            .unwrap_or_default();

        if !upload.category.applies_to(&upload.entity) {
            reasons.push(format!(
                "category {} does not apply to a {}",
                upload.category.as_str(),
                upload.entity.resource()
            ));
        }
        if !upload.category.allows(upload.mime_type) {
            reasons.push(format!(
                "type {} not allowed for {} (allowed: {})",
                upload.mime_type,
                upload.category.as_str(),
                upload.category.allowed_mime_types().join(", ")
            ));
        }
        if upload.bytes.is_empty() {
            reasons.push("file is empty".to_string());
        }
        let ceiling = self.size_ceiling(upload.category.kind());
        if upload.bytes.len() as u64 > ceiling {
            reasons.push(format!(
                "file size {} exceeds limit of {} bytes",
                upload.bytes.len(),
                ceiling
            ));
        }
        if let Err(rejection) = validate_filename(upload.original_name) {
            reasons.extend(rejection.reasons());
        }

        if reasons.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Validation { reasons })
        }
    }

    fn size_ceiling(&self, kind: AssetKind) -> u64 {
        match kind {
            AssetKind::Image => self.config.max_image_bytes,
            AssetKind::Document => self.config.max_document_bytes,
        }
    }

    async fn reject_threat(
        &self,
        actor: &Actor,
        upload: &UploadRequest<'_>,
        report: &InspectionReport,
        signature: &str,
    ) -> StorageError {
        let reason = format!("content matched threat signature: {signature}");
        warn!(
            name = %upload.original_name,
            signature,
            "Upload rejected by threat scan"
        );

        let quarantined = if self.config.quarantine_enabled {
            match self.quarantine(actor, upload, &reason).await {
                Ok(path) => Some(path),
                Err(e) => {
                    warn!(error = %e, "Failed to quarantine rejected upload");
                    None
                }
            }
        } else {
            None
        };

        self.emit(AuditEvent::new(
            actor,
            AuditAction::SuspiciousActivity,
            "file",
            AuditOptions::default()
                .resource_id(upload.entity.resource_id())
                .details(json!({
                    "reason": reason,
                    "signature": signature,
                    "offset": report.threat.map(|t| t.offset),
                    "originalName": upload.original_name,
                    "mimeType": upload.mime_type,
                    "quarantined": quarantined
                        .as_deref()
                        .and_then(|p| self.layout.relative(p)),
                }))
                .failed(reason.clone()),
        ))
        .await;

        StorageError::SecurityRejection { reason }
    }

    /// Park a rejected payload under `quarantine/` with a reason sidecar.
    async fn quarantine(
        &self,
        actor: &Actor,
        upload: &UploadRequest<'_>,
        reason: &str,
    ) -> Result<PathBuf, StorageError> {
        let dir = self.layout.area(QUARANTINE_DIR);
        fs::create_dir_all(&dir)
            .await
            .map_err(|e| StorageError::io(&dir, &e))?;

        let name = format!("{}.quarantined", unique_filename(upload.original_name));
        let path = dir.join(&name);
        write_atomic(&path, upload.bytes).await?;

        let sidecar = json!({
            "originalName": upload.original_name,
            "mimeType": upload.mime_type,
            "size": upload.bytes.len(),
            "reason": reason,
            "entity": upload.entity.resource_id(),
            "userId": actor.user_id,
            "quarantinedAt": chrono::Utc::now().to_rfc3339(),
        });
        let sidecar_bytes = serde_json::to_vec_pretty(&sidecar)
            .map_err(|e| StorageError::validation(e.to_string()))?;
        write_atomic(&dir.join(format!("{name}.reason.json")), &sidecar_bytes).await?;

        info!(path = %path.display(), "Quarantined upload");
        Ok(path)
    }
}

/// Write through a sibling temp file and rename into place.
pub(crate) async fn write_atomic(path: &Path, bytes: &[u8]) -> Result<(), StorageError> {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let seq = TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let tmp = path.with_file_name(format!(".{name}.{}.{seq}.tmp", std::process::id()));

    fs::write(&tmp, bytes)
        .await
        .map_err(|e| StorageError::io(&tmp, &e))?;
    if let Err(e) = fs::rename(&tmp, path).await {
        let _ = fs::remove_file(&tmp).await;
        return Err(StorageError::io(path, &e));
    }
    Ok(())
}

/// Remove a file or directory tree; `Ok(false)` when already absent.
async fn remove_path(path: &Path) -> Result<bool, StorageError> {
    let meta = match fs::symlink_metadata(path).await {
        Ok(meta) => meta,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(false),
        Err(e) => return Err(StorageError::io(path, &e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path).await
    } else {
        fs::remove_file(path).await
    };
    match removed {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(StorageError::io(path, &e)),
    }
}
