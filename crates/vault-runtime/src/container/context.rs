//! # Vault Context
//!
//! Every long-lived service, built once at startup and passed to whatever
//! needs it.
//!
//! ## Initialization Order
//!
//! 1. Validate configuration
//! 2. Open the storage root (creates the area taxonomy)
//! 3. Take the exclusive storage lock
//! 4. Start the audit logger under `<root>/logs`
//! 5. Wire metadata store and backup engine to the audit sink
//! 6. Create the rate limiter

use super::config::{ConfigError, VaultConfig};
use rv_02_storage::{FileStorage, LockError, MetadataStore, StorageError, StorageLock};
use rv_03_backup::BackupEngine;
use rv_04_audit_log::{AuditError, AuditLogger};
use rv_05_rate_limiter::RateLimiter;
use shared_types::{AuditSink, ErrorClass, SystemClock};
use std::sync::Arc;
use thiserror::Error;
use tokio::task::JoinError;
use tracing::{info, warn};

#[derive(Debug, Error)]
pub enum VaultError {
    #[error("invalid configuration: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Storage(#[from] StorageError),

    #[error(transparent)]
    Lock(#[from] LockError),

    #[error(transparent)]
    Audit(#[from] AuditError),

    #[error("startup task failed: {0}")]
    Task(#[from] JoinError),
}

impl VaultError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Storage(e) => e.class(),
            Self::Audit(e) => e.class(),
            Self::Config(_) | Self::Lock(_) | Self::Task(_) => ErrorClass::FatalConfiguration,
        }
    }
}

/// The vault's services. Cheap to share behind an `Arc`.
pub struct VaultContext {
    config: VaultConfig,
    storage: Arc<FileStorage>,
    metadata: MetadataStore,
    backups: Arc<BackupEngine>,
    audit: Arc<AuditLogger>,
    rate_limiter: Arc<RateLimiter>,
    lock: StorageLock,
}

impl VaultContext {
    /// Build and start every service.
    ///
    /// # Errors
    ///
    /// Any failure here is fatal to the process: invalid configuration, an
    /// unusable storage root, or a root already held by another process.
    pub async fn initialize(config: VaultConfig) -> Result<Self, VaultError> {
        config.validate()?;

        // The logger is only constructed here; it touches disk on first flush.
        let root_hint = config.storage.root.clone();
        let audit = Arc::new(AuditLogger::with_system_clock(
            config.audit_config(&root_hint),
        ));
        let sink: Arc<dyn AuditSink> = audit.clone();

        let storage =
            Arc::new(FileStorage::open(config.storage.clone(), Arc::clone(&sink)).await?);
        let root = storage.root().to_path_buf();

        let lock_root = root.clone();
        let lock = tokio::task::spawn_blocking(move || StorageLock::acquire(&lock_root)).await??;
        info!(root = %root.display(), pid = lock.pid(), "Storage lock acquired");

        audit.start();

        let metadata = MetadataStore::new(Arc::clone(&storage));
        let backups = Arc::new(BackupEngine::with_system_clock(
            config.backup_config(&root),
            Arc::clone(&sink),
        ));
        let rate_limiter = Arc::new(
            RateLimiter::new(Arc::new(SystemClock))
                .with_cleanup_probability(config.rate_limit_cleanup_probability),
        );

        info!(
            root = %root.display(),
            backups = %backups.config().backup_dir.display(),
            logs = %audit.config().log_dir.display(),
            "Vault context initialized"
        );

        Ok(Self {
            config,
            storage,
            metadata,
            backups,
            audit,
            rate_limiter,
            lock,
        })
    }

    pub fn config(&self) -> &VaultConfig {
        &self.config
    }

    pub fn storage(&self) -> &Arc<FileStorage> {
        &self.storage
    }

    pub fn metadata(&self) -> &MetadataStore {
        &self.metadata
    }

    pub fn backups(&self) -> &Arc<BackupEngine> {
        &self.backups
    }

    pub fn audit(&self) -> &Arc<AuditLogger> {
        &self.audit
    }

    pub fn rate_limiter(&self) -> &Arc<RateLimiter> {
        &self.rate_limiter
    }

    /// Stop the flush task, write what is buffered and release the storage
    /// lock.
    pub async fn shutdown(self) -> Result<(), VaultError> {
        info!("Initiating vault shutdown");
        let flushed = self.audit.shutdown().await;
        if let Err(e) = &flushed {
            warn!(error = %e, pending = self.audit.pending(), "Final audit flush failed");
        }
        drop(self.lock);
        info!("Vault shutdown complete");
        flushed.map(|_| ()).map_err(VaultError::from)
    }
}
