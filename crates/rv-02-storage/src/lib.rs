//! # Hierarchical Storage (rv-02)
//!
//! File-backed store for binary assets and JSON metadata sidecars under a
//! fixed directory taxonomy.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Containment | Every path touched resolves strictly below the canonical root |
//! | 2 | Fixed depth | Entity directories are built from sanitized segments only |
//! | 3 | No overwrite | Uploads get collision-resistant generated names |
//! | 4 | Content match | Declared MIME type must match the leading bytes |
//! | 5 | Whole-document sidecars | Metadata writes replace the document atomically (rename) |
//! | 6 | Serialised writers | Writers to one sidecar hold its path lock |
//!
//! ## Crate Structure (Hexagonal Architecture)
//!
//! - `domain/` - layout, category policies, content inspection, errors
//! - `service/` - `FileStorage`, `MetadataStore`, per-path locks
//! - `adapters/` - process lock on the storage root (`locking` feature)
//!
//! ## Usage
//!
//! ```ignore
//! let storage = Arc::new(FileStorage::open(StorageConfig::default(), sink).await?);
//! let metadata = MetadataStore::new(storage.clone());
//! metadata
//!     .save_metadata(&actor, &EntityRef::student("2021", "21BCE1234"), json!({"name": "Asha"}))
//!     .await?;
//! ```

pub mod adapters;
pub mod domain;
pub mod service;

pub use domain::config::{
    StorageConfig, DEFAULT_ENTROPY_THRESHOLD, DEFAULT_MAX_DOCUMENT_BYTES, DEFAULT_MAX_IMAGE_BYTES,
};
pub use domain::content::InspectionReport;
pub use domain::errors::StorageError;
pub use domain::layout::{
    month_dir, AssetCategory, AssetKind, EntityRef, StorageLayout, AREAS, BACKUPS_DIR, EVENTS_DIR,
    LOGS_DIR, MEDIA_DIR, METADATA_FILE, QUARANTINE_DIR, STUDENTS_DIR,
};
pub use service::{FileStorage, MetadataStore, PathLocks, StoredAsset, UploadRequest};

#[cfg(feature = "locking")]
pub use adapters::lock::{LockError, StorageLock};
