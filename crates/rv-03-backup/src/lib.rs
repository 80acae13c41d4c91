//! # Backup and Restore (rv-03)
//!
//! Serialises the storage tree into one self-describing JSON snapshot and
//! replays snapshots back onto disk.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Round trip | `restore(backup(T))` reproduces the relative paths and bytes of `T` |
//! | 2 | Immutable artifacts | A snapshot is written once (temp file + rename) and never updated |
//! | 3 | Monotonic ids | Ids embed creation time; name order is creation order |
//! | 4 | Bounded retention | At most `max_backups` artifacts remain after each backup |
//! | 5 | Self-protecting restore | A pre-restore backup must succeed before replay starts |
//! | 6 | Contained replay | Every restored path passes `resolve_and_validate` |
//!
//! ## Crate Structure
//!
//! - `domain/` - tree codec, snapshot document, ids, options, errors
//! - `service/` - `BackupEngine` (create, list, verify, delete, restore)

pub mod domain;
pub mod service;

pub use domain::config::{
    BackupArea, BackupConfig, BackupOptions, RestoreOptions, DEFAULT_CONFIG_FILES,
    DEFAULT_MAX_BACKUPS,
};
pub use domain::errors::BackupError;
pub use domain::id::{backup_id_at, validate_backup_id, BACKUP_EXTENSION, BACKUP_PREFIX};
pub use domain::snapshot::{Snapshot, SnapshotMetadata, SNAPSHOT_VERSION};
pub use domain::tree::{TreeNode, TreeStats};
pub use service::{BackupEngine, BackupSummary, RestoreReport, VerifyReport};
