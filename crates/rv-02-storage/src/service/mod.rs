//! # Storage Service
//!
//! Raw operations on the storage root and the metadata store layered on top.
//!
//! ## Components
//!
//! - `FileStorage`: directory creation, binary uploads, listing, deletion and
//!   quarantine under a canonical root
//! - `MetadataStore`: one JSON sidecar per entity, last writer wins
//! - `PathLocks`: per-sidecar async mutexes so concurrent writers serialise
//!   instead of interleaving
//!
//! Every mutating operation reports to the injected [`shared_types::AuditSink`].

mod files;
mod metadata;
mod path_locks;

pub use files::{FileStorage, StoredAsset, UploadRequest};
pub use metadata::MetadataStore;
pub use path_locks::PathLocks;
