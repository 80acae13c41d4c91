//! # Audit Log (rv-04)
//!
//! Buffered, severity-classified audit trail persisted as one NDJSON file per
//! UTC day under the storage `logs/` area.
//!
//! ## Domain Invariants
//!
//! | ID | Invariant | Description |
//! |----|-----------|-------------|
//! | 1 | Append-only | Entries are never modified or removed once written |
//! | 2 | Durable critical | A critical entry is on disk before `log` returns, or stays buffered for retry |
//! | 3 | No loss on failure | A failed flush re-queues the unwritten entries ahead of newer ones |
//! | 4 | Ordered files | Within a day, rotated segments then the live file hold entries in write order |
//! | 5 | Bounded files | The live file is rotated once it reaches `max_file_bytes` |
//!
//! ## Crate Structure
//!
//! - `domain/` - persisted entry, query filter, configuration, errors
//! - `service/` - `AuditLogger` and the daily-file writer
//!
//! ## Usage
//!
//! ```ignore
//! let logger = Arc::new(AuditLogger::with_system_clock(AuditConfig::in_dir("storage/logs")));
//! logger.start();
//! let sink: Arc<dyn AuditSink> = logger.clone();
//! // ... hand `sink` to storage and backup ...
//! logger.shutdown().await?;
//! ```

pub mod domain;
pub mod service;

pub use domain::config::{
    AuditConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_ENTRIES, DEFAULT_MAX_FILE_BYTES,
};
pub use domain::entry::AuditLogEntry;
pub use domain::errors::AuditError;
pub use domain::query::AuditQuery;
pub use service::AuditLogger;
