//! Audit logger configuration.

use std::path::PathBuf;
use std::time::Duration;

pub const DEFAULT_FLUSH_INTERVAL: Duration = Duration::from_secs(30);

/// Size at which the day's file is rotated.
pub const DEFAULT_MAX_FILE_BYTES: u64 = 10 * 1024 * 1024;

/// Buffered entries that trigger an early flush.
pub const DEFAULT_MAX_BUFFER_ENTRIES: usize = 1000;

#[derive(Debug, Clone)]
pub struct AuditConfig {
    /// Directory of `audit-<yyyy-mm-dd>.log` files.
    pub log_dir: PathBuf,
    pub flush_interval: Duration,
    pub max_file_bytes: u64,
    pub max_buffer_entries: usize,
}

impl Default for AuditConfig {
    fn default() -> Self {
        Self::in_dir("./storage/logs")
    }
}

impl AuditConfig {
    pub fn in_dir(log_dir: impl Into<PathBuf>) -> Self {
        Self {
            log_dir: log_dir.into(),
            flush_interval: DEFAULT_FLUSH_INTERVAL,
            max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            max_buffer_entries: DEFAULT_MAX_BUFFER_ENTRIES,
        }
    }
}
