//! Timestamp-derived backup identifiers.
//!
//! `backup-2024-03-05T10-20-30-123Z`, stored as `<id>.zip`. Lexicographic
//! order of ids is creation order.

use crate::domain::errors::BackupError;
use chrono::{DateTime, SecondsFormat, Utc};
use rv_01_path_sanitizer::sanitize;

pub const BACKUP_PREFIX: &str = "backup-";

/// Historical extension; the artifact is plain JSON.
pub const BACKUP_EXTENSION: &str = ".zip";

pub fn backup_id_at(ts: DateTime<Utc>) -> String {
    let iso = ts.to_rfc3339_opts(SecondsFormat::Millis, true);
    format!("{BACKUP_PREFIX}{}", iso.replace([':', '.'], "-"))
}

pub fn file_name(id: &str) -> String {
    format!("{id}{BACKUP_EXTENSION}")
}

/// Accept `backup-…` with or without the extension; return the bare id.
pub fn validate_backup_id(raw: &str) -> Result<String, BackupError> {
    let invalid = |reason: &str| BackupError::InvalidId {
        id: raw.to_string(),
        reason: reason.to_string(),
    };

    let id = raw.strip_suffix(BACKUP_EXTENSION).unwrap_or(raw);
    if !id.starts_with(BACKUP_PREFIX) || id.len() == BACKUP_PREFIX.len() {
        return Err(invalid("must start with 'backup-'"));
    }
    if sanitize(id) != id || id.contains("..") {
        return Err(invalid("contains path characters"));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(invalid("contains unsupported characters"));
    }
    Ok(id.to_string())
}

/// Bare id of a directory entry, if it is a backup artifact.
pub fn id_from_file_name(name: &str) -> Option<&str> {
    let id = name.strip_suffix(BACKUP_EXTENSION)?;
    id.starts_with(BACKUP_PREFIX).then_some(id)
}
