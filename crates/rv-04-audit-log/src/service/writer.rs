//! Daily NDJSON files with size-based rotation.
//!
//! ```text
//! logs/
//! ├── audit-2024-03-05-1709640000000.log   rotated segment
//! └── audit-2024-03-05.log                 live file
//! ```

use crate::domain::entry::AuditLogEntry;
use crate::domain::errors::AuditError;
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

pub(crate) fn live_file_name(date: NaiveDate) -> String {
    format!("audit-{}.log", date.format("%Y-%m-%d"))
}

fn segment_prefix(date: NaiveDate) -> String {
    format!("audit-{}-", date.format("%Y-%m-%d"))
}

/// Append `entries` (all dated `date`) to the day's live file, rotating it
/// first when it has reached `max_bytes`.
pub(crate) async fn append(
    dir: &Path,
    date: NaiveDate,
    entries: &[AuditLogEntry],
    max_bytes: u64,
    now_ms: i64,
) -> Result<(), AuditError> {
    fs::create_dir_all(dir)
        .await
        .map_err(|e| AuditError::io(dir, &e))?;

    let path = dir.join(live_file_name(date));
    if let Ok(meta) = fs::metadata(&path).await {
        if meta.len() >= max_bytes {
            rotate(dir, &path, date, now_ms).await?;
        }
    }

    let mut buf = Vec::with_capacity(entries.len() * 256);
    for entry in entries {
        serde_json::to_writer(&mut buf, entry)?;
        buf.push(b'\n');
    }

    let mut file = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(&path)
        .await
        .map_err(|e| AuditError::io(&path, &e))?;
    file.write_all(&buf)
        .await
        .map_err(|e| AuditError::io(&path, &e))?;
    file.flush().await.map_err(|e| AuditError::io(&path, &e))?;
    Ok(())
}

async fn rotate(dir: &Path, live: &Path, date: NaiveDate, now_ms: i64) -> Result<(), AuditError> {
    let mut stamp = now_ms;
    let target = loop {
        let candidate = dir.join(format!("{}{stamp}.log", segment_prefix(date)));
        if !fs::try_exists(&candidate).await.unwrap_or(false) {
            break candidate;
        }
        stamp += 1;
    };
    fs::rename(live, &target)
        .await
        .map_err(|e| AuditError::io(live, &e))?;
    info!(rotated = %target.display(), "Audit log rotated");
    Ok(())
}

/// Files holding `date`'s entries: rotated segments oldest first, then the
/// live file.
pub(crate) async fn day_files(dir: &Path, date: NaiveDate) -> Result<Vec<PathBuf>, AuditError> {
    let mut entries = match fs::read_dir(dir).await {
        Ok(entries) => entries,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
        Err(e) => return Err(AuditError::io(dir, &e)),
    };

    let prefix = segment_prefix(date);
    let live = live_file_name(date);
    let mut segments: Vec<(i64, PathBuf)> = Vec::new();
    let mut live_path = None;

    while let Some(entry) = entries
        .next_entry()
        .await
        .map_err(|e| AuditError::io(dir, &e))?
    {
        let name = entry.file_name().to_string_lossy().into_owned();
        if name == live {
            live_path = Some(entry.path());
        } else if let Some(stamp) = name
            .strip_prefix(&prefix)
            .and_then(|rest| rest.strip_suffix(".log"))
            .and_then(|stamp| stamp.parse::<i64>().ok())
        {
            segments.push((stamp, entry.path()));
        }
    }

    segments.sort_by_key(|(stamp, _)| *stamp);
    let mut files: Vec<PathBuf> = segments.into_iter().map(|(_, p)| p).collect();
    files.extend(live_path);
    Ok(files)
}

/// Every entry persisted for `date`, in write order. Malformed lines are
/// skipped with a warning.
pub(crate) async fn read_day(dir: &Path, date: NaiveDate) -> Result<Vec<AuditLogEntry>, AuditError> {
    let mut out = Vec::new();
    for path in day_files(dir, date).await? {
        let text = fs::read_to_string(&path)
            .await
            .map_err(|e| AuditError::io(&path, &e))?;
        for (n, line) in text.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<AuditLogEntry>(line) {
                Ok(entry) => out.push(entry),
                Err(e) => warn!(
                    file = %path.display(),
                    line = n + 1,
                    error = %e,
                    "Skipping malformed audit line"
                ),
            }
        }
    }
    Ok(out)
}
