//! # Storage Root Lock
//!
//! Keeps two vault processes from writing the same storage root. Uses `fs2`
//! (flock on Unix, LockFileEx on Windows). Released on drop.

use fs2::FileExt;
use std::fs::{File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use thiserror::Error;

/// Lock file name inside the storage root.
pub const LOCK_FILE: &str = ".vault.lock";

/// How long [`StorageLock::acquire`] keeps retrying.
pub const DEFAULT_LOCK_TIMEOUT: Duration = Duration::from_secs(2);

#[derive(Debug, Error)]
pub enum LockError {
    #[error("failed to create lock file: {0}")]
    CreateFailed(#[source] io::Error),

    #[error("storage root already in use{} ({})", pid.map(|p| format!(" by process {p}")).unwrap_or_default(), path.display())]
    AlreadyLocked { pid: Option<u32>, path: PathBuf },

    #[error("failed to write PID to lock file: {0}")]
    WriteFailed(#[source] io::Error),
}

/// Exclusive lock on a storage root.
pub struct StorageLock {
    file: File,
    path: PathBuf,
    pid: u32,
}

impl StorageLock {
    /// Acquire with the default timeout.
    pub fn acquire(root: &Path) -> Result<Self, LockError> {
        Self::acquire_with_timeout(root, DEFAULT_LOCK_TIMEOUT)
    }

    /// Acquire, retrying with exponential backoff until `timeout` elapses.
    pub fn acquire_with_timeout(root: &Path, timeout: Duration) -> Result<Self, LockError> {
        let deadline = Instant::now() + timeout;
        let lock_path = root.join(LOCK_FILE);
        let mut retry_delay = Duration::from_millis(25);

        loop {
            // Do not truncate before holding the lock: the PID belongs to the holder.
            let file = OpenOptions::new()
                .create(true)
                .truncate(false)
                .read(true)
                .write(true)
                .open(&lock_path)
                .map_err(LockError::CreateFailed)?;

            match file.try_lock_exclusive() {
                Ok(()) => {
                    let pid = std::process::id();
                    let mut file = file;
                    file.set_len(0).map_err(LockError::WriteFailed)?;
                    writeln!(file, "{pid}").map_err(LockError::WriteFailed)?;
                    file.sync_all().map_err(LockError::WriteFailed)?;
                    tracing::debug!(path = %lock_path.display(), pid, "storage lock acquired");
                    return Ok(Self {
                        file,
                        path: lock_path,
                        pid,
                    });
                }
                Err(_) => {
                    if Instant::now() >= deadline {
                        return Err(LockError::AlreadyLocked {
                            pid: Self::read_existing_pid(&lock_path),
                            path: lock_path,
                        });
                    }
                    drop(file);
                    std::thread::sleep(retry_delay);
                    retry_delay = (retry_delay * 2).min(Duration::from_millis(250));
                }
            }
        }
    }

    pub fn pid(&self) -> u32 {
        self.pid
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn read_existing_pid(path: &Path) -> Option<u32> {
        std::fs::read_to_string(path)
            .ok()
            .and_then(|s| s.trim().parse().ok())
    }
}

impl Drop for StorageLock {
    fn drop(&mut self) {
        #[allow(clippy::incompatible_msrv)]
        let _ = self.file.unlock();
        let _ = std::fs::remove_file(&self.path);
    }
}
