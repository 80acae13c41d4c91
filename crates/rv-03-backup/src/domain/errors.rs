//! Backup and restore errors.

use shared_types::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BackupError {
    /// Identifier is not a well-formed backup id.
    #[error("invalid backup id '{id}': {reason}")]
    InvalidId { id: String, reason: String },

    #[error("backup not found: {id}")]
    NotFound { id: String },

    /// Artifact is unparseable or lacks required metadata.
    #[error("invalid snapshot {id}: {}", reasons.join("; "))]
    InvalidSnapshot { id: String, reasons: Vec<String> },

    /// The safety snapshot taken before a restore failed; nothing was restored.
    #[error("pre-restore backup failed: {reason}")]
    PreRestoreFailed { reason: String },

    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },
}

impl BackupError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::InvalidId { .. } | Self::InvalidSnapshot { .. } => ErrorClass::Validation,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::PreRestoreFailed { .. } | Self::Io { .. } => ErrorClass::Io,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
