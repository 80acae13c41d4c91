//! Audit errors.

use shared_types::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit log I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    #[error("failed to encode audit entry: {0}")]
    Encode(#[from] serde_json::Error),
}

impl AuditError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Io { .. } => ErrorClass::Io,
            Self::Encode(_) => ErrorClass::Validation,
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            message: err.to_string(),
        }
    }
}
