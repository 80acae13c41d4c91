//! # Domain Errors
//!
//! Every storage operation returns one of these instead of raising. Callers
//! decide whether a missing resource is fatal.

use rv_01_path_sanitizer::PathRejection;
use shared_types::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur during storage operations.
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// Input rejected; carries every reason found.
    #[error("validation failed: {}", reasons.join("; "))]
    Validation { reasons: Vec<String> },

    /// Missing file, directory or metadata sidecar.
    #[error("not found: {}", path.display())]
    NotFound { path: PathBuf },

    /// Sidecar exists but is not a JSON object.
    #[error("invalid metadata at {}: {reason}", path.display())]
    InvalidMetadata { path: PathBuf, reason: String },

    /// Content matched a threat signature or otherwise refused for safety.
    #[error("security rejection: {reason}")]
    SecurityRejection { reason: String },

    /// Disk read/write failure.
    #[error("I/O error at {}: {message}", path.display())]
    Io { path: PathBuf, message: String },

    /// Storage root cannot be created or used.
    #[error("storage root unusable at {}: {message}", path.display())]
    RootUnavailable { path: PathBuf, message: String },

    /// Path or filename refused by the sanitizer.
    #[error(transparent)]
    Path(#[from] PathRejection),
}

impl StorageError {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Validation { .. } | Self::InvalidMetadata { .. } => ErrorClass::Validation,
            Self::NotFound { .. } => ErrorClass::NotFound,
            Self::SecurityRejection { .. } => ErrorClass::SecurityRejection,
            Self::Io { .. } => ErrorClass::Io,
            Self::RootUnavailable { .. } => ErrorClass::FatalConfiguration,
            Self::Path(rejection) => rejection.class(),
        }
    }

    /// Human-readable reason list for the caller.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::Validation { reasons } => reasons.clone(),
            Self::Path(rejection) => rejection.reasons(),
            other => vec![other.to_string()],
        }
    }

    pub(crate) fn validation(reason: impl Into<String>) -> Self {
        Self::Validation {
            reasons: vec![reason.into()],
        }
    }

    pub(crate) fn io(path: impl Into<PathBuf>, err: &std::io::Error) -> Self {
        let path = path.into();
        if err.kind() == std::io::ErrorKind::NotFound {
            Self::NotFound { path }
        } else {
            Self::Io {
                path,
                message: err.to_string(),
            }
        }
    }
}
