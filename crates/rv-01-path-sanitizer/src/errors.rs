use shared_types::ErrorClass;
use std::path::PathBuf;
use thiserror::Error;

/// Reasons a requested path or filename is refused.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PathRejection {
    /// Raw input contained `..`, a backslash or a NUL byte.
    #[error("path traversal attempt rejected: {input:?}")]
    Traversal { input: String },

    /// Raw input was absolute.
    #[error("absolute path rejected: {input:?}")]
    AbsolutePath { input: String },

    /// Nothing left after cleaning.
    #[error("empty path")]
    Empty,

    /// Canonical result is not strictly below the canonical base.
    #[error("resolved path escapes storage root: {}", path.display())]
    Escape { path: PathBuf },

    /// The base directory itself could not be canonicalized.
    #[error("base directory unavailable: {} ({message})", base.display())]
    BaseUnavailable { base: PathBuf, message: String },

    /// Filename failed validation.
    #[error("unsafe filename: {}", reasons.join("; "))]
    UnsafeFilename { reasons: Vec<String> },
}

impl PathRejection {
    pub fn class(&self) -> ErrorClass {
        match self {
            Self::Traversal { .. } | Self::AbsolutePath { .. } | Self::Escape { .. } => {
                ErrorClass::SecurityRejection
            }
            Self::Empty | Self::UnsafeFilename { .. } => ErrorClass::Validation,
            Self::BaseUnavailable { .. } => ErrorClass::Io,
        }
    }

    /// Human-readable reason list.
    pub fn reasons(&self) -> Vec<String> {
        match self {
            Self::UnsafeFilename { reasons } => reasons.clone(),
            other => vec![other.to_string()],
        }
    }
}
