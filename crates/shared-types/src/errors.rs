//! # Error Taxonomy
//!
//! Every subsystem error classifies into exactly one [`ErrorClass`]. Callers
//! at the boundary (HTTP handlers, the admin CLI) branch on the class rather
//! than on subsystem-specific variants.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Cross-subsystem error classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// Bad input shape, disallowed MIME type, oversized file, unsafe filename.
    Validation,
    /// Missing metadata, backup or file.
    NotFound,
    /// Path traversal attempt, malware-signature match. Must be audit-logged.
    SecurityRejection,
    /// Disk read/write failure.
    Io,
    /// Storage root unusable. The only class that aborts process startup.
    FatalConfiguration,
}

impl ErrorClass {
    /// Whether the caller can recover from this class at the operation boundary.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, Self::FatalConfiguration)
    }

    /// HTTP status an outer surface should map this class to.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::Validation => 400,
            Self::NotFound => 404,
            Self::SecurityRejection => 403,
            Self::Io | Self::FatalConfiguration => 500,
        }
    }
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Validation => "validation",
            Self::NotFound => "not_found",
            Self::SecurityRejection => "security_rejection",
            Self::Io => "io",
            Self::FatalConfiguration => "fatal_configuration",
        };
        write!(f, "{s}")
    }
}
