//! Storage configuration.

use std::path::PathBuf;

/// Maximum image upload (profile pictures, event photos).
pub const DEFAULT_MAX_IMAGE_BYTES: u64 = 5 * 1024 * 1024;

/// Maximum document upload (reports, attendance sheets).
pub const DEFAULT_MAX_DOCUMENT_BYTES: u64 = 10 * 1024 * 1024;

/// Bits per byte above which a plain-text upload is flagged.
pub const DEFAULT_ENTROPY_THRESHOLD: f64 = 7.5;

/// Storage layer configuration.
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Storage root directory.
    pub root: PathBuf,
    /// URL prefix of public asset references.
    pub public_prefix: String,
    /// Size ceiling for image categories.
    pub max_image_bytes: u64,
    /// Size ceiling for document categories.
    pub max_document_bytes: u64,
    /// Entropy advisory threshold for text uploads.
    pub entropy_threshold: f64,
    /// Keep rejected payloads under `quarantine/` for review.
    pub quarantine_enabled: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("./storage"),
            public_prefix: "/storage".to_string(),
            max_image_bytes: DEFAULT_MAX_IMAGE_BYTES,
            max_document_bytes: DEFAULT_MAX_DOCUMENT_BYTES,
            entropy_threshold: DEFAULT_ENTROPY_THRESHOLD,
            quarantine_enabled: true,
        }
    }
}

impl StorageConfig {
    /// Configuration rooted at `root` with default limits.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }
}
