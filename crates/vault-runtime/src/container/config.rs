//! # Vault Configuration
//!
//! Unified configuration for every subsystem, with environment overrides.
//!
//! | Variable | Field |
//! |----------|-------|
//! | `VAULT_STORAGE_ROOT` | `storage.root` |
//! | `VAULT_PUBLIC_PREFIX` | `storage.public_prefix` |
//! | `VAULT_DATA_DIR` | `data_dir` |
//! | `VAULT_CONFIG_DIR` | `config_dir` |
//! | `VAULT_MAX_BACKUPS` | `max_backups` |
//! | `VAULT_AUDIT_FLUSH_SECS` | `audit_flush_interval` |
//! | `VAULT_AUDIT_MAX_FILE_BYTES` | `audit_max_file_bytes` |
//! | `VAULT_MAX_IMAGE_BYTES` | `storage.max_image_bytes` |
//! | `VAULT_MAX_DOCUMENT_BYTES` | `storage.max_document_bytes` |

use rv_02_storage::{StorageConfig, LOGS_DIR};
use rv_03_backup::{BackupConfig, DEFAULT_MAX_BACKUPS};
use rv_04_audit_log::{
    AuditConfig, DEFAULT_FLUSH_INTERVAL, DEFAULT_MAX_BUFFER_ENTRIES, DEFAULT_MAX_FILE_BYTES,
};
use rv_05_rate_limiter::DEFAULT_CLEANUP_PROBABILITY;
use std::env;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Complete vault configuration.
#[derive(Debug, Clone)]
pub struct VaultConfig {
    /// Storage root and upload limits.
    pub storage: StorageConfig,
    /// Flat user-record directory, captured as the `users` backup area.
    pub data_dir: PathBuf,
    /// Directory of the allow-listed configuration files.
    pub config_dir: PathBuf,
    /// Backups kept by retention.
    pub max_backups: usize,
    pub audit_flush_interval: Duration,
    pub audit_max_file_bytes: u64,
    pub audit_max_buffer_entries: usize,
    /// Fraction of rate-limit checks that sweep expired entries.
    pub rate_limit_cleanup_probability: f64,
}

impl Default for VaultConfig {
    fn default() -> Self {
        Self {
            storage: StorageConfig::default(),
            data_dir: PathBuf::from("./data"),
            config_dir: PathBuf::from("."),
            max_backups: DEFAULT_MAX_BACKUPS,
            audit_flush_interval: DEFAULT_FLUSH_INTERVAL,
            audit_max_file_bytes: DEFAULT_MAX_FILE_BYTES,
            audit_max_buffer_entries: DEFAULT_MAX_BUFFER_ENTRIES,
            rate_limit_cleanup_probability: DEFAULT_CLEANUP_PROBABILITY,
        }
    }
}

/// Configuration errors.
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("environment variable {name}={value:?} is not valid: {reason}")]
    InvalidVar {
        name: &'static str,
        value: String,
        reason: String,
    },

    #[error("{field} must be greater than zero")]
    Zero { field: &'static str },

    #[error("{field} is out of range: {reason}")]
    OutOfRange { field: &'static str, reason: String },
}

impl VaultConfig {
    /// Configuration rooted at `root` with defaults elsewhere.
    pub fn with_root(root: impl Into<PathBuf>) -> Self {
        Self {
            storage: StorageConfig::with_root(root),
            ..Self::default()
        }
    }

    /// Defaults overridden from the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    pub(crate) fn from_lookup(
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        let mut config = Self::default();

        if let Some(root) = lookup("VAULT_STORAGE_ROOT") {
            config.storage.root = PathBuf::from(root);
        }
        if let Some(prefix) = lookup("VAULT_PUBLIC_PREFIX") {
            config.storage.public_prefix = prefix;
        }
        if let Some(dir) = lookup("VAULT_DATA_DIR") {
            config.data_dir = PathBuf::from(dir);
        }
        if let Some(dir) = lookup("VAULT_CONFIG_DIR") {
            config.config_dir = PathBuf::from(dir);
        }
        if let Some(n) = parse_var(&lookup, "VAULT_MAX_BACKUPS")? {
            config.max_backups = n;
        }
        if let Some(secs) = parse_var::<u64>(&lookup, "VAULT_AUDIT_FLUSH_SECS")? {
            config.audit_flush_interval = Duration::from_secs(secs);
        }
        if let Some(bytes) = parse_var(&lookup, "VAULT_AUDIT_MAX_FILE_BYTES")? {
            config.audit_max_file_bytes = bytes;
        }
        if let Some(bytes) = parse_var(&lookup, "VAULT_MAX_IMAGE_BYTES")? {
            config.storage.max_image_bytes = bytes;
        }
        if let Some(bytes) = parse_var(&lookup, "VAULT_MAX_DOCUMENT_BYTES")? {
            config.storage.max_document_bytes = bytes;
        }

        Ok(config)
    }

    /// Reject values no deployment could mean.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let nonzero = [
            ("max_backups", self.max_backups as u64),
            ("audit_flush_interval", self.audit_flush_interval.as_millis() as u64),
            ("audit_max_file_bytes", self.audit_max_file_bytes),
            ("audit_max_buffer_entries", self.audit_max_buffer_entries as u64),
            ("storage.max_image_bytes", self.storage.max_image_bytes),
            ("storage.max_document_bytes", self.storage.max_document_bytes),
        ];
        if let Some(&(field, _)) = nonzero.iter().find(|(_, v)| *v == 0) {
            return Err(ConfigError::Zero { field });
        }

        if !(0.0..=8.0).contains(&self.storage.entropy_threshold) {
            return Err(ConfigError::OutOfRange {
                field: "storage.entropy_threshold",
                reason: "entropy is measured in bits per byte (0 to 8)".to_string(),
            });
        }
        if !(0.0..=1.0).contains(&self.rate_limit_cleanup_probability) {
            return Err(ConfigError::OutOfRange {
                field: "rate_limit_cleanup_probability",
                reason: "must be a probability (0 to 1)".to_string(),
            });
        }
        if self.storage.root.as_os_str().is_empty() {
            return Err(ConfigError::OutOfRange {
                field: "storage.root",
                reason: "must not be empty".to_string(),
            });
        }
        Ok(())
    }

    /// Backup engine configuration for a storage tree at `storage_root`.
    pub fn backup_config(&self, storage_root: &Path) -> BackupConfig {
        BackupConfig {
            data_dir: self.data_dir.clone(),
            config_dir: self.config_dir.clone(),
            max_backups: self.max_backups,
            ..BackupConfig::for_root(storage_root)
        }
    }

    /// Audit logger configuration writing under `<storage_root>/logs`.
    pub fn audit_config(&self, storage_root: &Path) -> AuditConfig {
        AuditConfig {
            log_dir: storage_root.join(LOGS_DIR),
            flush_interval: self.audit_flush_interval,
            max_file_bytes: self.audit_max_file_bytes,
            max_buffer_entries: self.audit_max_buffer_entries,
        }
    }
}

fn parse_var<T>(
    lookup: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    let Some(value) = lookup(name) else {
        return Ok(None);
    };
    let parsed = value.trim().parse::<T>();
    match parsed {
        Ok(v) => Ok(Some(v)),
        Err(e) => Err(ConfigError::InvalidVar {
            name,
            reason: e.to_string(),
            value,
        }),
    }
}
