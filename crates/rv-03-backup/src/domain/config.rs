//! Backup configuration and per-call options.

use rv_02_storage::{BACKUPS_DIR, EVENTS_DIR, LOGS_DIR, MEDIA_DIR, STUDENTS_DIR};
use std::path::PathBuf;

/// Snapshots kept after each backup.
pub const DEFAULT_MAX_BACKUPS: usize = 10;

/// Configuration files captured verbatim when present.
pub const DEFAULT_CONFIG_FILES: &[&str] = &["config.json", "settings.json", "vault.env"];

/// Areas a snapshot can capture.
///
/// The first four live under the storage root; `Users` is the flat record
/// directory serialised into the snapshot's `data` field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BackupArea {
    Students,
    Events,
    Media,
    Logs,
    Users,
}

impl BackupArea {
    pub const ALL: [BackupArea; 5] = [
        Self::Students,
        Self::Events,
        Self::Media,
        Self::Logs,
        Self::Users,
    ];

    /// Storage-root areas, in walk order.
    pub const STORAGE: [BackupArea; 4] = [Self::Students, Self::Events, Self::Media, Self::Logs];

    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Students => STUDENTS_DIR,
            Self::Events => EVENTS_DIR,
            Self::Media => MEDIA_DIR,
            Self::Logs => LOGS_DIR,
            Self::Users => "users",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|a| a.as_str() == name)
    }
}

/// Where the engine reads from and writes to.
#[derive(Debug, Clone)]
pub struct BackupConfig {
    pub storage_root: PathBuf,
    /// Flat user-record directory.
    pub data_dir: PathBuf,
    /// Directory holding the allow-listed configuration files.
    pub config_dir: PathBuf,
    pub config_files: Vec<String>,
    pub backup_dir: PathBuf,
    pub max_backups: usize,
}

impl Default for BackupConfig {
    fn default() -> Self {
        Self::for_root("./storage")
    }
}

impl BackupConfig {
    /// Defaults derived from a storage root (`<root>/backups`, `./data`, `.`).
    pub fn for_root(storage_root: impl Into<PathBuf>) -> Self {
        let storage_root = storage_root.into();
        Self {
            backup_dir: storage_root.join(BACKUPS_DIR),
            storage_root,
            data_dir: PathBuf::from("./data"),
            config_dir: PathBuf::from("."),
            config_files: DEFAULT_CONFIG_FILES.iter().map(|s| s.to_string()).collect(),
            max_backups: DEFAULT_MAX_BACKUPS,
        }
    }

    pub fn is_allowed_config(&self, name: &str) -> bool {
        self.config_files.iter().any(|c| c == name)
    }
}

/// What a backup includes. Everything by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BackupOptions {
    pub description: String,
    pub students: bool,
    pub events: bool,
    pub media: bool,
    pub logs: bool,
    pub users: bool,
    pub config: bool,
}

impl Default for BackupOptions {
    fn default() -> Self {
        Self {
            description: "Manual backup".to_string(),
            students: true,
            events: true,
            media: true,
            logs: true,
            users: true,
            config: true,
        }
    }
}

impl BackupOptions {
    pub fn described(description: impl Into<String>) -> Self {
        Self {
            description: description.into(),
            ..Self::default()
        }
    }

    pub fn includes(&self, area: BackupArea) -> bool {
        match area {
            BackupArea::Students => self.students,
            BackupArea::Events => self.events,
            BackupArea::Media => self.media,
            BackupArea::Logs => self.logs,
            BackupArea::Users => self.users,
        }
    }
}

/// What a restore replays. Everything except logs by default.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoreOptions {
    pub students: bool,
    pub events: bool,
    pub media: bool,
    pub logs: bool,
    pub users: bool,
    pub config: bool,
    /// Skip the safety snapshot of the current state.
    pub skip_pre_restore_backup: bool,
    /// Clear each restored storage area and the user-record directory
    /// before replaying it.
    pub replace_existing: bool,
}

impl Default for RestoreOptions {
    fn default() -> Self {
        Self {
            students: true,
            events: true,
            media: true,
            logs: false,
            users: true,
            config: true,
            skip_pre_restore_backup: false,
            replace_existing: true,
        }
    }
}

impl RestoreOptions {
    pub fn includes(&self, area: BackupArea) -> bool {
        match area {
            BackupArea::Students => self.students,
            BackupArea::Events => self.events,
            BackupArea::Media => self.media,
            BackupArea::Logs => self.logs,
            BackupArea::Users => self.users,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let backup = BackupOptions::default();
        assert!(BackupArea::ALL.iter().all(|a| backup.includes(*a)));

        let restore = RestoreOptions::default();
        assert!(!restore.includes(BackupArea::Logs));
        assert!(restore.includes(BackupArea::Students));
        assert!(restore.replace_existing);
        assert!(!restore.skip_pre_restore_backup);
    }

    #[test]
    fn test_area_names() {
        assert_eq!(BackupArea::from_name("events"), Some(BackupArea::Events));
        assert_eq!(BackupArea::from_name("backups"), None);
        assert_eq!(BackupArea::Users.as_str(), "users");
    }

    #[test]
    fn test_config_allow_list() {
        let config = BackupConfig::for_root("/srv/storage");
        assert_eq!(config.backup_dir, PathBuf::from("/srv/storage/backups"));
        assert!(config.is_allowed_config("settings.json"));
        assert!(!config.is_allowed_config("../etc/passwd"));
    }
}
