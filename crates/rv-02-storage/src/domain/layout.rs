//! # Directory Taxonomy
//!
//! ```text
//! <root>/
//! ├── students/<batch>/<rollNumber>/{metadata.json, profile_*.<ext>}
//! ├── events/<year>/<MM>-<month>/<eventId>/{metadata.json, photos/, reports/, attendance/}
//! ├── media/
//! ├── logs/audit-<yyyy-mm-dd>.log
//! ├── backups/backup-<timestamp>.zip
//! └── quarantine/
//! ```
//!
//! Every identifier segment passes through [`rv_01_path_sanitizer::sanitize`],
//! so the depth of an entity directory is fixed by its kind.

use crate::domain::errors::StorageError;
use rv_01_path_sanitizer::join_segments;
use shared_types::AuditAction;
use std::path::{Path, PathBuf};

/// Sidecar filename, one per entity.
pub const METADATA_FILE: &str = "metadata.json";

pub const STUDENTS_DIR: &str = "students";
pub const EVENTS_DIR: &str = "events";
pub const MEDIA_DIR: &str = "media";
pub const LOGS_DIR: &str = "logs";
pub const BACKUPS_DIR: &str = "backups";
pub const QUARANTINE_DIR: &str = "quarantine";

/// Top-level directories created at startup.
pub const AREAS: [&str; 6] = [
    STUDENTS_DIR,
    EVENTS_DIR,
    MEDIA_DIR,
    LOGS_DIR,
    BACKUPS_DIR,
    QUARANTINE_DIR,
];

const MONTH_NAMES: [&str; 12] = [
    "january",
    "february",
    "march",
    "april",
    "may",
    "june",
    "july",
    "august",
    "september",
    "october",
    "november",
    "december",
];

/// `03-march` style directory name for a 1-based month.
pub fn month_dir(month: u32) -> Option<String> {
    let name = MONTH_NAMES.get(month.checked_sub(1)? as usize)?;
    Some(format!("{month:02}-{name}"))
}

/// Identifies the entity that owns a directory and its sidecar.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum EntityRef {
    Student {
        batch: String,
        roll_number: String,
    },
    Event {
        year: String,
        month: u32,
        event_id: String,
    },
}

impl EntityRef {
    pub fn student(batch: impl Into<String>, roll_number: impl Into<String>) -> Self {
        Self::Student {
            batch: batch.into(),
            roll_number: roll_number.into(),
        }
    }

    pub fn event(year: impl Into<String>, month: u32, event_id: impl Into<String>) -> Self {
        Self::Event {
            year: year.into(),
            month,
            event_id: event_id.into(),
        }
    }

    /// Reject blank identifiers and out-of-range months.
    pub fn validate(&self) -> Result<(), StorageError> {
        let mut reasons = Vec::new();
        match self {
            Self::Student { batch, roll_number } => {
                if batch.trim().is_empty() {
                    reasons.push("batch is required".to_string());
                }
                if roll_number.trim().is_empty() {
                    reasons.push("roll number is required".to_string());
                }
            }
            Self::Event {
                year,
                month,
                event_id,
            } => {
                if year.trim().is_empty() {
                    reasons.push("year is required".to_string());
                }
                if month_dir(*month).is_none() {
                    reasons.push(format!("month must be 1-12, got {month}"));
                }
                if event_id.trim().is_empty() {
                    reasons.push("event id is required".to_string());
                }
            }
        }
        if reasons.is_empty() {
            Ok(())
        } else {
            Err(StorageError::Validation { reasons })
        }
    }

    /// Raw (unsanitized) segments below the storage root.
    fn segments(&self) -> Vec<String> {
        match self {
            Self::Student { batch, roll_number } => {
                vec![STUDENTS_DIR.into(), batch.clone(), roll_number.clone()]
            }
            Self::Event {
                year,
                month,
                event_id,
            } => vec![
                EVENTS_DIR.into(),
                year.clone(),
                month_dir(*month).unwrap_or_else(|| format!("{month:02}")),
                event_id.clone(),
            ],
        }
    }

    /// Resource kind used in audit entries.
    pub fn resource(&self) -> &'static str {
        match self {
            Self::Student { .. } => "student",
            Self::Event { .. } => "event",
        }
    }

    /// Resource id used in audit entries.
    pub fn resource_id(&self) -> String {
        match self {
            Self::Student { batch, roll_number } => format!("{batch}/{roll_number}"),
            Self::Event { event_id, .. } => event_id.clone(),
        }
    }

    /// Audit action for a sidecar write (`existed` = sidecar was already there).
    pub fn write_action(&self, existed: bool) -> AuditAction {
        match (self, existed) {
            (Self::Student { .. }, false) => AuditAction::StudentCreated,
            (Self::Student { .. }, true) => AuditAction::StudentUpdated,
            (Self::Event { .. }, false) => AuditAction::EventCreated,
            (Self::Event { .. }, true) => AuditAction::EventUpdated,
        }
    }

    pub fn delete_action(&self) -> AuditAction {
        match self {
            Self::Student { .. } => AuditAction::StudentDeleted,
            Self::Event { .. } => AuditAction::EventDeleted,
        }
    }
}

/// Broad payload class that selects the size ceiling.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssetKind {
    Image,
    Document,
}

/// What an uploaded binary is for; selects directory and MIME allow-list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssetCategory {
    StudentProfile,
    EventPhoto,
    EventReport,
    EventAttendance,
}

const IMAGE_TYPES: &[&str] = &["image/jpeg", "image/png", "image/webp", "image/gif"];

const REPORT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
];

const ATTENDANCE_TYPES: &[&str] = &[
    "application/pdf",
    "text/csv",
    "application/vnd.ms-excel",
    "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet",
];

impl AssetCategory {
    pub fn kind(&self) -> AssetKind {
        match self {
            Self::StudentProfile | Self::EventPhoto => AssetKind::Image,
            Self::EventReport | Self::EventAttendance => AssetKind::Document,
        }
    }

    pub fn allowed_mime_types(&self) -> &'static [&'static str] {
        match self {
            Self::StudentProfile | Self::EventPhoto => IMAGE_TYPES,
            Self::EventReport => REPORT_TYPES,
            Self::EventAttendance => ATTENDANCE_TYPES,
        }
    }

    pub fn allows(&self, mime: &str) -> bool {
        self.allowed_mime_types()
            .iter()
            .any(|m| m.eq_ignore_ascii_case(mime))
    }

    /// Sub-directory inside the entity directory (`None` = entity directory itself).
    pub fn subdir(&self) -> Option<&'static str> {
        match self {
            Self::StudentProfile => None,
            Self::EventPhoto => Some("photos"),
            Self::EventReport => Some("reports"),
            Self::EventAttendance => Some("attendance"),
        }
    }

    /// Whether this category can be attached to `entity`.
    pub fn applies_to(&self, entity: &EntityRef) -> bool {
        matches!(
            (self, entity),
            (Self::StudentProfile, EntityRef::Student { .. })
                | (
                    Self::EventPhoto | Self::EventReport | Self::EventAttendance,
                    EntityRef::Event { .. }
                )
        )
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::StudentProfile => "student_profile",
            Self::EventPhoto => "event_photo",
            Self::EventReport => "event_report",
            Self::EventAttendance => "event_attendance",
        }
    }
}

/// Deterministic mapping from identifiers to directories under a root.
#[derive(Debug, Clone)]
pub struct StorageLayout {
    root: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn area(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    pub fn entity_dir(&self, entity: &EntityRef) -> PathBuf {
        join_segments(&self.root, entity.segments())
    }

    pub fn asset_dir(&self, entity: &EntityRef, category: AssetCategory) -> PathBuf {
        let dir = self.entity_dir(entity);
        match category.subdir() {
            Some(sub) => dir.join(sub),
            None => dir,
        }
    }

    pub fn metadata_path(&self, entity: &EntityRef) -> PathBuf {
        self.entity_dir(entity).join(METADATA_FILE)
    }

    /// Root-relative, `/`-separated form of a path under the root.
    pub fn relative(&self, path: &Path) -> Option<String> {
        let rel = path.strip_prefix(&self.root).ok()?;
        let parts: Vec<String> = rel
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect();
        Some(parts.join("/"))
    }
}
