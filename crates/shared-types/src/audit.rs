//! # Audit Vocabulary and Sink Port
//!
//! The closed set of auditable actions, the severity scale, and the outbound
//! port through which storage, backup and restore emit audit entries.
//!
//! ## Severity Table
//!
//! | Severity | Actions |
//! |----------|---------|
//! | low | read-only actions, successful login/logout |
//! | medium | create/update, uploads, exports, failed logins |
//! | high | deletes, bulk operations, imports, password changes, security events |
//! | critical | backup, restore, system settings, account lockouts |
//!
//! A failed outcome escalates low and medium by one level.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Audited actions (closed vocabulary).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    // Authentication
    Login,
    LoginFailed,
    Logout,
    PasswordChanged,
    AccountLocked,

    // Student lifecycle
    StudentCreated,
    StudentUpdated,
    StudentDeleted,
    StudentViewed,
    StudentsBulkCreated,
    StudentsBulkDeleted,

    // Event lifecycle
    EventCreated,
    EventUpdated,
    EventDeleted,
    EventViewed,
    EventsBulkCreated,
    EventsBulkDeleted,

    // File operations
    FileUploaded,
    FileDeleted,
    FileImported,
    FileExported,

    // System operations
    BackupCreated,
    BackupRestored,
    SystemSettingsChanged,

    // Security events
    UnauthorizedAccess,
    PermissionDenied,
    SuspiciousActivity,
}

impl AuditAction {
    /// Every action, in declaration order.
    pub const ALL: [AuditAction; 27] = [
        Self::Login,
        Self::LoginFailed,
        Self::Logout,
        Self::PasswordChanged,
        Self::AccountLocked,
        Self::StudentCreated,
        Self::StudentUpdated,
        Self::StudentDeleted,
        Self::StudentViewed,
        Self::StudentsBulkCreated,
        Self::StudentsBulkDeleted,
        Self::EventCreated,
        Self::EventUpdated,
        Self::EventDeleted,
        Self::EventViewed,
        Self::EventsBulkCreated,
        Self::EventsBulkDeleted,
        Self::FileUploaded,
        Self::FileDeleted,
        Self::FileImported,
        Self::FileExported,
        Self::BackupCreated,
        Self::BackupRestored,
        Self::SystemSettingsChanged,
        Self::UnauthorizedAccess,
        Self::PermissionDenied,
        Self::SuspiciousActivity,
    ];

    /// Severity from the fixed action table, before outcome escalation.
    pub const fn base_severity(&self) -> Severity {
        match self {
            Self::Login | Self::Logout | Self::StudentViewed | Self::EventViewed => Severity::Low,

            Self::LoginFailed
            | Self::StudentCreated
            | Self::StudentUpdated
            | Self::EventCreated
            | Self::EventUpdated
            | Self::FileUploaded
            | Self::FileExported => Severity::Medium,

            Self::PasswordChanged
            | Self::StudentDeleted
            | Self::StudentsBulkCreated
            | Self::StudentsBulkDeleted
            | Self::EventDeleted
            | Self::EventsBulkCreated
            | Self::EventsBulkDeleted
            | Self::FileDeleted
            | Self::FileImported
            | Self::UnauthorizedAccess
            | Self::PermissionDenied
            | Self::SuspiciousActivity => Severity::High,

            Self::AccountLocked
            | Self::BackupCreated
            | Self::BackupRestored
            | Self::SystemSettingsChanged => Severity::Critical,
        }
    }

    /// Severity for an action/outcome pair.
    pub fn severity_for(&self, success: bool) -> Severity {
        let base = self.base_severity();
        if success {
            base
        } else {
            base.escalated()
        }
    }

    /// Grouping used by log queries and dashboards.
    pub const fn category(&self) -> &'static str {
        match self {
            Self::Login
            | Self::LoginFailed
            | Self::Logout
            | Self::PasswordChanged
            | Self::AccountLocked => "authentication",
            Self::StudentCreated
            | Self::StudentUpdated
            | Self::StudentDeleted
            | Self::StudentViewed
            | Self::StudentsBulkCreated
            | Self::StudentsBulkDeleted => "student",
            Self::EventCreated
            | Self::EventUpdated
            | Self::EventDeleted
            | Self::EventViewed
            | Self::EventsBulkCreated
            | Self::EventsBulkDeleted => "event",
            Self::FileUploaded | Self::FileDeleted | Self::FileImported | Self::FileExported => {
                "file"
            }
            Self::BackupCreated | Self::BackupRestored | Self::SystemSettingsChanged => "system",
            Self::UnauthorizedAccess | Self::PermissionDenied | Self::SuspiciousActivity => {
                "security"
            }
        }
    }

    /// Wire name (matches the serialized form).
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Login => "login",
            Self::LoginFailed => "login_failed",
            Self::Logout => "logout",
            Self::PasswordChanged => "password_changed",
            Self::AccountLocked => "account_locked",
            Self::StudentCreated => "student_created",
            Self::StudentUpdated => "student_updated",
            Self::StudentDeleted => "student_deleted",
            Self::StudentViewed => "student_viewed",
            Self::StudentsBulkCreated => "students_bulk_created",
            Self::StudentsBulkDeleted => "students_bulk_deleted",
            Self::EventCreated => "event_created",
            Self::EventUpdated => "event_updated",
            Self::EventDeleted => "event_deleted",
            Self::EventViewed => "event_viewed",
            Self::EventsBulkCreated => "events_bulk_created",
            Self::EventsBulkDeleted => "events_bulk_deleted",
            Self::FileUploaded => "file_uploaded",
            Self::FileDeleted => "file_deleted",
            Self::FileImported => "file_imported",
            Self::FileExported => "file_exported",
            Self::BackupCreated => "backup_created",
            Self::BackupRestored => "backup_restored",
            Self::SystemSettingsChanged => "system_settings_changed",
            Self::UnauthorizedAccess => "unauthorized_access",
            Self::PermissionDenied => "permission_denied",
            Self::SuspiciousActivity => "suspicious_activity",
        }
    }
}

impl fmt::Display for AuditAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for AuditAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|a| a.as_str() == s)
            .ok_or_else(|| format!("unknown audit action: {s}"))
    }
}

/// Audit severity, ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// One level up for failed outcomes; high and critical are unchanged.
    pub const fn escalated(self) -> Self {
        match self {
            Self::Low => Self::Medium,
            Self::Medium | Self::High => Self::High,
            Self::Critical => Self::Critical,
        }
    }

    /// Wire name.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for Severity {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "low" => Ok(Self::Low),
            "medium" => Ok(Self::Medium),
            "high" => Ok(Self::High),
            "critical" => Ok(Self::Critical),
            other => Err(format!("unknown severity: {other}")),
        }
    }
}

/// Optional fields of an audit call.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditOptions {
    pub resource_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub success: bool,
    pub error: Option<String>,
    /// Explicit override of the derived severity.
    pub severity: Option<Severity>,
}

impl Default for AuditOptions {
    fn default() -> Self {
        Self {
            resource_id: None,
            details: None,
            ip_address: None,
            user_agent: None,
            success: true,
            error: None,
            severity: None,
        }
    }
}

impl AuditOptions {
    pub fn resource_id(mut self, id: impl Into<String>) -> Self {
        self.resource_id = Some(id.into());
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }

    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.user_agent = Some(agent.into());
        self
    }

    /// Mark the outcome as failed with a reason.
    pub fn failed(mut self, error: impl Into<String>) -> Self {
        self.success = false;
        self.error = Some(error.into());
        self
    }

    pub fn severity(mut self, severity: Severity) -> Self {
        self.severity = Some(severity);
        self
    }
}

/// A request to record one audit entry.
///
/// The sink assigns the id and timestamp; severity is resolved here so every
/// sink agrees on it.
#[derive(Debug, Clone, PartialEq)]
pub struct AuditEvent {
    pub user_id: String,
    pub username: String,
    pub action: AuditAction,
    pub resource: String,
    pub options: AuditOptions,
}

impl AuditEvent {
    pub fn new(
        actor: &crate::Actor,
        action: AuditAction,
        resource: impl Into<String>,
        options: AuditOptions,
    ) -> Self {
        Self {
            user_id: actor.user_id.clone(),
            username: actor.username.clone(),
            action,
            resource: resource.into(),
            options,
        }
    }

    /// Explicit severity if supplied, otherwise the action/outcome table.
    pub fn severity(&self) -> Severity {
        self.options
            .severity
            .unwrap_or_else(|| self.action.severity_for(self.options.success))
    }
}

/// Outbound port for audit emission.
///
/// Implementations must not fail the caller: a sink that cannot persist keeps
/// the entry for retry and logs the problem.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Record an audit event. Critical events are durable when this returns.
    async fn record(&self, event: AuditEvent);
}

/// Sink that drops everything. Used where auditing is not wired.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}
