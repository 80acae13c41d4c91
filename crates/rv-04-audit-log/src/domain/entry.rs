//! The persisted audit entry.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use shared_types::{AuditAction, AuditEvent, Severity};
use uuid::Uuid;

/// One line of an audit log file. Immutable once created.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditLogEntry {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub user_id: String,
    pub username: String,
    pub action: AuditAction,
    pub resource: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub severity: Severity,
}

impl AuditLogEntry {
    /// Stamp an event with a fresh id and `timestamp`.
    pub fn from_event(event: AuditEvent, timestamp: DateTime<Utc>) -> Self {
        let severity = event.severity();
        let options = event.options;
        Self {
            id: Uuid::new_v4().to_string(),
            timestamp,
            user_id: event.user_id,
            username: event.username,
            action: event.action,
            resource: event.resource,
            resource_id: options.resource_id,
            details: options.details,
            ip_address: options.ip_address,
            user_agent: options.user_agent,
            success: options.success,
            error: options.error,
            severity,
        }
    }

    /// Day whose file this entry belongs to.
    pub fn date(&self) -> NaiveDate {
        self.timestamp.date_naive()
    }
}
