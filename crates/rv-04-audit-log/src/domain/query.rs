//! Filters over a day's entries.

use crate::domain::entry::AuditLogEntry;
use shared_types::{AuditAction, Severity};

#[derive(Debug, Clone, Default, PartialEq)]
pub struct AuditQuery {
    pub user_id: Option<String>,
    pub action: Option<AuditAction>,
    pub min_severity: Option<Severity>,
    pub success: Option<bool>,
    /// Maximum entries returned (newest first).
    pub limit: Option<usize>,
}

impl AuditQuery {
    pub fn matches(&self, entry: &AuditLogEntry) -> bool {
        self.user_id.as_ref().map_or(true, |u| *u == entry.user_id)
            && self.action.map_or(true, |a| a == entry.action)
            && self.min_severity.map_or(true, |s| entry.severity >= s)
            && self.success.map_or(true, |s| s == entry.success)
    }

    /// Matching entries, newest first, truncated to `limit`.
    pub fn apply(&self, entries: Vec<AuditLogEntry>) -> Vec<AuditLogEntry> {
        let matching = entries.into_iter().rev().filter(|e| self.matches(e));
        match self.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use shared_types::{Actor, AuditEvent, AuditOptions};

    fn entry(user: &str, action: AuditAction, success: bool) -> AuditLogEntry {
        let options = if success {
            AuditOptions::default()
        } else {
            AuditOptions::default().failed("x")
        };
        AuditLogEntry::from_event(
            AuditEvent::new(&Actor::new(user, user), action, "r", options),
            Utc::now(),
        )
    }

    #[test]
    fn test_filters_and_order() {
        let entries = vec![
            entry("a", AuditAction::Login, true),
            entry("b", AuditAction::LoginFailed, false),
            entry("a", AuditAction::StudentDeleted, true),
            entry("a", AuditAction::BackupCreated, true),
        ];

        let q = AuditQuery {
            user_id: Some("a".into()),
            min_severity: Some(Severity::High),
            ..AuditQuery::default()
        };
        let out = q.apply(entries.clone());
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].action, AuditAction::BackupCreated);

        let q = AuditQuery {
            success: Some(false),
            ..AuditQuery::default()
        };
        assert_eq!(q.apply(entries.clone())[0].user_id, "b");

        let q = AuditQuery {
            limit: Some(1),
            ..AuditQuery::default()
        };
        assert_eq!(q.apply(entries).len(), 1);
    }
}
