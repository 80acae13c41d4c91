//! # Audit Flows
//!
//! Durability of the audit trail as seen by the rest of the vault: critical
//! entries are on disk when the call returns, everything else after the next
//! flush tick or at shutdown.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{start_vault, vault_config};
    use chrono::Utc;
    use rv_04_audit_log::AuditQuery;
    use serde_json::json;
    use shared_types::{AuditAction, AuditOptions, Severity};
    use std::time::Duration;
    use vault_runtime::VaultContext;

    #[tokio::test]
    async fn test_critical_entry_durable_on_return() {
        let (_dir, ctx) = start_vault().await;
        let today = Utc::now().date_naive();
        let audit = ctx.audit();

        let locked = audit
            .log(
                "u-7",
                "mallory",
                AuditAction::AccountLocked,
                "user",
                AuditOptions::default()
                    .resource_id("u-7")
                    .ip_address("203.0.113.7")
                    .details(json!({"attempts": 5})),
            )
            .await;
        assert_eq!(locked.severity, Severity::Critical);

        let on_disk = audit.read_entries(today).await.unwrap();
        assert!(on_disk.iter().any(|e| e.id == locked.id));

        let viewed = audit
            .log(
                "u-8",
                "trent",
                AuditAction::StudentViewed,
                "student",
                AuditOptions::default().resource_id("2021/21BCE1234"),
            )
            .await;
        assert_eq!(viewed.severity, Severity::Low);
        let on_disk = audit.read_entries(today).await.unwrap();
        assert!(!on_disk.iter().any(|e| e.id == viewed.id));
        assert_eq!(audit.pending(), 1);

        audit.flush().await.unwrap();
        let on_disk = audit.read_entries(today).await.unwrap();
        assert!(on_disk.iter().any(|e| e.id == viewed.id));

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_periodic_tick_flushes_buffer() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = vault_config(dir.path());
        config.audit_flush_interval = Duration::from_millis(50);
        let ctx = VaultContext::initialize(config).await.unwrap();
        let today = Utc::now().date_naive();

        let entry = ctx
            .audit()
            .log("u-1", "alice", AuditAction::Login, "session", AuditOptions::default())
            .await;

        let mut persisted = false;
        for _ in 0..40 {
            tokio::time::sleep(Duration::from_millis(25)).await;
            let on_disk = ctx.audit().read_entries(today).await.unwrap();
            if on_disk.iter().any(|e| e.id == entry.id) {
                persisted = true;
                break;
            }
        }
        assert!(persisted, "low-severity entry never reached disk");
        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_query_across_services() {
        let (_dir, ctx) = start_vault().await;
        let today = Utc::now().date_naive();
        let audit = ctx.audit();

        for (user, action, ok) in [
            ("u-1", AuditAction::Login, true),
            ("u-2", AuditAction::LoginFailed, false),
            ("u-2", AuditAction::LoginFailed, false),
            ("u-1", AuditAction::StudentDeleted, true),
        ] {
            let options = if ok {
                AuditOptions::default()
            } else {
                AuditOptions::default().failed("bad password")
            };
            audit.log(user, user, action, "session", options).await;
        }
        audit.flush().await.unwrap();

        let failed_logins = audit
            .query(
                today,
                &AuditQuery {
                    action: Some(AuditAction::LoginFailed),
                    success: Some(false),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(failed_logins.len(), 2);
        assert!(failed_logins.iter().all(|e| e.severity == Severity::High));

        let serious = audit
            .query(
                today,
                &AuditQuery {
                    min_severity: Some(Severity::High),
                    user_id: Some("u-1".to_string()),
                    limit: Some(5),
                    ..AuditQuery::default()
                },
            )
            .await
            .unwrap();
        assert_eq!(serious.len(), 1);
        assert_eq!(serious[0].action, AuditAction::StudentDeleted);

        ctx.shutdown().await.unwrap();
    }
}
