//! # Backup / Restore Flows
//!
//! Snapshots taken through a live [`vault_runtime::VaultContext`]: the storage
//! areas, user records and config files written by one set of services are
//! reproduced byte-for-byte by restore.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{audit_text, png, read_tree, start_vault};
    use rv_02_storage::{AssetCategory, EntityRef, UploadRequest};
    use rv_03_backup::{BackupError, BackupOptions, RestoreOptions};
    use serde_json::json;
    use shared_types::{Actor, ErrorClass};

    // =========================================================================
    // ROUND TRIP
    // =========================================================================

    #[tokio::test]
    async fn test_restore_reproduces_snapshot_exactly() {
        let (dir, ctx) = start_vault().await;
        let admin = Actor::new("u-1", "registrar");
        let root = ctx.storage().root().to_path_buf();

        let student = EntityRef::student("2021", "21BCE1234");
        let event = EntityRef::event("2024", 3, "ev-7");
        ctx.metadata()
            .save_metadata(&admin, &student, json!({"name": "Asha", "cgpa": 9.1}))
            .await
            .unwrap();
        ctx.metadata()
            .save_metadata(&admin, &event, json!({"title": "Hackathon", "seats": 120}))
            .await
            .unwrap();
        let photo = png(4096);
        ctx.storage()
            .save_binary(
                &admin,
                UploadRequest {
                    entity: event.clone(),
                    category: AssetCategory::EventPhoto,
                    bytes: &photo,
                    mime_type: "image/png",
                    original_name: "stage.png",
                },
            )
            .await
            .unwrap();
        std::fs::create_dir_all(dir.path().join("data")).unwrap();
        std::fs::write(dir.path().join("data/users.json"), b"[{\"id\":\"u-1\"}]").unwrap();
        std::fs::create_dir_all(dir.path().join("conf")).unwrap();
        std::fs::write(dir.path().join("conf/config.json"), b"{ \"theme\": \"dark\" }\n").unwrap();

        let students_before = read_tree(&root.join("students"));
        let events_before = read_tree(&root.join("events"));
        let users_before = read_tree(&dir.path().join("data"));
        assert_eq!(events_before.len(), 2);

        let id = ctx
            .backups()
            .create_backup(&admin, BackupOptions::described("before cleanup"))
            .await
            .unwrap();

        // Damage every captured area.
        ctx.storage().delete_entity(&admin, &student).await.unwrap();
        std::fs::write(root.join("events/2024/stray.txt"), b"not in snapshot").unwrap();
        std::fs::write(dir.path().join("data/users.json"), b"[]").unwrap();
        std::fs::write(dir.path().join("conf/config.json"), b"{}").unwrap();

        let report = ctx
            .backups()
            .restore_backup(&admin, &id, RestoreOptions::default())
            .await
            .unwrap();

        assert!(report.is_complete(), "errors: {:?}", report.errors);
        assert!(report.pre_restore_backup.is_some());
        for area in ["students", "events", "media", "users", "config"] {
            assert!(report.restored.iter().any(|r| r == area), "{area} not restored");
        }
        assert!(!report.restored.iter().any(|r| r == "logs"));

        assert_eq!(read_tree(&root.join("students")), students_before);
        assert_eq!(read_tree(&root.join("events")), events_before);
        assert_eq!(read_tree(&dir.path().join("data")), users_before);
        assert_eq!(
            std::fs::read(dir.path().join("conf/config.json")).unwrap(),
            b"{ \"theme\": \"dark\" }\n"
        );

        let listed = ctx.backups().list_backups().await.unwrap();
        assert_eq!(listed.len(), 2);
        assert_eq!(Some(&listed[0].id), report.pre_restore_backup.as_ref());
        assert_eq!(listed[1].id, id);

        ctx.shutdown().await.unwrap();
        let trail = audit_text(&root);
        assert!(trail.contains("backup_restored"));
        assert!(trail.contains("student_deleted"));
    }

    #[tokio::test]
    async fn test_pre_restore_backup_captures_damaged_state() {
        let (_dir, ctx) = start_vault().await;
        let admin = Actor::system();
        let student = EntityRef::student("2022", "22BCE0001");
        ctx.metadata()
            .save_metadata(&admin, &student, json!({"name": "original"}))
            .await
            .unwrap();
        let id = ctx
            .backups()
            .create_backup(&admin, BackupOptions::default())
            .await
            .unwrap();

        ctx.metadata()
            .save_metadata(&admin, &student, json!({"name": "edited later"}))
            .await
            .unwrap();
        let report = ctx
            .backups()
            .restore_backup(&admin, &id, RestoreOptions::default())
            .await
            .unwrap();
        let safety = report.pre_restore_backup.unwrap();

        let restored = ctx.metadata().read_metadata(&student).await.unwrap();
        assert_eq!(restored["name"], "original");

        // The safety snapshot can undo the restore.
        let undo = RestoreOptions {
            skip_pre_restore_backup: true,
            ..RestoreOptions::default()
        };
        ctx.backups()
            .restore_backup(&admin, &safety, undo)
            .await
            .unwrap();
        let back = ctx.metadata().read_metadata(&student).await.unwrap();
        assert_eq!(back["name"], "edited later");

        ctx.shutdown().await.unwrap();
    }

    // =========================================================================
    // RETENTION AND LIFECYCLE
    // =========================================================================

    #[tokio::test]
    async fn test_eleventh_backup_evicts_oldest() {
        let (_dir, ctx) = start_vault().await;
        let admin = Actor::system();
        assert_eq!(ctx.backups().config().max_backups, 10);

        let mut ids = Vec::new();
        for n in 0..11 {
            ids.push(
                ctx.backups()
                    .create_backup(&admin, BackupOptions::described(format!("nightly {n}")))
                    .await
                    .unwrap(),
            );
        }

        let mut sorted = ids.clone();
        sorted.sort();
        assert_eq!(sorted, ids, "ids must sort in creation order");

        let listed: Vec<String> = ctx
            .backups()
            .list_backups()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(listed.len(), 10);
        assert!(!listed.contains(&ids[0]));
        assert_eq!(listed[0], ids[10]);
        assert_eq!(listed[9], ids[1]);

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_verify_and_delete() {
        let (_dir, ctx) = start_vault().await;
        let admin = Actor::new("u-9", "ops");
        ctx.metadata()
            .save_metadata(&admin, &EntityRef::student("2023", "23MIS0042"), json!({"a": 1}))
            .await
            .unwrap();
        let id = ctx
            .backups()
            .create_backup(&admin, BackupOptions::described("verify me"))
            .await
            .unwrap();

        let report = ctx.backups().verify_backup(&id).await.unwrap();
        assert!(report.is_valid());
        assert_eq!(report.metadata.description, "verify me");
        assert_eq!(report.areas["students"].json_files, 1);

        ctx.backups().delete_backup(&admin, &id).await.unwrap();
        let err = ctx.backups().verify_backup(&id).await.unwrap_err();
        assert!(matches!(err, BackupError::NotFound { .. }));
        assert_eq!(err.class(), ErrorClass::NotFound);

        ctx.shutdown().await.unwrap();
    }
}
