//! # Storage Flows
//!
//! Uploads and metadata through a live vault, checked on disk and in the
//! audit trail.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{audit_text, png, read_tree, start_vault};
    use rv_02_storage::{AssetCategory, EntityRef, StorageError, UploadRequest};
    use serde_json::json;
    use shared_types::{Actor, ErrorClass};

    #[tokio::test]
    async fn test_three_megabyte_fake_png_rejected() {
        let (_dir, ctx) = start_vault().await;
        let root = ctx.storage().root().to_path_buf();
        let student = EntityRef::student("2021", "21BCE1234");

        // 3 MB, under the 5 MiB image ceiling, but starts like a JPEG.
        let mut bytes = vec![0u8; 3 * 1024 * 1024];
        bytes[..4].copy_from_slice(&[0xFF, 0xD8, 0xFF, 0xE0]);

        let err = ctx
            .storage()
            .save_binary(
                &Actor::new("u-1", "alice"),
                UploadRequest {
                    entity: student.clone(),
                    category: AssetCategory::StudentProfile,
                    bytes: &bytes,
                    mime_type: "image/png",
                    original_name: "me.png",
                },
            )
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::Validation { .. }), "{err:?}");
        assert_eq!(err.class(), ErrorClass::Validation);
        assert!(read_tree(&root.join("students")).is_empty());
        assert!(read_tree(&root.join("quarantine")).is_empty());

        ctx.shutdown().await.unwrap();
        let trail = audit_text(&root);
        assert!(trail.contains("file_uploaded"));
        assert!(trail.contains("\"success\":false"));
    }

    #[tokio::test]
    async fn test_accepted_upload_is_addressable() {
        let (_dir, ctx) = start_vault().await;
        let event = EntityRef::event("2024", 11, "convocation");
        let photo = png(2048);

        let stored = ctx
            .storage()
            .save_binary(
                &Actor::new("u-2", "bob"),
                UploadRequest {
                    entity: event,
                    category: AssetCategory::EventPhoto,
                    bytes: &photo,
                    mime_type: "image/png",
                    original_name: "Main Stage (1).PNG",
                },
            )
            .await
            .unwrap();

        assert!(stored
            .relative
            .starts_with("events/2024/11-november/convocation/photos/"));
        assert_eq!(stored.url, format!("/storage/{}", stored.relative));
        assert_eq!(std::fs::read(&stored.path).unwrap(), photo);
        assert!(!stored.entropy_flagged);
        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_scripted_attendance_sheet_quarantined() {
        let (_dir, ctx) = start_vault().await;
        let root = ctx.storage().root().to_path_buf();
        let sheet = b"roll,present\n21BCE1234,yes\n<script>fetch('//x')</script>\n";

        let err = ctx
            .storage()
            .save_binary(
                &Actor::new("u-3", "carol"),
                UploadRequest {
                    entity: EntityRef::event("2024", 2, "sports-day"),
                    category: AssetCategory::EventAttendance,
                    bytes: sheet,
                    mime_type: "text/csv",
                    original_name: "attendance.csv",
                },
            )
            .await
            .unwrap_err();

        assert_eq!(err.class(), ErrorClass::SecurityRejection);
        assert!(read_tree(&root.join("events")).is_empty());
        let quarantined = read_tree(&root.join("quarantine"));
        assert!(quarantined.values().any(|bytes| bytes.as_slice() == sheet));

        ctx.shutdown().await.unwrap();
        assert!(audit_text(&root).contains("suspicious_activity"));
    }

    #[tokio::test]
    async fn test_metadata_create_then_update_audited() {
        let (_dir, ctx) = start_vault().await;
        let root = ctx.storage().root().to_path_buf();
        let actor = Actor::new("u-4", "dana");
        let student = EntityRef::student("2020", "20BEC0099");

        ctx.metadata()
            .save_metadata(&actor, &student, json!({"name": "Ira"}))
            .await
            .unwrap();
        ctx.metadata()
            .save_metadata(&actor, &student, json!({"name": "Ira", "hostel": "B"}))
            .await
            .unwrap();

        let doc = ctx.metadata().read_metadata(&student).await.unwrap();
        assert_eq!(doc, json!({"name": "Ira", "hostel": "B"}));

        // Idempotent directory operations.
        let first = ctx.storage().ensure_directory("media/banners").await.unwrap();
        let second = ctx.storage().ensure_directory("media/banners").await.unwrap();
        assert_eq!(first, second);
        assert!(ctx.storage().delete_subtree("media/banners").await.unwrap());
        assert!(!ctx.storage().delete_subtree("media/banners").await.unwrap());

        ctx.shutdown().await.unwrap();
        let trail = audit_text(&root);
        assert!(trail.contains("student_created"));
        assert!(trail.contains("student_updated"));
    }
}
