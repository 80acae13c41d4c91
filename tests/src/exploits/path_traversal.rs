//! # Path Traversal
//!
//! Attacker-controlled identifiers and filenames reaching the storage layer.
//! Every attempt either lands inside the root under a sanitized name or is
//! refused as a security rejection.

#[cfg(test)]
mod tests {
    use crate::integration::fixtures::{png, read_tree, start_vault};
    use rv_01_path_sanitizer::{resolve_and_validate, sanitize, PathRejection};
    use rv_02_storage::{AssetCategory, EntityRef, StorageError, UploadRequest};
    use serde_json::json;
    use shared_types::{Actor, ErrorClass};

    const PAYLOADS: &[&str] = &[
        "../../etc/passwd",
        "..\\..\\windows\\system32",
        "/etc/shadow",
        "C:\\boot.ini",
        "2021/../../../root",
        "....//....//etc",
        "roll\0number",
        "..",
    ];

    #[test]
    fn test_sanitize_neutralises_every_payload() {
        for payload in PAYLOADS {
            let clean = sanitize(payload);
            assert!(!clean.contains(".."), "{payload:?} -> {clean:?}");
            assert!(!clean.contains('/') && !clean.contains('\\'), "{payload:?} -> {clean:?}");
            assert!(!clean.contains('\0'));
            assert!(!clean.is_empty());
        }
    }

    #[test]
    fn test_resolve_refuses_every_payload() {
        let dir = tempfile::tempdir().unwrap();
        for payload in PAYLOADS {
            let err = resolve_and_validate(dir.path(), payload).unwrap_err();
            assert_eq!(err.class(), ErrorClass::SecurityRejection, "{payload:?}: {err}");
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_symlink_escape_refused() {
        let dir = tempfile::tempdir().unwrap();
        let base = dir.path().join("storage");
        let outside = dir.path().join("outside");
        std::fs::create_dir_all(&base).unwrap();
        std::fs::create_dir_all(&outside).unwrap();
        std::os::unix::fs::symlink(&outside, base.join("link")).unwrap();

        let err = resolve_and_validate(&base, "link/secret.txt").unwrap_err();
        assert!(matches!(err, PathRejection::Escape { .. }), "{err:?}");
    }

    #[tokio::test]
    async fn test_hostile_identifiers_stay_inside_root() {
        let (dir, ctx) = start_vault().await;
        let root = ctx.storage().root().to_path_buf();
        let attacker = Actor::new("u-666", "mallory");

        for payload in PAYLOADS {
            let entity = EntityRef::student(*payload, *payload);
            ctx.metadata()
                .save_metadata(&attacker, &entity, json!({"payload": payload}))
                .await
                .unwrap();
        }

        let written = read_tree(&root.join("students"));
        assert_eq!(written.len(), PAYLOADS.len());
        assert!(written
            .keys()
            .all(|rel| !rel.contains("..") && rel.ends_with("/metadata.json")));
        // Nothing appeared next to the storage root.
        for entry in std::fs::read_dir(dir.path()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().into_owned();
            assert!(["storage", "data", "conf"].contains(&name.as_str()), "{name}");
        }

        ctx.shutdown().await.unwrap();
    }

    #[tokio::test]
    async fn test_hostile_upload_names() {
        let (_dir, ctx) = start_vault().await;
        let attacker = Actor::new("u-666", "mallory");
        let photo = png(512);

        for name in ["../../evil.png", "shell.php.png", "..\\x.png", ".htaccess"] {
            let err = ctx
                .storage()
                .save_binary(
                    &attacker,
                    UploadRequest {
                        entity: EntityRef::event("2024", 1, "fest"),
                        category: AssetCategory::EventPhoto,
                        bytes: &photo,
                        mime_type: "image/png",
                        original_name: name,
                    },
                )
                .await
                .unwrap_err();
            assert!(
                matches!(err, StorageError::Validation { .. } | StorageError::Path(_)),
                "{name}: {err:?}"
            );
        }
        assert!(read_tree(&ctx.storage().root().join("events")).is_empty());
        ctx.shutdown().await.unwrap();
    }
}
