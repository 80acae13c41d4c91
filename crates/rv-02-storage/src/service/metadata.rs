//! JSON sidecar store, one `metadata.json` per entity.

use crate::domain::errors::StorageError;
use crate::domain::layout::{EntityRef, METADATA_FILE};
use crate::service::files::{write_atomic, FileStorage};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{Map, Value};
use shared_types::{Actor, AuditEvent, AuditOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::debug;

/// Whole-document read/write of entity sidecars.
///
/// Writes to the same sidecar are serialised by a per-path mutex; the last
/// writer wins. Reads never take the lock since writes land by rename.
#[derive(Clone)]
pub struct MetadataStore {
    storage: Arc<FileStorage>,
}

impl MetadataStore {
    pub fn new(storage: Arc<FileStorage>) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &Arc<FileStorage> {
        &self.storage
    }

    /// Overwrite the sidecar with `document` (must be a JSON object).
    pub async fn save_metadata(
        &self,
        actor: &Actor,
        entity: &EntityRef,
        document: Value,
    ) -> Result<(), StorageError> {
        let Value::Object(document) = document else {
            return Err(StorageError::validation("metadata must be a JSON object"));
        };
        let path = self.sidecar_path(entity)?;
        let _guard = self.storage.locks().lock(&path).await;

        let existed = fs::try_exists(&path).await.unwrap_or(false);
        let result = write_document(&path, &document).await;
        self.audit_write(actor, entity, existed, &result).await;
        result
    }

    /// Read the sidecar.
    ///
    /// # Errors
    ///
    /// `NotFound` when absent, `InvalidMetadata` when not a JSON object.
    pub async fn read_metadata(&self, entity: &EntityRef) -> Result<Value, StorageError> {
        let path = self.sidecar_path(entity)?;
        read_document(&path).await.map(Value::Object)
    }

    pub async fn read_metadata_as<T: DeserializeOwned>(
        &self,
        entity: &EntityRef,
    ) -> Result<T, StorageError> {
        let path = self.sidecar_path(entity)?;
        let document = read_document(&path).await?;
        serde_json::from_value(Value::Object(document)).map_err(|e| {
            StorageError::InvalidMetadata {
                path,
                reason: e.to_string(),
            }
        })
    }

    pub async fn save_metadata_from<T: Serialize>(
        &self,
        actor: &Actor,
        entity: &EntityRef,
        record: &T,
    ) -> Result<(), StorageError> {
        let document =
            serde_json::to_value(record).map_err(|e| StorageError::validation(e.to_string()))?;
        self.save_metadata(actor, entity, document).await
    }

    /// Shallow-merge `patch` into the stored document under the path lock.
    ///
    /// A missing sidecar is treated as an empty object. Returns the merged
    /// document as written.
    pub async fn merge_metadata(
        &self,
        actor: &Actor,
        entity: &EntityRef,
        patch: Map<String, Value>,
    ) -> Result<Value, StorageError> {
        let path = self.sidecar_path(entity)?;
        let _guard = self.storage.locks().lock(&path).await;

        let (mut document, existed) = match read_document(&path).await {
            Ok(doc) => (doc, true),
            Err(StorageError::NotFound { .. }) => (Map::new(), false),
            Err(e) => return Err(e),
        };
        for (key, value) in patch {
            document.insert(key, value);
        }

        let result = write_document(&path, &document).await;
        self.audit_write(actor, entity, existed, &result).await;
        result.map(|()| Value::Object(document))
    }

    fn sidecar_path(&self, entity: &EntityRef) -> Result<PathBuf, StorageError> {
        Ok(self
            .storage
            .resolve_entity(entity)?
            .as_path()
            .join(METADATA_FILE))
    }

    async fn audit_write(
        &self,
        actor: &Actor,
        entity: &EntityRef,
        existed: bool,
        result: &Result<(), StorageError>,
    ) {
        let options = AuditOptions::default().resource_id(entity.resource_id());
        let options = match result {
            Ok(()) => options,
            Err(e) => options.failed(e.to_string()),
        };
        self.storage
            .emit(AuditEvent::new(
                actor,
                entity.write_action(existed),
                entity.resource(),
                options,
            ))
            .await;
    }
}

async fn write_document(path: &Path, document: &Map<String, Value>) -> Result<(), StorageError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| StorageError::io(parent, &e))?;
    }
    let bytes =
        serde_json::to_vec_pretty(document).map_err(|e| StorageError::validation(e.to_string()))?;
    write_atomic(path, &bytes).await?;
    debug!(path = %path.display(), bytes = bytes.len(), "Metadata written");
    Ok(())
}

async fn read_document(path: &Path) -> Result<Map<String, Value>, StorageError> {
    let bytes = fs::read(path)
        .await
        .map_err(|e| StorageError::io(path, &e))?;
    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => Err(StorageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: "document is not a JSON object".to_string(),
        }),
        Err(e) => Err(StorageError::InvalidMetadata {
            path: path.to_path_buf(),
            reason: e.to_string(),
        }),
    }
}
