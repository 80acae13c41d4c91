//! # Snapshot Document
//!
//! ```text
//! {
//!   "metadata": {timestamp, version, description, includedPaths[], configFiles[],
//!                createdBy?, skippedPaths[]?},
//!   "storage":  {<area>: <tree>, ...},
//!   "data":     <tree> | null,
//!   "config":   {<filename>: <text>}
//! }
//! ```

use crate::domain::errors::BackupError;
use crate::domain::tree::TreeNode;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use shared_types::Actor;
use std::collections::BTreeMap;

pub const SNAPSHOT_VERSION: &str = "1.0";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SnapshotMetadata {
    /// RFC 3339 creation time.
    pub timestamp: String,
    pub version: String,
    #[serde(default)]
    pub description: String,
    pub included_paths: Vec<String>,
    #[serde(default)]
    pub config_files: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_by: Option<Actor>,
    /// Entries present on disk but not captured, as `<path>: <reason>`.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub skipped_paths: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub metadata: SnapshotMetadata,
    /// Storage areas by name.
    pub storage: BTreeMap<String, TreeNode>,
    /// Flat user-record area.
    pub data: Option<TreeNode>,
    pub config: BTreeMap<String, String>,
}

/// A parsed snapshot plus leaves that could not be decoded.
#[derive(Debug, Clone)]
pub struct ParsedSnapshot {
    pub snapshot: Snapshot,
    pub decode_errors: Vec<String>,
}

impl Snapshot {
    pub fn to_json(&self) -> Value {
        let storage: Map<String, Value> = self
            .storage
            .iter()
            .map(|(area, node)| (area.clone(), node.to_json()))
            .collect();
        let config: Map<String, Value> = self
            .config
            .iter()
            .map(|(name, text)| (name.clone(), Value::String(text.clone())))
            .collect();

        let mut doc = Map::new();
        doc.insert(
            "metadata".into(),
            serde_json::to_value(&self.metadata).unwrap_or(Value::Null),
        );
        doc.insert("storage".into(), Value::Object(storage));
        doc.insert(
            "data".into(),
            self.data.as_ref().map(TreeNode::to_json).unwrap_or(Value::Null),
        );
        doc.insert("config".into(), Value::Object(config));
        Value::Object(doc)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        // Serialising a `Value` cannot fail.
        serde_json::to_vec(&self.to_json()).unwrap_or_default()
    }

    /// Parse and validate an artifact.
    ///
    /// Structural problems (not JSON, missing metadata fields, wrong section
    /// types, unknown version) reject the whole snapshot. Individual leaves
    /// that fail to decode are collected in `decode_errors`.
    pub fn parse(id: &str, bytes: &[u8]) -> Result<ParsedSnapshot, BackupError> {
        let invalid = |reasons: Vec<String>| BackupError::InvalidSnapshot {
            id: id.to_string(),
            reasons,
        };

        let doc: Value =
            serde_json::from_slice(bytes).map_err(|e| invalid(vec![format!("not JSON: {e}")]))?;
        let Value::Object(doc) = doc else {
            return Err(invalid(vec!["document is not an object".into()]));
        };

        let mut reasons = Vec::new();

        let metadata = match doc.get("metadata") {
            None => {
                reasons.push("missing metadata".to_string());
                None
            }
            Some(raw) => match serde_json::from_value::<SnapshotMetadata>(raw.clone()) {
                Ok(meta) => {
                    if meta.version.split('.').next() != SNAPSHOT_VERSION.split('.').next() {
                        reasons.push(format!("unsupported version {}", meta.version));
                    }
                    if chrono::DateTime::parse_from_rfc3339(&meta.timestamp).is_err() {
                        reasons.push(format!("invalid timestamp {}", meta.timestamp));
                    }
                    Some(meta)
                }
                Err(e) => {
                    reasons.push(format!("invalid metadata: {e}"));
                    None
                }
            },
        };

        let storage = match doc.get("storage") {
            Some(Value::Object(areas)) => Some(areas),
            Some(_) => {
                reasons.push("storage is not an object".to_string());
                None
            }
            None => {
                reasons.push("missing storage".to_string());
                None
            }
        };

        let data = match doc.get("data") {
            None | Some(Value::Null) => None,
            Some(value @ Value::Object(_)) => Some(value),
            Some(_) => {
                reasons.push("data is neither an object nor null".to_string());
                None
            }
        };

        let mut config = BTreeMap::new();
        match doc.get("config") {
            None | Some(Value::Null) => {}
            Some(Value::Object(files)) => {
                for (name, text) in files {
                    match text.as_str() {
                        Some(text) => {
                            config.insert(name.clone(), text.to_string());
                        }
                        None => reasons.push(format!("config file {name} is not text")),
                    }
                }
            }
            Some(_) => reasons.push("config is not an object".to_string()),
        }

        let (Some(metadata), Some(storage), true) = (metadata, storage, reasons.is_empty()) else {
            return Err(invalid(reasons));
        };

        let mut decode_errors = Vec::new();
        let mut areas = BTreeMap::new();
        for (area, tree) in storage {
            if let Some(node) = TreeNode::directory_from_json(tree, area, &mut decode_errors) {
                areas.insert(area.clone(), node);
            }
        }
        let data = data.and_then(|tree| TreeNode::directory_from_json(tree, "data", &mut decode_errors));

        Ok(ParsedSnapshot {
            snapshot: Snapshot {
                metadata,
                storage: areas,
                data,
                config,
            },
            decode_errors,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn sample() -> Snapshot {
        let mut students = BTreeMap::new();
        students.insert("meta.json".to_string(), TreeNode::Json(json!({"n": 1})));
        let mut storage = BTreeMap::new();
        storage.insert("students".to_string(), TreeNode::Directory(students));
        let mut config = BTreeMap::new();
        config.insert("settings.json".to_string(), "{}".to_string());

        Snapshot {
            metadata: SnapshotMetadata {
                timestamp: "2024-03-05T10:20:30.123Z".into(),
                version: SNAPSHOT_VERSION.into(),
                description: "nightly".into(),
                included_paths: vec!["students".into()],
                config_files: vec!["settings.json".into()],
                created_by: Some(Actor::system()),
                skipped_paths: Vec::new(),
            },
            storage,
            data: None,
            config,
        }
    }

    #[test]
    fn test_document_shape() {
        let doc = sample().to_json();
        assert_eq!(doc["metadata"]["version"], "1.0");
        assert_eq!(doc["metadata"]["includedPaths"], json!(["students"]));
        assert_eq!(doc["data"], Value::Null);
        assert_eq!(doc["config"]["settings.json"], "{}");
        assert_eq!(doc["storage"]["students"]["meta.json"], json!({"n": 1}));
    }

    #[test]
    fn test_parse_accepts_own_output() {
        let original = sample();
        let parsed = Snapshot::parse("backup-x", &original.to_bytes()).unwrap();
        assert!(parsed.decode_errors.is_empty());
        assert_eq!(parsed.snapshot, original);
    }

    #[test]
    fn test_parse_rejects_garbage() {
        let err = Snapshot::parse("backup-x", b"not json").unwrap_err();
        assert!(matches!(err, BackupError::InvalidSnapshot { .. }));
    }

    #[test]
    fn test_parse_collects_structural_reasons() {
        let doc = json!({
            "metadata": {"timestamp": "yesterday", "version": "2.0", "includedPaths": []},
            "storage": [],
            "config": {"a": 1}
        });
        let err = Snapshot::parse("backup-x", doc.to_string().as_bytes()).unwrap_err();
        let BackupError::InvalidSnapshot { reasons, .. } = err else {
            panic!("expected InvalidSnapshot");
        };
        assert_eq!(reasons.len(), 4);
    }

    #[test]
    fn test_missing_metadata_fields() {
        let doc = json!({"metadata": {"description": "x"}, "storage": {}});
        let err = Snapshot::parse("backup-x", doc.to_string().as_bytes()).unwrap_err();
        assert!(err.to_string().contains("invalid metadata"));
    }
}
