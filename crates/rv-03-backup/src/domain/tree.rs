//! # Snapshot Tree
//!
//! ```text
//! TreeNode = Directory(name -> TreeNode)
//!          | Json(value)                          // `.json` files
//!          | Binary { data, original_path }       // everything else
//! ```
//!
//! On the wire a directory is a JSON object, a JSON leaf is the parsed value
//! itself and a binary leaf is `{"type":"file","data":<base64>,"originalPath":..}`.
//! Which variant a JSON value decodes to depends on its entry name, so
//! conversion is done by hand rather than derived.

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde_json::{Map, Value};
use std::collections::BTreeMap;

/// Tag of a binary leaf.
pub const FILE_TAG: &str = "file";

#[derive(Debug, Clone, PartialEq)]
pub enum TreeNode {
    Directory(BTreeMap<String, TreeNode>),
    Json(Value),
    Binary { data: Vec<u8>, original_path: String },
}

/// Counts gathered by [`TreeNode::stats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeStats {
    pub directories: usize,
    pub json_files: usize,
    pub binary_files: usize,
    pub binary_bytes: u64,
}

impl TreeStats {
    pub fn files(&self) -> usize {
        self.json_files + self.binary_files
    }
}

impl TreeNode {
    pub fn empty_dir() -> Self {
        Self::Directory(BTreeMap::new())
    }

    /// Leaf for a `.json` file.
    ///
    /// The value is embedded structurally only when pretty re-serialisation
    /// reproduces `bytes` exactly and cannot be mistaken for a binary leaf;
    /// otherwise the raw bytes are kept.
    pub fn json_file(bytes: Vec<u8>, original_path: String) -> Self {
        if let Ok(value) = serde_json::from_slice::<Value>(&bytes) {
            let reproducible = serde_json::to_vec_pretty(&value)
                .map(|out| out == bytes)
                .unwrap_or(false);
            if reproducible && !is_binary_leaf(&value) {
                return Self::Json(value);
            }
        }
        Self::Binary {
            data: bytes,
            original_path,
        }
    }

    pub fn to_json(&self) -> Value {
        match self {
            Self::Directory(children) => Value::Object(
                children
                    .iter()
                    .map(|(name, child)| (name.clone(), child.to_json()))
                    .collect(),
            ),
            Self::Json(value) => value.clone(),
            Self::Binary {
                data,
                original_path,
            } => {
                let mut leaf = Map::new();
                leaf.insert("type".into(), Value::String(FILE_TAG.into()));
                leaf.insert("data".into(), Value::String(STANDARD.encode(data)));
                leaf.insert("originalPath".into(), Value::String(original_path.clone()));
                Value::Object(leaf)
            }
        }
    }

    /// Decode a directory node. Malformed leaves are dropped and reported in
    /// `errors` as `<path>: <reason>`; the rest of the tree survives.
    pub fn directory_from_json(value: &Value, at: &str, errors: &mut Vec<String>) -> Option<Self> {
        let Value::Object(entries) = value else {
            errors.push(format!("{at}: expected a directory object"));
            return None;
        };
        let mut children = BTreeMap::new();
        for (name, child) in entries {
            let path = if at.is_empty() {
                name.clone()
            } else {
                format!("{at}/{name}")
            };
            if let Some(node) = Self::entry_from_json(name, child, &path, errors) {
                children.insert(name.clone(), node);
            }
        }
        Some(Self::Directory(children))
    }

    fn entry_from_json(name: &str, value: &Value, at: &str, errors: &mut Vec<String>) -> Option<Self> {
        if is_binary_leaf(value) {
            return decode_binary(value, at, errors);
        }
        if name.ends_with(".json") {
            return Some(Self::Json(value.clone()));
        }
        match value {
            Value::Object(_) => Self::directory_from_json(value, at, errors),
            _ => {
                errors.push(format!("{at}: unexpected leaf"));
                None
            }
        }
    }

    pub fn stats(&self) -> TreeStats {
        let mut stats = TreeStats::default();
        self.accumulate(&mut stats);
        stats
    }

    fn accumulate(&self, stats: &mut TreeStats) {
        match self {
            Self::Directory(children) => {
                stats.directories += 1;
                for child in children.values() {
                    child.accumulate(stats);
                }
            }
            Self::Json(_) => stats.json_files += 1,
            Self::Binary { data, .. } => {
                stats.binary_files += 1;
                stats.binary_bytes += data.len() as u64;
            }
        }
    }
}

fn is_binary_leaf(value: &Value) -> bool {
    value.get("type").and_then(Value::as_str) == Some(FILE_TAG)
        && value.get("data").is_some_and(Value::is_string)
}

fn decode_binary(value: &Value, at: &str, errors: &mut Vec<String>) -> Option<TreeNode> {
    let encoded = value.get("data").and_then(Value::as_str).unwrap_or_default();
    let Some(original_path) = value.get("originalPath").and_then(Value::as_str) else {
        errors.push(format!("{at}: binary leaf without originalPath"));
        return None;
    };
    match STANDARD.decode(encoded) {
        Ok(data) => Some(TreeNode::Binary {
            data,
            original_path: original_path.to_string(),
        }),
        Err(e) => {
            errors.push(format!("{at}: invalid base64 ({e})"));
            None
        }
    }
}
