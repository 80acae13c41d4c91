//! Filename validation and collision-resistant name generation.

use crate::errors::PathRejection;
use crate::sanitize::REPLACEMENT;
use chrono::{DateTime, Utc};

/// Longest filename accepted (common filesystem limit).
pub const MAX_FILENAME_LEN: usize = 255;

/// Stem length kept when generating stored names.
const MAX_STEM_LEN: usize = 64;

/// Extensions refused anywhere in a dotted name (`photo.php.png` included).
pub const DANGEROUS_EXTENSIONS: &[&str] = &[
    "exe", "dll", "bat", "cmd", "com", "scr", "msi", "ps1", "vbs", "sh", "php", "phtml", "jsp",
    "asp", "aspx", "js", "html", "htm", "svg", "jar",
];

const RESERVED_NAMES: &[&str] = &[
    "con", "prn", "aux", "nul", "com1", "com2", "com3", "com4", "lpt1", "lpt2", "lpt3",
];

/// Validate a client-supplied filename, collecting every reason it is unsafe.
pub fn validate_filename(name: &str) -> Result<(), PathRejection> {
    let mut reasons = Vec::new();

    if name.trim().is_empty() {
        reasons.push("filename is empty".to_string());
    }
    if name.len() > MAX_FILENAME_LEN {
        reasons.push(format!(
            "filename exceeds {MAX_FILENAME_LEN} bytes ({} bytes)",
            name.len()
        ));
    }
    if name.contains('/') || name.contains('\\') {
        reasons.push("filename contains a path separator".to_string());
    }
    if name.contains("..") {
        reasons.push("filename contains '..'".to_string());
    }
    if name.chars().any(|c| c.is_control()) {
        reasons.push("filename contains control characters".to_string());
    }
    if name.starts_with('.') {
        reasons.push("hidden files are not accepted".to_string());
    }

    let lower = name.to_ascii_lowercase();
    let stem = lower.split('.').next().unwrap_or_default();
    if RESERVED_NAMES.contains(&stem) {
        reasons.push(format!("'{stem}' is a reserved device name"));
    }
    for part in lower.split('.').skip(1) {
        if DANGEROUS_EXTENSIONS.contains(&part) {
            reasons.push(format!("extension '.{part}' is not allowed"));
        }
    }

    if reasons.is_empty() {
        Ok(())
    } else {
        Err(PathRejection::UnsafeFilename { reasons })
    }
}

/// Lowercased final extension, if any.
pub fn extension_of(name: &str) -> Option<String> {
    let (stem, ext) = name.rsplit_once('.')?;
    if stem.is_empty() || ext.is_empty() {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

/// Collision-resistant stored name: `<stem>_<unix-millis>_<random>.<ext>`.
pub fn unique_filename(original: &str) -> String {
    unique_filename_at(original, Utc::now())
}

/// [`unique_filename`] with an explicit timestamp.
pub fn unique_filename_at(original: &str, now: DateTime<Utc>) -> String {
    let (raw_stem, ext) = match original.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
        _ => (original, None),
    };

    let mut stem: String = raw_stem
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                REPLACEMENT
            }
        })
        .take(MAX_STEM_LEN)
        .collect();
    if stem.trim_matches(REPLACEMENT).is_empty() {
        stem = "file".to_string();
    }

    let token: u32 = rand::random();
    let base = format!("{stem}_{}_{token:08x}", now.timestamp_millis());

    match ext
        .map(|e| {
            e.chars()
                .filter(|c| c.is_ascii_alphanumeric())
                .take(10)
                .collect::<String>()
                .to_ascii_lowercase()
        })
        .filter(|e| !e.is_empty())
    {
        Some(ext) => format!("{base}.{ext}"),
        None => base,
    }
}
