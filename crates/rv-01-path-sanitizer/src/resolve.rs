//! Resolution with post-canonicalization containment check.

use crate::errors::PathRejection;
use crate::sanitize::sanitize;
use std::ffi::OsStr;
use std::io;
use std::path::{Path, PathBuf};
use tracing::warn;

/// A path proven to lie strictly below a canonical base directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafePath {
    path: PathBuf,
    relative: String,
}

impl SafePath {
    /// Canonical absolute path.
    pub fn as_path(&self) -> &Path {
        &self.path
    }

    /// Cleaned relative form (`/`-separated) that was joined to the base.
    pub fn relative(&self) -> &str {
        &self.relative
    }

    pub fn into_path_buf(self) -> PathBuf {
        self.path
    }
}

impl AsRef<Path> for SafePath {
    fn as_ref(&self) -> &Path {
        &self.path
    }
}

/// Resolve `requested` below `base` and prove containment.
///
/// Rejects raw input containing `..`, `\` or NUL before anything else, then
/// sanitizes each `/`-separated segment, joins, canonicalizes and checks that
/// the canonical base is a strict prefix of the result. Paths that do not
/// exist yet are resolved through their deepest existing ancestor.
pub fn resolve_and_validate(base: &Path, requested: &str) -> Result<SafePath, PathRejection> {
    if requested.contains("..") || requested.contains('\\') || requested.contains('\0') {
        warn!(input = %requested, "Rejected path with traversal sequence");
        return Err(PathRejection::Traversal {
            input: requested.to_string(),
        });
    }
    if requested.starts_with('/') || Path::new(requested).is_absolute() {
        warn!(input = %requested, "Rejected absolute path");
        return Err(PathRejection::AbsolutePath {
            input: requested.to_string(),
        });
    }

    let segments: Vec<String> = requested
        .split('/')
        .filter(|s| !s.is_empty() && *s != ".")
        .map(sanitize)
        .collect();
    if segments.is_empty() {
        return Err(PathRejection::Empty);
    }
    let relative = segments.join("/");

    let canonical_base = base
        .canonicalize()
        .map_err(|e| PathRejection::BaseUnavailable {
            base: base.to_path_buf(),
            message: e.to_string(),
        })?;

    let joined = segments
        .iter()
        .fold(canonical_base.clone(), |acc, s| acc.join(s));
    let canonical = canonicalize_lenient(&joined).map_err(|e| PathRejection::BaseUnavailable {
        base: base.to_path_buf(),
        message: e.to_string(),
    })?;

    if canonical == canonical_base || !canonical.starts_with(&canonical_base) {
        warn!(
            input = %requested,
            resolved = %canonical.display(),
            "Rejected path escaping base after resolution"
        );
        return Err(PathRejection::Escape { path: canonical });
    }

    Ok(SafePath {
        path: canonical,
        relative,
    })
}

/// Canonicalize the deepest existing ancestor and re-append the missing tail.
fn canonicalize_lenient(path: &Path) -> io::Result<PathBuf> {
    let mut existing = path;
    let mut missing: Vec<&OsStr> = Vec::new();

    loop {
        match existing.canonicalize() {
            Ok(canonical) => {
                return Ok(missing
                    .iter()
                    .rev()
                    .fold(canonical, |acc, name| acc.join(name)));
            }
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                let name = existing.file_name().ok_or(e)?;
                missing.push(name);
                existing = existing.parent().ok_or_else(|| {
                    io::Error::new(io::ErrorKind::NotFound, "no existing ancestor")
                })?;
            }
            Err(e) => return Err(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    #[test]
    fn test_accepts_nested_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("students/2024")).unwrap();

        let safe = resolve_and_validate(dir.path(), "students/2024").unwrap();
        assert!(safe.as_path().ends_with("students/2024"));
        assert_eq!(safe.relative(), "students/2024");
    }

    #[test]
    fn test_accepts_not_yet_existing_path() {
        let dir = tempfile::tempdir().unwrap();
        let safe = resolve_and_validate(dir.path(), "events/2024/03-march/ev-1").unwrap();
        let base = dir.path().canonicalize().unwrap();
        assert!(safe.as_path().starts_with(&base));
        assert!(!safe.as_path().exists());
    }

    #[test]
    fn test_rejects_traversal_before_resolution() {
        let dir = tempfile::tempdir().unwrap();
        for input in ["../etc", "a/../../b", "..", "a\\b", "ok/..hidden"] {
            let err = resolve_and_validate(dir.path(), input).unwrap_err();
            assert!(matches!(err, PathRejection::Traversal { .. }), "{input}");
            assert_eq!(err.class(), shared_types::ErrorClass::SecurityRejection);
        }
    }

    #[test]
    fn test_rejects_absolute() {
        let dir = tempfile::tempdir().unwrap();
        let err = resolve_and_validate(dir.path(), "/etc/passwd").unwrap_err();
        assert!(matches!(err, PathRejection::AbsolutePath { .. }));
    }

    #[test]
    fn test_rejects_base_itself() {
        let dir = tempfile::tempdir().unwrap();
        assert_eq!(
            resolve_and_validate(dir.path(), "./").unwrap_err(),
            PathRejection::Empty
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_rejects_symlink_escape() {
        let outside = tempfile::tempdir().unwrap();
        let root = tempfile::tempdir().unwrap();
        std::os::unix::fs::symlink(outside.path(), root.path().join("link")).unwrap();

        let err = resolve_and_validate(root.path(), "link/secret.txt").unwrap_err();
        assert!(matches!(err, PathRejection::Escape { .. }));
    }

    #[test]
    fn test_missing_base_is_io() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_and_validate(&missing, "a").unwrap_err();
        assert_eq!(err.class(), shared_types::ErrorClass::Io);
    }
}
