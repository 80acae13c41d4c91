//! Single-segment sanitization.

use std::path::{Path, PathBuf};

/// Character substituted for separators, traversal sequences and control bytes.
pub const REPLACEMENT: char = '_';

/// Make one untrusted segment safe to use as a single path component.
///
/// Separators (`/`, `\`), drive colons, NUL and other control characters
/// become [`REPLACEMENT`]; every `..` run collapses to it as well. An empty
/// or `.` result becomes a lone replacement character.
pub fn sanitize(segment: &str) -> String {
    let mut out: String = segment
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' => REPLACEMENT,
            c if c.is_control() => REPLACEMENT,
            c => c,
        })
        .collect();

    while out.contains("..") {
        out = out.replace("..", "_");
    }

    let trimmed = out.trim();
    if trimmed.is_empty() || trimmed == "." {
        return REPLACEMENT.to_string();
    }
    trimmed.to_string()
}

/// Join sanitized segments below `base`. Each segment adds exactly one level.
pub fn join_segments<I, S>(base: &Path, segments: I) -> PathBuf
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    segments
        .into_iter()
        .fold(base.to_path_buf(), |acc, s| acc.join(sanitize(s.as_ref())))
}
