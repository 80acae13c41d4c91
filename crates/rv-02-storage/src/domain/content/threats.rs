//! Heuristic threat signatures.

/// A signature hit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ThreatMatch {
    /// Human-readable signature name.
    pub signature: &'static str,
    /// Byte offset of the hit.
    pub offset: usize,
}

/// `(name, pattern, anchored at offset 0)`. Unanchored patterns match
/// case-insensitively anywhere in the payload.
pub const THREAT_SIGNATURES: &[(&str, &[u8], bool)] = &[
    ("windows executable", b"MZ", true),
    ("elf executable", b"\x7fELF", true),
    ("shell script", b"#!/", true),
    ("php tag", b"<?php", false),
    ("script tag", b"<script", false),
    ("javascript uri", b"javascript:", false),
    ("eval call", b"eval(", false),
    ("jsp directive", b"<%@", false),
];

/// First threat signature present in `bytes`.
pub fn scan_for_threats(bytes: &[u8]) -> Option<ThreatMatch> {
    let mut best: Option<ThreatMatch> = None;

    for &(name, pattern, anchored) in THREAT_SIGNATURES {
        let hit = if anchored {
            bytes.starts_with(pattern).then_some(0)
        } else {
            find_ignore_case(bytes, pattern)
        };
        if let Some(offset) = hit {
            if best.map_or(true, |b| offset < b.offset) {
                best = Some(ThreatMatch {
                    signature: name,
                    offset,
                });
            }
        }
    }
    best
}

fn find_ignore_case(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() || haystack.len() < needle.len() {
        return None;
    }
    haystack
        .windows(needle.len())
        .position(|w| w.eq_ignore_ascii_case(needle))
}
