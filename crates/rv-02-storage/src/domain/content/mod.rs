//! # Content Inspection
//!
//! Upload payload checks run before anything touches the disk.
//!
//! | Check | Outcome on failure |
//! |-------|--------------------|
//! | Magic-byte signature vs declared MIME | validation error |
//! | Threat signature scan | security rejection + quarantine |
//! | Shannon entropy of text payloads | advisory only |
//!
//! The threat and entropy heuristics are advisory signals. They may
//! false-positive on legitimate content and do not make a payload safe to
//! serve.

mod entropy;
mod signatures;
mod threats;

pub use entropy::shannon_entropy;
pub use signatures::{check_signature, detect_mime, is_text_mime};
pub use threats::{scan_for_threats, ThreatMatch, THREAT_SIGNATURES};

/// Result of inspecting one payload.
#[derive(Debug, Clone, PartialEq)]
pub struct InspectionReport {
    /// Type detected from magic bytes, if recognised.
    pub detected_mime: Option<&'static str>,
    /// Shannon entropy in bits per byte.
    pub entropy: f64,
    /// First threat signature found.
    pub threat: Option<ThreatMatch>,
    /// Text payload above the entropy threshold.
    pub high_entropy: bool,
}

/// Run the heuristics over a payload already known to match its declared type.
pub fn inspect(declared_mime: &str, bytes: &[u8], entropy_threshold: f64) -> InspectionReport {
    let entropy = shannon_entropy(bytes);
    InspectionReport {
        detected_mime: detect_mime(bytes),
        entropy,
        threat: scan_for_threats(bytes),
        high_entropy: is_text_mime(declared_mime) && entropy > entropy_threshold,
    }
}
