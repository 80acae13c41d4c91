//! Magic-byte signatures for the accepted upload types.

const PNG: &[u8] = &[0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];
const JPEG: &[u8] = &[0xFF, 0xD8, 0xFF];
const GIF87: &[u8] = b"GIF87a";
const GIF89: &[u8] = b"GIF89a";
const PDF: &[u8] = b"%PDF-";
const ZIP: &[u8] = &[b'P', b'K', 0x03, 0x04];
const OLE2: &[u8] = &[0xD0, 0xCF, 0x11, 0xE0, 0xA1, 0xB1, 0x1A, 0xE1];

/// Identify a payload from its leading bytes.
///
/// ZIP containers are reported as OOXML word documents and OLE2 containers
/// as legacy Word; [`check_signature`] accepts the sibling formats.
pub fn detect_mime(bytes: &[u8]) -> Option<&'static str> {
    if bytes.starts_with(PNG) {
        Some("image/png")
    } else if bytes.starts_with(JPEG) {
        Some("image/jpeg")
    } else if bytes.starts_with(GIF87) || bytes.starts_with(GIF89) {
        Some("image/gif")
    } else if bytes.len() >= 12 && &bytes[..4] == b"RIFF" && &bytes[8..12] == b"WEBP" {
        Some("image/webp")
    } else if bytes.starts_with(PDF) {
        Some("application/pdf")
    } else if bytes.starts_with(ZIP) {
        Some("application/vnd.openxmlformats-officedocument.wordprocessingml.document")
    } else if bytes.starts_with(OLE2) {
        Some("application/msword")
    } else {
        None
    }
}

/// Types without a magic number; validated as text instead.
pub fn is_text_mime(mime: &str) -> bool {
    let mime = mime.to_ascii_lowercase();
    mime.starts_with("text/")
}

/// Verify that `bytes` really is `declared`.
pub fn check_signature(declared: &str, bytes: &[u8]) -> Result<(), String> {
    let declared = declared.to_ascii_lowercase();

    if is_text_mime(&declared) {
        if bytes.contains(&0) {
            return Err(format!("{declared} content contains NUL bytes"));
        }
        return std::str::from_utf8(bytes)
            .map(|_| ())
            .map_err(|_| format!("{declared} content is not valid UTF-8"));
    }

    let expected: &[&[u8]] = match declared.as_str() {
        "image/png" => &[PNG],
        "image/jpeg" => &[JPEG],
        "image/gif" => &[GIF87, GIF89],
        "application/pdf" => &[PDF],
        "application/vnd.openxmlformats-officedocument.wordprocessingml.document"
        | "application/vnd.openxmlformats-officedocument.spreadsheetml.sheet" => &[ZIP],
        "application/msword" | "application/vnd.ms-excel" => &[OLE2],
        "image/webp" => {
            return if detect_mime(bytes) == Some("image/webp") {
                Ok(())
            } else {
                Err("content does not match declared type image/webp".to_string())
            };
        }
        other => return Err(format!("no content signature known for {other}")),
    };

    if expected.iter().any(|sig| bytes.starts_with(sig)) {
        Ok(())
    } else {
        Err(format!("content does not match declared type {declared}"))
    }
}
