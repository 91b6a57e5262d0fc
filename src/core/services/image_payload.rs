use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Prefix that introduces an inline base64 image in message text.
pub const IMAGE_MARKER: &str = "IMAGEDATA:";

/// An image split out of decrypted text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImagePayload {
    pub bytes: Vec<u8>,
    /// The text with the marker line segment removed, trimmed.
    pub remainder: String,
}

/// Render `bytes` as a marker line: `IMAGEDATA:<base64>`.
pub fn encode_image(bytes: &[u8]) -> String {
    format!("{IMAGE_MARKER}{}", STANDARD.encode(bytes))
}

/// Find and decode an embedded image.
///
/// The payload runs from the marker to the end of its line and must be
/// strict base64 with nothing else on that line. Anything short of that
/// returns `None` so the caller shows the whole text instead.
pub fn split_image(text: &str) -> Option<ImagePayload> {
    let marker_at = text.find(IMAGE_MARKER)?;
    let payload_start = marker_at + IMAGE_MARKER.len();
    let payload_end = text[payload_start..]
        .find('\n')
        .map_or(text.len(), |rel| payload_start + rel);

    let payload = text[payload_start..payload_end].trim_end_matches('\r');
    if !is_base64_alphabet(payload) {
        return None;
    }

    let bytes = STANDARD.decode(payload).ok()?;
    if bytes.is_empty() {
        return None;
    }

    let remainder = format!("{}{}", &text[..marker_at], &text[payload_end..])
        .trim()
        .to_string();

    Some(ImagePayload { bytes, remainder })
}

fn is_base64_alphabet(s: &str) -> bool {
    !s.is_empty()
        && s
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'+' || b == b'/' || b == b'=')
}
