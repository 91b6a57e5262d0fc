//! ASCII-armor framing checks done before handing text to gpg.
//!
//! This only validates the envelope (markers, headers, base64 body). The
//! packets inside are gpg's business.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;

/// Armor label, the part between `BEGIN PGP ` and the closing dashes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArmorLabel {
    Message,
    PublicKey,
    PrivateKey,
}

impl ArmorLabel {
    fn as_str(self) -> &'static str {
        match self {
            Self::Message => "MESSAGE",
            Self::PublicKey => "PUBLIC KEY BLOCK",
            Self::PrivateKey => "PRIVATE KEY BLOCK",
        }
    }
}

/// Decode the body of the first `label` block in `text`.
///
/// Header lines (`Key: value`) and the optional `=XXXX` checksum line are
/// skipped. Errors carry a short reason suitable for a user message.
pub fn dearmor(text: &str, label: ArmorLabel) -> Result<Vec<u8>, String> {
    let begin = format!("-----BEGIN PGP {}-----", label.as_str());
    let end = format!("-----END PGP {}-----", label.as_str());

    let start = text
        .find(&begin)
        .ok_or_else(|| format!("missing '{begin}'"))?
        + begin.len();
    let stop = text[start..]
        .find(&end)
        .map(|rel| start + rel)
        .ok_or_else(|| format!("missing '{end}'"))?;

    let mut body = String::new();
    let mut in_headers = true;
    for line in text[start..stop].lines().map(str::trim) {
        if in_headers {
            if line.is_empty() {
                in_headers = false;
                continue;
            }
            if is_header(line) {
                continue;
            }
            in_headers = false;
        }
        if line.is_empty() {
            continue;
        }
        if line.starts_with('=') && line.len() == 5 {
            break;
        }
        body.push_str(line);
    }

    if body.is_empty() {
        return Err("armored block has no body".into());
    }

    STANDARD
        .decode(body.as_bytes())
        .map_err(|e| format!("armored body is not base64: {e}"))
}

fn is_header(line: &str) -> bool {
    line.split_once(": ")
        .is_some_and(|(key, _)| !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '-'))
}
