use serde::{Deserialize, Serialize};

use crate::core::errors::{Result, SealroomError};

/// Hex length of a v4 (SHA-1) key fingerprint.
pub const V4_LEN: usize = 40;
/// Hex length of a v6 (SHA-256) key fingerprint.
pub const V6_LEN: usize = 64;

/// Identity of a public key: lowercase hexadecimal, 40 or 64 chars.
///
/// Two keys with equal fingerprints are the same key, whatever their
/// armored encoding looks like.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Fingerprint(String);

impl Fingerprint {
    /// Parse a fingerprint, accepting any case and embedded spaces
    /// (the grouped form `gpg --fingerprint` prints).
    pub fn parse(raw: &str) -> Result<Self> {
        let normalized: String = raw
            .chars()
            .filter(|c| !c.is_whitespace())
            .collect::<String>()
            .to_ascii_lowercase();

        let valid_len = normalized.len() == V4_LEN || normalized.len() == V6_LEN;
        if !valid_len || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
            return Err(SealroomError::InvalidKeyFormat {
                reason: format!("'{raw}' is not a key fingerprint"),
            });
        }

        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Last 16 hex digits, the long key ID.
    pub fn key_id(&self) -> &str {
        &self.0[self.0.len() - 16..]
    }
}

impl TryFrom<String> for Fingerprint {
    type Error = SealroomError;

    fn try_from(value: String) -> Result<Self> {
        Self::parse(&value)
    }
}

impl From<Fingerprint> for String {
    fn from(value: Fingerprint) -> Self {
        value.0
    }
}

impl std::fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}
