use serde::{Deserialize, Serialize};

use super::fingerprint::Fingerprint;

/// Where a stored public key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyOrigin {
    SelfKey,
    ImportedFromChat,
    FileImport,
}

impl KeyOrigin {
    /// Label shown when a record carries none of its own.
    pub fn default_label(self) -> &'static str {
        match self {
            Self::SelfKey => "your public key",
            Self::ImportedFromChat => "(imported from chat)",
            Self::FileImport => "(imported from file)",
        }
    }
}

/// A trusted recipient key. Only `label` may change after creation.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyRecord {
    pub fingerprint: Fingerprint,
    pub armored: String,
    pub label: String,
    pub origin: KeyOrigin,
    pub added_at: Option<chrono::DateTime<chrono::Utc>>,
}

impl std::fmt::Display for KeyRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: [GPG Fingerprint] {}", self.label, self.fingerprint)
    }
}

/// One row of the persisted `public-key-fingerprints` list.
///
/// `fileName` is the field name the browser client wrote; it is read
/// as an alias so old backups keep their labels.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FingerprintEntry {
    #[serde(alias = "fileName", default)]
    pub label: Option<String>,
    pub fingerprint: Fingerprint,
    #[serde(default = "default_origin")]
    pub origin: KeyOrigin,
    #[serde(default)]
    pub added_at: Option<chrono::DateTime<chrono::Utc>>,
}

fn default_origin() -> KeyOrigin {
    KeyOrigin::ImportedFromChat
}

impl FingerprintEntry {
    pub fn from_record(record: &KeyRecord) -> Self {
        Self {
            label: Some(record.label.clone()),
            fingerprint: record.fingerprint.clone(),
            origin: record.origin,
            added_at: record.added_at,
        }
    }

    pub fn into_record(self, armored: String) -> KeyRecord {
        let label = self
            .label
            .filter(|l| !l.trim().is_empty())
            .unwrap_or_else(|| self.origin.default_label().to_string());
        KeyRecord {
            fingerprint: self.fingerprint,
            armored,
            label,
            origin: self.origin,
            added_at: self.added_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_entry_reads_file_name_as_label() {
        let json = r#"{"fileName":"alice.asc","fingerprint":"ABCDEF0123456789ABCDEF0123456789ABCDEF01"}"#;
        let entry: FingerprintEntry = serde_json::from_str(json).unwrap();
        assert_eq!(entry.label.as_deref(), Some("alice.asc"));
        assert_eq!(entry.origin, KeyOrigin::ImportedFromChat);
    }

    #[test]
    fn missing_label_falls_back_to_origin_default() {
        let json = r#"{"fingerprint":"abcdef0123456789abcdef0123456789abcdef01"}"#;
        let entry: FingerprintEntry = serde_json::from_str(json).unwrap();
        let record = entry.into_record("armored".into());
        assert_eq!(record.label, "(imported from chat)");
    }
}
