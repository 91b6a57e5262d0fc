use serde::{Deserialize, Serialize};

use super::key_record::FingerprintEntry;
use crate::core::errors::{Result, SealroomError};

/// Backup file in the browser client's layout.
///
/// `recipientKeys` and `publicKeyfingerprints` are JSON documents stored
/// as strings, the way the browser kept them. Plain arrays are accepted
/// on load too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Backup {
    pub private_key: String,
    pub public_key: String,
    #[serde(default, with = "json_string")]
    pub recipient_keys: Vec<String>,
    #[serde(rename = "publicKeyfingerprints", default, with = "json_string")]
    pub fingerprints: Vec<FingerprintEntry>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

impl Backup {
    pub fn parse(text: &str) -> Result<Self> {
        let backup: Self = serde_json::from_str(text).map_err(|e| SealroomError::InvalidBackup {
            detail: e.to_string(),
        })?;

        if backup.private_key.trim().is_empty() {
            return Err(SealroomError::InvalidBackup {
                detail: "'privateKey' is empty".into(),
            });
        }
        if backup.public_key.trim().is_empty() {
            return Err(SealroomError::InvalidBackup {
                detail: "'publicKey' is empty".into(),
            });
        }

        Ok(backup)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| SealroomError::InvalidBackup {
            detail: format!("cannot serialize backup: {e}"),
        })
    }
}

mod json_string {
    use serde::de::{DeserializeOwned, Error as _};
    use serde::ser::Error as _;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use serde_json::Value;

    pub fn serialize<T: Serialize, S: Serializer>(value: &T, s: S) -> Result<S::Ok, S::Error> {
        let text = serde_json::to_string(value).map_err(S::Error::custom)?;
        s.serialize_str(&text)
    }

    pub fn deserialize<'de, T, D>(d: D) -> Result<T, D::Error>
    where
        T: DeserializeOwned + Default,
        D: Deserializer<'de>,
    {
        match Value::deserialize(d)? {
            Value::Null => Ok(T::default()),
            Value::String(s) if s.trim().is_empty() => Ok(T::default()),
            Value::String(s) => serde_json::from_str(&s).map_err(D::Error::custom),
            other => serde_json::from_value(other).map_err(D::Error::custom),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FPR: &str = "0123456789abcdef0123456789abcdef01234567";

    #[test]
    fn reads_browser_backup_with_string_fields() {
        let text = format!(
            r#"{{
                "privateKey": "PRIV",
                "publicKey": "PUB",
                "recipientKeys": "[\"KEY1\"]",
                "publicKeyfingerprints": "[{{\"fileName\":\"bob.asc\",\"fingerprint\":\"{FPR}\"}}]",
                "username": "ana"
            }}"#
        );
        let backup = Backup::parse(&text).unwrap();
        assert_eq!(backup.recipient_keys, vec!["KEY1"]);
        assert_eq!(backup.fingerprints[0].label.as_deref(), Some("bob.asc"));
        assert_eq!(backup.username.as_deref(), Some("ana"));
    }

    #[test]
    fn accepts_plain_arrays_and_missing_lists() {
        let backup =
            Backup::parse(r#"{"privateKey":"P","publicKey":"Q","recipientKeys":["K"]}"#).unwrap();
        assert_eq!(backup.recipient_keys, vec!["K"]);
        assert!(backup.fingerprints.is_empty());
        assert!(backup.username.is_none());
    }

    #[test]
    fn empty_string_lists_read_as_empty() {
        let backup = Backup::parse(
            r#"{"privateKey":"P","publicKey":"Q","recipientKeys":"","publicKeyfingerprints":""}"#,
        )
        .unwrap();
        assert!(backup.recipient_keys.is_empty());
    }

    #[test]
    fn writes_lists_as_json_strings() {
        let backup = Backup {
            private_key: "P".into(),
            public_key: "Q".into(),
            recipient_keys: vec!["K".into()],
            fingerprints: vec![],
            username: None,
        };
        let value: serde_json::Value = serde_json::from_str(&backup.to_json().unwrap()).unwrap();
        assert_eq!(value["recipientKeys"], "[\"K\"]");
        assert_eq!(value["publicKeyfingerprints"], "[]");
        assert!(value.get("username").is_none());
    }

    #[test]
    fn missing_keys_are_invalid() {
        assert!(matches!(
            Backup::parse(r#"{"privateKey":"","publicKey":"Q"}"#).unwrap_err(),
            SealroomError::InvalidBackup { .. }
        ));
        assert!(Backup::parse(r#"{"publicKey":"Q"}"#).is_err());
        assert!(Backup::parse("not json").is_err());
    }
}
