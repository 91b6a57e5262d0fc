use serde::{Deserialize, Serialize};

/// Trust-store and identity events recorded in the audit log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    Init,
    IdentityGenerate,
    IdentityImport,
    KeyImport,
    KeyReject,
    KeyRemove,
    KeyRename,
    KeysClear,
    BackupRestore,
    MessageSend,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Init => "init",
            Self::IdentityGenerate => "identity generate",
            Self::IdentityImport => "identity import",
            Self::KeyImport => "key import",
            Self::KeyReject => "key reject",
            Self::KeyRemove => "key remove",
            Self::KeyRename => "key rename",
            Self::KeysClear => "keys clear",
            Self::BackupRestore => "backup restore",
            Self::MessageSend => "message send",
        };
        f.write_str(s)
    }
}

/// A single entry in the audit log (JSON lines format).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuditEntry {
    pub timestamp: chrono::DateTime<chrono::Utc>,
    pub author: String,
    pub action: AuditAction,
    pub fingerprints: Vec<String>,
    pub detail: Option<String>,
    /// SHA-256 of the trust store's fingerprint list after the action.
    pub state_hash: Option<String>,
}
