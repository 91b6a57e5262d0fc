use std::path::PathBuf;

/// All domain errors for Sealroom.
///
/// Each variant provides enough context to diagnose the issue
/// without needing a debugger.
#[derive(Debug, thiserror::Error)]
pub enum SealroomError {
    #[error(
        "Failed to unlock private key: {reason}\n\n  \
         Check the passphrase (--passphrase or SEALROOM_PASSPHRASE).\n  \
         If the key file is corrupt, restore it: sealroom backup load <file>"
    )]
    UnlockFailed { reason: String },

    #[error(
        "A passphrase is required to unlock your private key\n\n  \
         Pass it with --passphrase or set SEALROOM_PASSPHRASE."
    )]
    MissingPassphrase,

    #[error(
        "No private key found\n\n  \
         Solutions:\n    \
         → Generate one: sealroom identity generate\n    \
         → Import one:   sealroom identity import-private <file>"
    )]
    NoPrivateKey,

    #[error(
        "No public key found for your identity\n\n  \
         Import it with: sealroom identity import-public <file>"
    )]
    NoPublicKey,

    #[error("Message #{index} could not be decrypted: {reason}")]
    DecryptFailed { index: usize, reason: String },

    #[error("Invalid key format: {reason}")]
    InvalidKeyFormat { reason: String },

    #[error(
        "No stored key at position {index} (store holds {len} keys)\n\n  \
         Run 'sealroom keys list' to see valid positions."
    )]
    IndexOutOfRange { index: usize, len: usize },

    #[error(
        "Storage unavailable: {detail}\n\n  \
         The change was NOT saved. Check permissions on the data directory."
    )]
    PersistenceUnavailable { detail: String },

    #[error(
        "Stored data uses format version {found}, but this Sealroom \
         only supports up to version {supported}.\n\n  \
         Update Sealroom before touching this data directory."
    )]
    FormatVersionTooNew { found: u32, supported: u32 },

    #[error(
        "OpenPGP backend unavailable: {reason}\n\n  \
         Sealroom drives the system 'gpg' binary. Install GnuPG 2.2+ and make sure it is in PATH."
    )]
    CryptoUnavailable { reason: String },

    #[error("Encryption failed: {reason}")]
    EncryptionFailed { reason: String },

    #[error("Room request failed: {reason}")]
    TransportFailed { reason: String },

    #[error("Invalid configuration: {detail}")]
    InvalidConfig { detail: String },

    #[error(
        "Invalid backup file: {detail}\n\n  \
         Expected a JSON backup with at least 'privateKey' and 'publicKey'."
    )]
    InvalidBackup { detail: String },

    #[error("Audit log error: {detail}")]
    AuditError { detail: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl SealroomError {
    /// Whether this error ends a whole pipeline run rather than one item.
    pub fn is_fatal_to_run(&self) -> bool {
        matches!(
            self,
            Self::UnlockFailed { .. }
                | Self::MissingPassphrase
                | Self::NoPrivateKey
                | Self::PersistenceUnavailable { .. }
                | Self::FormatVersionTooNew { .. }
                | Self::CryptoUnavailable { .. }
        )
    }
}

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, SealroomError>;
