use crate::core::errors::{Result, SealroomError};
use crate::core::models::backup::Backup;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::key_record::{FingerprintEntry, KeyOrigin};
use crate::core::services::identity::IdentityService;
use crate::core::services::key_store::KeyStore;
use crate::core::services::trust_workflow::TrustWorkflow;
use crate::core::traits::crypto::CryptoProvider;
use crate::core::traits::key_value::KeyValueStore;

/// Result of restoring a backup.
#[derive(Debug)]
pub struct RestoreSummary {
    pub own_fingerprint: Fingerprint,
    pub imported: usize,
    pub skipped: usize,
}

pub struct BackupService<'a, S: KeyValueStore, C: CryptoProvider> {
    pub keys: &'a KeyStore<S>,
    pub crypto: &'a C,
}

impl<'a, S: KeyValueStore, C: CryptoProvider> BackupService<'a, S, C> {
    pub fn new(keys: &'a KeyStore<S>, crypto: &'a C) -> Self {
        Self { keys, crypto }
    }

    /// Capture identity and trust store.
    pub fn snapshot(&self, username: Option<&str>) -> Result<Backup> {
        let identity = IdentityService::new(self.keys.backend(), self.crypto);
        let private_key = identity
            .private_key_armored()?
            .ok_or(SealroomError::NoPrivateKey)?;
        let public_key = identity
            .public_key_armored()?
            .ok_or(SealroomError::NoPublicKey)?;

        let records = self.keys.records()?;
        Ok(Backup {
            private_key,
            public_key,
            recipient_keys: records.iter().map(|r| r.armored.clone()).collect(),
            fingerprints: records.iter().map(FingerprintEntry::from_record).collect(),
            username: username.map(str::to_string),
        })
    }

    /// Replace the identity and the trusted keys with the backup's.
    ///
    /// Keys trusted before the restore are dropped (they stay hidden from
    /// offers). Backup keys go through the normal import path, so duplicates
    /// collapse and each restored key is hidden too. Unreadable keys are
    /// skipped; the identity itself must be valid.
    pub fn restore(&self, backup: &Backup) -> Result<RestoreSummary> {
        let crypto = self.crypto;
        let own_public = crypto.read_key(&backup.public_key)?;
        crypto.read_private_key(&backup.private_key)?;

        let identity = IdentityService::new(self.keys.backend(), crypto);
        identity.import_private(&backup.private_key)?;
        let own_fingerprint = identity.import_public(&own_public.armored)?;
        self.keys.clear_all()?;

        let trust = TrustWorkflow::new(self.keys, crypto);
        let mut imported = 0;
        let mut skipped = 0;

        for (index, block) in backup.recipient_keys.iter().enumerate() {
            let key = match crypto.read_key(block) {
                Ok(key) => key,
                Err(e) => {
                    tracing::warn!(key = index + 1, error = %e, "skipping unreadable key in backup");
                    skipped += 1;
                    continue;
                }
            };
            let fingerprint = crypto.fingerprint_of(&key);
            let entry = backup
                .fingerprints
                .iter()
                .find(|e| e.fingerprint == fingerprint);
            let origin = entry.map_or(KeyOrigin::ImportedFromChat, |e| e.origin);
            let label = entry.and_then(|e| e.label.as_deref()).filter(|l| !l.trim().is_empty());

            trust.import_key(block, origin, label)?;
            imported += 1;
        }

        Ok(RestoreSummary {
            own_fingerprint,
            imported,
            skipped,
        })
    }
}
