use secrecy::{ExposeSecret, SecretString};

use crate::core::errors::{Result, SealroomError};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::pgp::{GeneratedKeyPair, PublicKey, UnlockedKey, UserId};
use crate::core::traits::crypto::CryptoProvider;
use crate::core::traits::key_value::{KeyValueStore, slots};

/// The user's own key pair, stored as armored text only.
///
/// The private key is persisted exactly as the provider produced it
/// (passphrase-protected). Unlocked keys never leave memory.
pub struct IdentityService<'a, S: KeyValueStore, C: CryptoProvider> {
    pub store: &'a S,
    pub crypto: &'a C,
}

impl<'a, S: KeyValueStore, C: CryptoProvider> IdentityService<'a, S, C> {
    pub fn new(store: &'a S, crypto: &'a C) -> Self {
        Self { store, crypto }
    }

    pub fn private_key_armored(&self) -> Result<Option<String>> {
        Ok(self.store.get(slots::PRIVATE_KEY)?.filter(|k| !k.trim().is_empty()))
    }

    pub fn public_key_armored(&self) -> Result<Option<String>> {
        Ok(self.store.get(slots::PUBLIC_KEY)?.filter(|k| !k.trim().is_empty()))
    }

    /// Parse the stored public key, if any.
    pub fn own_public_key(&self) -> Result<Option<PublicKey>> {
        self.public_key_armored()?
            .map(|armored| self.crypto.read_key(&armored))
            .transpose()
    }

    /// Own fingerprint, or `None` when no usable public key is stored.
    ///
    /// A stored key that fails to parse is logged, not propagated:
    /// callers use this for exclusion checks only.
    pub fn own_fingerprint(&self) -> Option<Fingerprint> {
        match self.own_public_key() {
            Ok(key) => key.map(|k| self.crypto.fingerprint_of(&k)),
            Err(e) => {
                tracing::warn!(error = %e, "stored public key is unreadable");
                None
            }
        }
    }

    /// Read and unlock the stored private key.
    ///
    /// Checks run in order: key present, passphrase present, passphrase valid.
    pub fn unlock(&self, passphrase: Option<&SecretString>) -> Result<UnlockedKey> {
        let armored = self.private_key_armored()?.ok_or(SealroomError::NoPrivateKey)?;

        let passphrase = passphrase
            .filter(|p| !p.expose_secret().is_empty())
            .ok_or(SealroomError::MissingPassphrase)?;

        let locked = self
            .crypto
            .read_private_key(&armored)
            .map_err(|e| SealroomError::UnlockFailed {
                reason: format!("stored private key is unreadable: {e}"),
            })?;

        self.crypto
            .decrypt_key(&locked, passphrase)
            .map_err(|e| match e {
                SealroomError::UnlockFailed { .. } | SealroomError::CryptoUnavailable { .. } => e,
                other => SealroomError::UnlockFailed {
                    reason: other.to_string(),
                },
            })
    }

    /// Generate and store a new key pair, replacing any existing one.
    pub fn generate(&self, user_id: &UserId, passphrase: &SecretString) -> Result<GeneratedKeyPair> {
        if passphrase.expose_secret().is_empty() {
            return Err(SealroomError::MissingPassphrase);
        }

        let pair = self.crypto.generate_key_pair(user_id, passphrase)?;
        self.store.put(slots::PRIVATE_KEY, &pair.private_armored)?;
        self.store.put(slots::PUBLIC_KEY, &pair.public_armored)?;

        tracing::debug!(fingerprint = %pair.fingerprint, "generated key pair");
        Ok(pair)
    }

    /// Validate and store an armored private key.
    pub fn import_private(&self, armored: &str) -> Result<Fingerprint> {
        let key = self.crypto.read_private_key(armored)?;
        self.store.put(slots::PRIVATE_KEY, armored.trim())?;
        Ok(key.fingerprint)
    }

    /// Validate and store the user's own armored public key.
    pub fn import_public(&self, armored: &str) -> Result<Fingerprint> {
        let key = self.crypto.read_key(armored)?;
        self.store.put(slots::PUBLIC_KEY, armored.trim())?;
        Ok(self.crypto.fingerprint_of(&key))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::test_support::{
        FakeCrypto, MemoryStore, fake_fingerprint, fake_private, fake_public, secret,
    };

    #[test]
    fn unlock_without_private_key_fails_first() {
        let store = MemoryStore::new();
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let err = identity.unlock(None).unwrap_err();
        assert!(matches!(err, SealroomError::NoPrivateKey));
    }

    #[test]
    fn unlock_without_passphrase_fails() {
        let store = MemoryStore::new();
        store.set_raw(slots::PRIVATE_KEY, &fake_private("me", "pw"));
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        assert!(matches!(
            identity.unlock(None).unwrap_err(),
            SealroomError::MissingPassphrase
        ));
        assert!(matches!(
            identity.unlock(Some(&secret(""))).unwrap_err(),
            SealroomError::MissingPassphrase
        ));
    }

    #[test]
    fn unlock_with_wrong_passphrase_fails() {
        let store = MemoryStore::new();
        store.set_raw(slots::PRIVATE_KEY, &fake_private("me", "pw"));
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let err = identity.unlock(Some(&secret("nope"))).unwrap_err();
        assert!(matches!(err, SealroomError::UnlockFailed { .. }));
    }

    #[test]
    fn unlock_corrupt_key_is_unlock_error() {
        let store = MemoryStore::new();
        store.set_raw(slots::PRIVATE_KEY, "garbage");
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let err = identity.unlock(Some(&secret("pw"))).unwrap_err();
        assert!(matches!(err, SealroomError::UnlockFailed { .. }));
    }

    #[test]
    fn generate_stores_both_halves() {
        let store = MemoryStore::new();
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let user = UserId {
            name: "me".into(),
            email: "me@example.com".into(),
        };
        let pair = identity.generate(&user, &secret("pw")).unwrap();

        assert_eq!(pair.fingerprint, fake_fingerprint("me"));
        assert_eq!(identity.own_fingerprint(), Some(fake_fingerprint("me")));
        assert!(identity.unlock(Some(&secret("pw"))).is_ok());
    }

    #[test]
    fn generate_requires_passphrase() {
        let store = MemoryStore::new();
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let err = identity.generate(&UserId::default(), &secret("")).unwrap_err();
        assert!(matches!(err, SealroomError::MissingPassphrase));
        assert!(store.raw(slots::PRIVATE_KEY).is_none());
    }

    #[test]
    fn import_rejects_invalid_keys_without_storing() {
        let store = MemoryStore::new();
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        assert!(identity.import_private("not a key").is_err());
        assert!(identity.import_public("not a key").is_err());
        assert!(store.raw(slots::PRIVATE_KEY).is_none());
        assert!(store.raw(slots::PUBLIC_KEY).is_none());
    }

    #[test]
    fn import_public_sets_own_fingerprint() {
        let store = MemoryStore::new();
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        let fp = identity.import_public(&fake_public("me")).unwrap();
        assert_eq!(fp, fake_fingerprint("me"));
        assert_eq!(identity.own_fingerprint(), Some(fp));
    }

    #[test]
    fn unreadable_public_key_means_no_fingerprint() {
        let store = MemoryStore::new();
        store.set_raw(slots::PUBLIC_KEY, "garbage");
        let crypto = FakeCrypto;
        let identity = IdentityService::new(&store, &crypto);

        assert_eq!(identity.own_fingerprint(), None);
    }
}
