use secrecy::SecretString;

use crate::core::errors::Result;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::pgp::{
    Decrypted, EncryptedMessage, GeneratedKeyPair, LockedKey, PublicKey, UnlockedKey, UserId,
};

/// Port for the OpenPGP capability.
///
/// Implementations live in `adapters::crypto` (e.g. GpgProvider).
/// The core never does cryptography itself and assumes nothing beyond
/// "consumes/produces armored text and a stable fingerprint".
pub trait CryptoProvider: Send + Sync {
    /// Parse one armored public key.
    fn read_key(&self, armored: &str) -> Result<PublicKey>;

    /// Parse one armored, passphrase-protected private key.
    fn read_private_key(&self, armored: &str) -> Result<LockedKey>;

    /// Check `passphrase` against `key` and return the usable key.
    fn decrypt_key(&self, key: &LockedKey, passphrase: &SecretString) -> Result<UnlockedKey>;

    /// Parse an armored message without decrypting it.
    fn read_message(&self, armored: &str) -> Result<EncryptedMessage>;

    /// Decrypt `message` and check its signature against `verifiers`.
    fn decrypt_and_verify(
        &self,
        message: &EncryptedMessage,
        key: &UnlockedKey,
        verifiers: &[PublicKey],
    ) -> Result<Decrypted>;

    /// Encrypt `plaintext` for `recipients` and sign it with `signer`.
    fn encrypt_and_sign(
        &self,
        plaintext: &str,
        recipients: &[PublicKey],
        signer: &UnlockedKey,
    ) -> Result<String>;

    /// Generate a new passphrase-protected key pair.
    fn generate_key_pair(&self, user_id: &UserId, passphrase: &SecretString)
    -> Result<GeneratedKeyPair>;

    /// Fingerprint of a parsed key.
    fn fingerprint_of(&self, key: &PublicKey) -> Fingerprint {
        key.fingerprint.clone()
    }

    /// Human-readable name of this provider (e.g. "gpg").
    fn name(&self) -> &str;
}
