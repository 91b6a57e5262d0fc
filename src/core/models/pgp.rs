//! Provider-neutral handles passed across the `CryptoProvider` port.
//!
//! Every handle keeps the armored text it was read from, so an adapter
//! can always fall back to re-reading it.

use secrecy::{ExposeSecret, SecretString};

use super::fingerprint::Fingerprint;

/// A parsed public key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublicKey {
    pub armored: String,
    pub fingerprint: Fingerprint,
    pub user_ids: Vec<String>,
}

/// A private key still protected by its passphrase.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LockedKey {
    pub armored: String,
    pub fingerprint: Fingerprint,
}

/// A private key whose passphrase has been checked.
///
/// Deliberately not `Clone` or `Serialize`: it lives for one operation.
#[derive(Debug)]
pub struct UnlockedKey {
    pub key: LockedKey,
    passphrase: SecretString,
}

impl UnlockedKey {
    /// Only providers should construct this, after verifying `passphrase`.
    pub fn new(key: LockedKey, passphrase: SecretString) -> Self {
        Self { key, passphrase }
    }

    pub fn fingerprint(&self) -> &Fingerprint {
        &self.key.fingerprint
    }

    pub fn passphrase(&self) -> &str {
        self.passphrase.expose_secret()
    }
}

/// A syntactically valid armored message, not yet decrypted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncryptedMessage {
    pub armored: String,
}

/// Outcome of checking the signature on a decrypted message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SignatureStatus {
    Valid { signer: Fingerprint },
    Invalid,
    UnknownSigner,
    Unsigned,
}

/// Plaintext plus signature verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Decrypted {
    pub text: String,
    pub signature: SignatureStatus,
}

/// User ID for a freshly generated key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserId {
    pub name: String,
    pub email: String,
}

impl Default for UserId {
    fn default() -> Self {
        Self {
            name: "Anonymous".into(),
            email: "anon@example.com".into(),
        }
    }
}

impl std::fmt::Display for UserId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} <{}>", self.name, self.email)
    }
}

/// Armored output of key generation.
#[derive(Debug, Clone)]
pub struct GeneratedKeyPair {
    pub private_armored: String,
    pub public_armored: String,
    pub fingerprint: Fingerprint,
}
