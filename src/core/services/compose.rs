use secrecy::SecretString;

use crate::core::errors::{Result, SealroomError};
use crate::core::models::compose::{ComposeContext, SealedMessage};
use crate::core::models::pgp::PublicKey;
use crate::core::services::identity::IdentityService;
use crate::core::services::image_payload::encode_image;
use crate::core::services::key_store::KeyStore;
use crate::core::traits::crypto::CryptoProvider;
use crate::core::traits::key_value::KeyValueStore;

/// Builds the plaintext a room client expects: the optional image line,
/// then `<strong>name</strong>: text`.
pub fn format_plaintext(username: &str, ctx: &ComposeContext) -> String {
    let line = format!("<strong>{username}</strong>: {}", ctx.text);
    match &ctx.image {
        Some(bytes) => format!("{}\n{line}", encode_image(bytes)),
        None => line,
    }
}

/// Seals outgoing messages for every trusted recipient and ourselves.
pub struct ComposeService<'a, S: KeyValueStore, C: CryptoProvider> {
    pub keys: &'a KeyStore<S>,
    pub crypto: &'a C,
}

impl<'a, S: KeyValueStore, C: CryptoProvider> ComposeService<'a, S, C> {
    pub fn new(keys: &'a KeyStore<S>, crypto: &'a C) -> Self {
        Self { keys, crypto }
    }

    /// Encrypt to self plus all recipients and sign with the own key.
    ///
    /// The returned message carries our armored public key so the room can
    /// offer it to other members.
    pub fn seal(
        &self,
        username: &str,
        ctx: &ComposeContext,
        passphrase: Option<&SecretString>,
    ) -> Result<SealedMessage> {
        if ctx.text.trim().is_empty() && ctx.image.is_none() {
            return Err(SealroomError::EncryptionFailed {
                reason: "nothing to send".into(),
            });
        }

        let identity = IdentityService::new(self.keys.backend(), self.crypto);
        let own_armored = identity.public_key_armored()?.ok_or(SealroomError::NoPublicKey)?;
        let own = self.crypto.read_key(&own_armored)?;
        let signer = identity.unlock(passphrase)?;

        let own_fingerprint = self.crypto.fingerprint_of(&own);
        let mut recipients: Vec<PublicKey> = vec![own];
        for armored in self.keys.recipient_keys()? {
            match self.crypto.read_key(&armored) {
                Ok(key) if self.crypto.fingerprint_of(&key) == own_fingerprint => {}
                Ok(key) => recipients.push(key),
                Err(e) => tracing::warn!(error = %e, "skipping unreadable recipient key"),
            }
        }

        let plaintext = format_plaintext(username, ctx);
        let message = self
            .crypto
            .encrypt_and_sign(&plaintext, &recipients, &signer)
            .map_err(|e| match e {
                SealroomError::EncryptionFailed { .. } | SealroomError::CryptoUnavailable { .. } => e,
                other => SealroomError::EncryptionFailed {
                    reason: other.to_string(),
                },
            })?;

        tracing::debug!(recipients = recipients.len(), "message sealed");

        Ok(SealedMessage {
            public_key: own_armored,
            message,
            recipient_count: recipients.len(),
        })
    }
}
