use crate::core::errors::{Result, SealroomError};
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::key_record::{KeyOrigin, KeyRecord};
use crate::core::models::render_item::KeyOffer;
use crate::core::services::key_store::KeyStore;
use crate::core::traits::crypto::CryptoProvider;
use crate::core::traits::key_value::KeyValueStore;

/// What the user decided to do with a key offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Import,
    Reject,
    /// Leave it; the offer comes back on the next pass.
    Defer,
}

/// Consumer side of the offer channel: the pipeline produces offers,
/// a handler (interactive prompt, policy, test double) decides.
pub trait DecisionHandler {
    fn decide(&mut self, offer: &KeyOffer) -> Decision;
}

/// What happened to one offer.
#[derive(Debug)]
pub struct OfferOutcome {
    pub fingerprint: Fingerprint,
    pub decision: Decision,
    pub result: Result<()>,
}

/// Import/reject actions on the trust store.
///
/// Both actions end by hiding the fingerprint, so an offer for a key the
/// user has decided on is never produced again.
pub struct TrustWorkflow<'a, S: KeyValueStore, C: CryptoProvider> {
    pub keys: &'a KeyStore<S>,
    pub crypto: &'a C,
}

impl<'a, S: KeyValueStore, C: CryptoProvider> TrustWorkflow<'a, S, C> {
    pub fn new(keys: &'a KeyStore<S>, crypto: &'a C) -> Self {
        Self { keys, crypto }
    }

    fn parse(&self, block: &str) -> Result<(Fingerprint, Vec<String>)> {
        let key = self
            .crypto
            .read_key(block)
            .map_err(|e| match e {
                SealroomError::InvalidKeyFormat { .. } => e,
                e if e.is_fatal_to_run() => e,
                other => SealroomError::InvalidKeyFormat {
                    reason: other.to_string(),
                },
            })?;
        Ok((self.crypto.fingerprint_of(&key), key.user_ids))
    }

    /// Trust `block`. Importing an already-trusted key succeeds without change.
    ///
    /// When `label` is `None` the first user ID of the key is used, then the
    /// origin's default label.
    pub fn import_key(
        &self,
        block: &str,
        origin: KeyOrigin,
        label: Option<&str>,
    ) -> Result<Fingerprint> {
        let (fingerprint, user_ids) = self.parse(block)?;

        let label = label
            .map(str::to_string)
            .or_else(|| user_ids.into_iter().next())
            .unwrap_or_else(|| origin.default_label().to_string());

        let inserted = self.keys.insert(KeyRecord {
            fingerprint: fingerprint.clone(),
            armored: block.trim().to_string(),
            label,
            origin,
            added_at: Some(chrono::Utc::now()),
        })?;

        if inserted {
            tracing::debug!(%fingerprint, "public key imported");
        } else {
            tracing::debug!(%fingerprint, "public key already imported");
        }

        self.keys.hide(&fingerprint)?;
        Ok(fingerprint)
    }

    /// Distrust `block`: drop it from the store if present, and hide it.
    /// Rejecting a key that was never stored is not an error.
    pub fn reject_key(&self, block: &str) -> Result<Fingerprint> {
        let (fingerprint, _) = self.parse(block)?;

        if self.keys.remove_fingerprint(&fingerprint)? {
            tracing::debug!(%fingerprint, "public key rejected and removed");
        } else {
            tracing::debug!(%fingerprint, "rejected key was not stored");
        }

        self.keys.hide(&fingerprint)?;
        Ok(fingerprint)
    }

    /// Route each offer through `handler` and apply its decision.
    ///
    /// Failures stay with their offer; later offers are still processed.
    pub fn resolve_offers<'o>(
        &self,
        offers: impl IntoIterator<Item = &'o KeyOffer>,
        handler: &mut impl DecisionHandler,
    ) -> Vec<OfferOutcome> {
        offers
            .into_iter()
            .map(|offer| {
                let decision = handler.decide(offer);
                let result = match decision {
                    Decision::Import => self
                        .import_key(&offer.armored, KeyOrigin::ImportedFromChat, None)
                        .map(|_| ()),
                    Decision::Reject => self.reject_key(&offer.armored).map(|_| ()),
                    Decision::Defer => Ok(()),
                };
                OfferOutcome {
                    fingerprint: offer.fingerprint.clone(),
                    decision,
                    result,
                }
            })
            .collect()
    }
}
