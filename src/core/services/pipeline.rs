use std::collections::HashSet;

use secrecy::SecretString;

use crate::core::errors::{Result, SealroomError};
use crate::core::models::armored_block::ArmoredBlock;
use crate::core::models::fingerprint::Fingerprint;
use crate::core::models::pgp::{PublicKey, SignatureStatus, UnlockedKey};
use crate::core::models::render_item::{ItemFailure, KeyOffer, PipelineReport, RenderItem};
use crate::core::services::extractor::extract;
use crate::core::services::identity::IdentityService;
use crate::core::services::image_payload::split_image;
use crate::core::services::key_store::KeyStore;
use crate::core::traits::crypto::CryptoProvider;
use crate::core::traits::key_value::KeyValueStore;
use crate::core::traits::sanitizer::ContentSanitizer;

/// Turns raw room content into render items.
///
/// A pass fails as a whole only when the identity cannot be unlocked (or
/// storage/crypto backends are gone). Everything else is recorded per
/// item in the report and the pass continues. A pass never mutates the
/// key store.
pub struct DecryptionPipeline<'a, S: KeyValueStore, C: CryptoProvider, Z: ContentSanitizer> {
    pub keys: &'a KeyStore<S>,
    pub crypto: &'a C,
    pub sanitizer: &'a Z,
}

impl<'a, S, C, Z> DecryptionPipeline<'a, S, C, Z>
where
    S: KeyValueStore,
    C: CryptoProvider,
    Z: ContentSanitizer,
{
    pub fn new(keys: &'a KeyStore<S>, crypto: &'a C, sanitizer: &'a Z) -> Self {
        Self {
            keys,
            crypto,
            sanitizer,
        }
    }

    fn identity(&self) -> IdentityService<'_, S, C> {
        IdentityService::new(self.keys.backend(), self.crypto)
    }

    /// Run one pass over `content`.
    pub fn process(&self, content: &str, passphrase: Option<&SecretString>) -> Result<PipelineReport> {
        let sanitized = self.sanitizer.sanitize(content);
        let found = extract(&sanitized);

        if found.is_empty() {
            tracing::debug!("no encrypted messages or key blocks in content");
            return Ok(PipelineReport::default());
        }

        let identity = self.identity();
        let unlocked = identity.unlock(passphrase)?;
        let own_public = match identity.own_public_key() {
            Ok(key) => key,
            Err(e) if e.is_fatal_to_run() => return Err(e),
            Err(e) => {
                tracing::warn!(error = %e, "stored public key is unreadable");
                None
            }
        };

        let mut report = PipelineReport::default();

        let verifiers = self.verifiers(own_public.as_ref())?;
        for (index, block) in found.messages.iter().enumerate() {
            match self.decrypt_block(block, &unlocked, &verifiers) {
                Ok(Some(item)) => report.items.push(item),
                Ok(None) => tracing::debug!(index, "empty message suppressed"),
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => {
                    let reason = failure_reason(e);
                    tracing::warn!(message = index + 1, %reason, "message decryption failed");
                    report
                        .failures
                        .push(ItemFailure::DecryptError { index, reason });
                }
            }
        }

        let own_fingerprint = own_public.as_ref().map(|k| self.crypto.fingerprint_of(k));
        self.collect_offers(&found.key_blocks, own_fingerprint.as_ref(), &mut report)?;

        Ok(report)
    }

    /// Every key a signature may come from: trusted recipients plus our own.
    fn verifiers(&self, own: Option<&PublicKey>) -> Result<Vec<PublicKey>> {
        let mut verifiers = Vec::new();
        for armored in self.keys.recipient_keys()? {
            match self.crypto.read_key(&armored) {
                Ok(key) => verifiers.push(key),
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => tracing::warn!(error = %e, "stored recipient key is unreadable"),
            }
        }
        verifiers.extend(own.cloned());
        Ok(verifiers)
    }

    fn decrypt_block(
        &self,
        block: &ArmoredBlock,
        key: &UnlockedKey,
        verifiers: &[PublicKey],
    ) -> Result<Option<RenderItem>> {
        let message = self.crypto.read_message(&block.text)?;
        let decrypted = self.crypto.decrypt_and_verify(&message, key, verifiers)?;

        match &decrypted.signature {
            SignatureStatus::Invalid => {
                tracing::warn!(offset = block.offset, "BAD signature on message, showing anyway");
            }
            SignatureStatus::UnknownSigner => {
                tracing::debug!(offset = block.offset, "message signed by an unknown key");
            }
            SignatureStatus::Valid { .. } | SignatureStatus::Unsigned => {}
        }

        let text = self.sanitizer.sanitize(&decrypted.text);

        if let Some(image) = split_image(&text) {
            let caption = self.sanitizer.sanitize(&image.remainder).trim().to_string();
            return Ok(Some(RenderItem::Image {
                bytes: image.bytes,
                caption: (!caption.is_empty()).then_some(caption),
                signature: decrypted.signature,
            }));
        }

        let text = text.trim();
        if text.is_empty() {
            return Ok(None);
        }

        Ok(Some(RenderItem::PlainText {
            text: text.to_string(),
            signature: decrypted.signature,
        }))
    }

    /// Offer each key block at most once, and never one already decided
    /// on, already trusted, or our own.
    fn collect_offers(
        &self,
        blocks: &[ArmoredBlock],
        own: Option<&Fingerprint>,
        report: &mut PipelineReport,
    ) -> Result<()> {
        if blocks.is_empty() {
            return Ok(());
        }

        let mut seen: HashSet<Fingerprint> = HashSet::new();

        for (index, block) in blocks.iter().enumerate() {
            let key = match self.crypto.read_key(&block.text) {
                Ok(key) => key,
                Err(e) if e.is_fatal_to_run() => return Err(e),
                Err(e) => {
                    let reason = failure_reason(e);
                    tracing::warn!(block = index + 1, %reason, "unreadable public key block");
                    report
                        .failures
                        .push(ItemFailure::InvalidKeyFormat { index, reason });
                    continue;
                }
            };

            let fingerprint = self.crypto.fingerprint_of(&key);
            let skip = own == Some(&fingerprint)
                || !seen.insert(fingerprint.clone())
                || self.keys.is_hidden(&fingerprint)?
                || self.keys.contains(&fingerprint)?;

            if skip {
                tracing::debug!(%fingerprint, "skipping key block (decided, trusted, own or repeated)");
                continue;
            }

            report.items.push(RenderItem::KeyOffer(KeyOffer {
                fingerprint,
                armored: block.text.clone(),
                user_ids: key.user_ids,
            }));
        }

        Ok(())
    }
}

fn failure_reason(e: SealroomError) -> String {
    match e {
        SealroomError::DecryptFailed { reason, .. } | SealroomError::InvalidKeyFormat { reason } => {
            reason
        }
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::sanitizer::tag_allowlist::TagAllowlist;
    use crate::core::models::key_record::KeyOrigin;
    use crate::core::services::image_payload::encode_image;
    use crate::core::services::trust_workflow::TrustWorkflow;
    use crate::core::test_support::{
        FakeCrypto, MemoryStore, NoKeyReader, fake_fingerprint, fake_message, fake_private, fake_public,
        fake_public_with_comment, malformed_message, secret,
    };
    use crate::core::traits::key_value::slots;

    struct Fixture {
        keys: KeyStore<MemoryStore>,
        crypto: FakeCrypto,
        sanitizer: TagAllowlist,
    }

    impl Fixture {
        /// Identity "me" with passphrase "pw".
        fn new() -> Self {
            let store = MemoryStore::new();
            store.set_raw(slots::PRIVATE_KEY, &fake_private("me", "pw"));
            store.set_raw(slots::PUBLIC_KEY, &fake_public("me"));
            Self {
                keys: KeyStore::new(store),
                crypto: FakeCrypto,
                sanitizer: TagAllowlist::default(),
            }
        }

        fn pipeline(&self) -> DecryptionPipeline<'_, MemoryStore, FakeCrypto, TagAllowlist> {
            DecryptionPipeline::new(&self.keys, &self.crypto, &self.sanitizer)
        }

        fn trust(&self) -> TrustWorkflow<'_, MemoryStore, FakeCrypto> {
            TrustWorkflow::new(&self.keys, &self.crypto)
        }

        fn run(&self, content: &str) -> PipelineReport {
            self.pipeline().process(content, Some(&secret("pw"))).unwrap()
        }
    }

    fn offers(report: &PipelineReport) -> Vec<Fingerprint> {
        report.offers().map(|o| o.fingerprint.clone()).collect()
    }

    fn texts(report: &PipelineReport) -> Vec<String> {
        report
            .items
            .iter()
            .filter_map(|i| match i {
                RenderItem::PlainText { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn content_without_blocks_needs_no_passphrase() {
        let fx = Fixture::new();
        let report = fx.pipeline().process("<p>nothing here</p>", None).unwrap();
        assert!(report.is_empty());
    }

    #[test]
    fn missing_passphrase_aborts_run() {
        let fx = Fixture::new();
        let content = fake_message(&["me"], None, "hi");
        let err = fx.pipeline().process(&content, None).unwrap_err();
        assert!(matches!(err, SealroomError::MissingPassphrase));
    }

    #[test]
    fn wrong_passphrase_aborts_without_touching_store() {
        let fx = Fixture::new();
        let content = format!("{}{}", fake_message(&["me"], None, "hi"), fake_public("alice"));

        let err = fx
            .pipeline()
            .process(&content, Some(&secret("wrong")))
            .unwrap_err();

        assert!(matches!(err, SealroomError::UnlockFailed { .. }));
        assert!(fx.keys.hidden_keys().unwrap().is_empty());
        assert!(fx.keys.is_empty().unwrap());
    }

    #[test]
    fn missing_private_key_aborts_run() {
        let fx = Fixture {
            keys: KeyStore::new(MemoryStore::new()),
            crypto: FakeCrypto,
            sanitizer: TagAllowlist::default(),
        };
        let err = fx
            .pipeline()
            .process(&fake_public("alice"), Some(&secret("pw")))
            .unwrap_err();
        assert!(matches!(err, SealroomError::NoPrivateKey));
    }

    #[test]
    fn malformed_middle_message_is_isolated() {
        let fx = Fixture::new();
        let content = format!(
            "<p>{}</p><p>{}</p><p>{}</p>",
            fake_message(&["me"], None, "first"),
            malformed_message(),
            fake_message(&["me"], None, "third"),
        );

        let report = fx.run(&content);

        assert_eq!(texts(&report), vec!["first", "third"]);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(
            report.failures[0],
            ItemFailure::DecryptError { index: 1, .. }
        ));
    }

    #[test]
    fn message_for_someone_else_is_a_decrypt_error() {
        let fx = Fixture::new();
        let content = format!(
            "{}{}",
            fake_message(&["bob"], None, "not for you"),
            fake_message(&["me", "bob"], None, "for both"),
        );

        let report = fx.run(&content);
        assert_eq!(texts(&report), vec!["for both"]);
        assert_eq!(report.decrypt_errors(), 1);
    }

    #[test]
    fn blank_messages_are_suppressed() {
        let fx = Fixture::new();
        let content = format!(
            "{}{}",
            fake_message(&["me"], None, "   \n  "),
            fake_message(&["me"], None, "<script>x</script>"),
        );

        let report = fx.run(&content);
        assert!(report.items.is_empty());
        assert!(report.failures.is_empty());
    }

    #[test]
    fn decrypted_markup_is_sanitized() {
        let fx = Fixture::new();
        let content = fake_message(&["me"], None, "<strong>me</strong>: <img src=x>hi");
        let report = fx.run(&content);
        assert_eq!(texts(&report), vec!["<strong>me</strong>: hi"]);
    }

    #[test]
    fn image_round_trip() {
        let fx = Fixture::new();
        let bytes = vec![0x89, b'P', b'N', b'G', 0, 1, 2, 255];
        let text = format!("{}\n<strong>me</strong>: a picture", encode_image(&bytes));
        let report = fx.run(&fake_message(&["me"], None, &text));

        assert_eq!(report.items.len(), 1);
        match &report.items[0] {
            RenderItem::Image {
                bytes: got,
                caption,
                ..
            } => {
                assert_eq!(got, &bytes);
                assert_eq!(caption.as_deref(), Some("<strong>me</strong>: a picture"));
            }
            other => panic!("expected image, got {other:?}"),
        }
    }

    #[test]
    fn image_without_caption_has_none() {
        let fx = Fixture::new();
        let report = fx.run(&fake_message(&["me"], None, &encode_image(b"abc")));
        assert!(matches!(
            &report.items[0],
            RenderItem::Image { caption: None, .. }
        ));
    }

    #[test]
    fn invalid_base64_falls_back_to_plain_text() {
        let fx = Fixture::new();
        let text = "IMAGEDATA:aGVs bG8=";
        let report = fx.run(&fake_message(&["me"], None, text));
        assert_eq!(texts(&report), vec![text]);
    }

    #[test]
    fn signature_status_is_attached() {
        let fx = Fixture::new();
        fx.trust()
            .import_key(&fake_public("alice"), KeyOrigin::ImportedFromChat, None)
            .unwrap();

        let content = format!(
            "{}{}{}{}",
            fake_message(&["me"], Some("alice"), "signed"),
            fake_message(&["me"], Some("stranger"), "unknown"),
            fake_message(&["me"], Some("forged"), "tampered"),
            fake_message(&["me"], None, "unsigned"),
        );
        let report = fx.run(&content);

        let statuses: Vec<SignatureStatus> = report
            .items
            .iter()
            .filter_map(|i| match i {
                RenderItem::PlainText { signature, .. } => Some(signature.clone()),
                _ => None,
            })
            .collect();

        assert_eq!(
            statuses,
            vec![
                SignatureStatus::Valid {
                    signer: fake_fingerprint("alice")
                },
                SignatureStatus::UnknownSigner,
                SignatureStatus::Invalid,
                SignatureStatus::Unsigned,
            ]
        );
    }

    #[test]
    fn own_messages_verify_against_own_key() {
        let fx = Fixture::new();
        let report = fx.run(&fake_message(&["me"], Some("me"), "note to self"));
        assert!(matches!(
            &report.items[0],
            RenderItem::PlainText { signature: SignatureStatus::Valid { .. }, .. }
        ));
    }

    #[test]
    fn new_key_is_offered() {
        let fx = Fixture::new();
        let report = fx.run(&fake_public("alice"));
        assert_eq!(offers(&report), vec![fake_fingerprint("alice")]);
    }

    #[test]
    fn duplicate_key_in_one_pass_is_offered_once() {
        let fx = Fixture::new();
        let content = format!(
            "{}<p>chatter</p>{}{}",
            fake_public("alice"),
            fake_public("alice"),
            fake_public_with_comment("alice"),
        );
        let report = fx.run(&content);
        assert_eq!(offers(&report).len(), 1);
    }

    #[test]
    fn own_key_is_never_offered() {
        let fx = Fixture::new();
        let report = fx.run(&fake_public("me"));
        assert!(offers(&report).is_empty());
    }

    #[test]
    fn imported_key_is_not_offered_again() {
        let fx = Fixture::new();
        let content = fake_public("alice");

        let first = fx.run(&content);
        let offer = first.offers().next().unwrap().clone();
        fx.trust()
            .import_key(&offer.armored, KeyOrigin::ImportedFromChat, None)
            .unwrap();

        for _ in 0..3 {
            assert!(offers(&fx.run(&content)).is_empty());
        }
    }

    #[test]
    fn rejected_key_is_not_offered_again() {
        let fx = Fixture::new();
        let content = format!("{}{}", fake_public("mallory"), fake_public("alice"));

        fx.trust().reject_key(&fake_public("mallory")).unwrap();

        let report = fx.run(&content);
        assert_eq!(offers(&report), vec![fake_fingerprint("alice")]);
    }

    #[test]
    fn removed_key_stays_suppressed() {
        let fx = Fixture::new();
        fx.trust()
            .import_key(&fake_public("alice"), KeyOrigin::ImportedFromChat, None)
            .unwrap();
        fx.keys.remove_at(0).unwrap();

        assert!(offers(&fx.run(&fake_public("alice"))).is_empty());
    }

    #[test]
    fn unreadable_key_block_is_recorded_and_skipped() {
        let fx = Fixture::new();
        let broken =
            "-----BEGIN PGP PUBLIC KEY BLOCK-----\n\nnonsense\n-----END PGP PUBLIC KEY BLOCK-----";
        let content = format!("{broken}{}", fake_public("alice"));

        let report = fx.run(&content);
        assert_eq!(offers(&report), vec![fake_fingerprint("alice")]);
        assert!(matches!(
            report.failures[0],
            ItemFailure::InvalidKeyFormat { index: 0, .. }
        ));
    }

    #[test]
    fn messages_come_before_offers() {
        let fx = Fixture::new();
        let content = format!(
            "{}{}",
            fake_public("alice"),
            fake_message(&["me"], None, "hello")
        );
        let report = fx.run(&content);
        assert!(matches!(report.items[0], RenderItem::PlainText { .. }));
        assert!(matches!(report.items[1], RenderItem::KeyOffer(_)));
    }

    #[test]
    fn processing_never_mutates_store() {
        let fx = Fixture::new();
        let content = format!(
            "{}{}",
            fake_public("alice"),
            fake_message(&["me"], None, "hello")
        );
        let before_hidden = fx.keys.backend().raw(slots::HIDDEN_KEYS);
        fx.run(&content);
        assert_eq!(fx.keys.backend().raw(slots::HIDDEN_KEYS), before_hidden);
        assert!(fx.keys.is_empty().unwrap());
    }

    #[test]
    fn backend_failure_on_own_key_aborts_run() {
        let fx = Fixture::new();
        let pipeline = DecryptionPipeline::new(&fx.keys, &NoKeyReader, &fx.sanitizer);
        let content = fake_message(&["me"], Some("me"), "hi");

        let err = pipeline.process(&content, Some(&secret("pw"))).unwrap_err();
        assert!(matches!(err, SealroomError::CryptoUnavailable { .. }));
    }

    #[test]
    fn unreadable_own_public_key_only_warns() {
        let fx = Fixture::new();
        fx.keys.backend().set_raw(slots::PUBLIC_KEY, "garbage");
        let content = fake_message(&["me"], Some("me"), "hi");

        let report = fx.run(&content);
        assert_eq!(texts(&report), vec!["hi"]);
    }
}
