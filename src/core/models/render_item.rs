use super::fingerprint::Fingerprint;
use super::pgp::SignatureStatus;

/// One unit of pipeline output, ready for display.
#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    PlainText {
        text: String,
        signature: SignatureStatus,
    },
    Image {
        bytes: Vec<u8>,
        caption: Option<String>,
        signature: SignatureStatus,
    },
    KeyOffer(KeyOffer),
}

/// A public key seen in the room that the user has not decided on yet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyOffer {
    pub fingerprint: Fingerprint,
    pub armored: String,
    pub user_ids: Vec<String>,
}

/// A failure confined to a single block of the batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemFailure {
    /// Message block `index` (0-based, document order) did not decrypt.
    DecryptError { index: usize, reason: String },
    /// Key block `index` (0-based, document order) did not parse.
    InvalidKeyFormat { index: usize, reason: String },
}

impl std::fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::DecryptError { index, reason } => {
                write!(f, "message #{}: {reason}", index + 1)
            }
            Self::InvalidKeyFormat { index, reason } => {
                write!(f, "key block #{}: {reason}", index + 1)
            }
        }
    }
}

/// Everything a single pipeline pass produced.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineReport {
    pub items: Vec<RenderItem>,
    pub failures: Vec<ItemFailure>,
}

impl PipelineReport {
    pub fn is_empty(&self) -> bool {
        self.items.is_empty() && self.failures.is_empty()
    }

    pub fn offers(&self) -> impl Iterator<Item = &KeyOffer> {
        self.items.iter().filter_map(|item| match item {
            RenderItem::KeyOffer(offer) => Some(offer),
            _ => None,
        })
    }

    pub fn decrypt_errors(&self) -> usize {
        self.failures
            .iter()
            .filter(|f| matches!(f, ItemFailure::DecryptError { .. }))
            .count()
    }
}
