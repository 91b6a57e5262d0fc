/// Everything one outgoing message needs, passed explicitly into
/// `ComposeService::seal`. Nothing survives between two sends.
#[derive(Debug, Clone, Default)]
pub struct ComposeContext {
    pub text: String,
    pub image: Option<Vec<u8>>,
}

impl ComposeContext {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            image: None,
        }
    }

    pub fn with_image(mut self, bytes: Vec<u8>) -> Self {
        self.image = Some(bytes);
        self
    }
}

/// Armored payloads ready for the room, in posting order.
#[derive(Debug, Clone)]
pub struct SealedMessage {
    /// The sender's public key, posted first so others can import it.
    pub public_key: String,
    pub message: String,
    pub recipient_count: usize,
}
