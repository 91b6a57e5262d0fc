/// Which kind of OpenPGP object an armored block holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockKind {
    Message,
    PublicKey,
}

impl BlockKind {
    pub fn begin_marker(self) -> &'static str {
        match self {
            Self::Message => "-----BEGIN PGP MESSAGE-----",
            Self::PublicKey => "-----BEGIN PGP PUBLIC KEY BLOCK-----",
        }
    }

    pub fn end_marker(self) -> &'static str {
        match self {
            Self::Message => "-----END PGP MESSAGE-----",
            Self::PublicKey => "-----END PGP PUBLIC KEY BLOCK-----",
        }
    }
}

/// Delimited armored text found in room content. Lives for one pass.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArmoredBlock {
    pub kind: BlockKind,
    /// Byte offset of the BEGIN marker in the scanned content.
    pub offset: usize,
    /// Full text, markers included.
    pub text: String,
}
