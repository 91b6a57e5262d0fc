use crate::core::models::armored_block::{ArmoredBlock, BlockKind};

/// Armored blocks found in one piece of content, each list in document order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extracted {
    pub messages: Vec<ArmoredBlock>,
    pub key_blocks: Vec<ArmoredBlock>,
}

impl Extracted {
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty() && self.key_blocks.is_empty()
    }
}

/// Scan sanitized content for PGP messages and public key blocks.
///
/// Each BEGIN marker pairs with the nearest following END marker of the
/// same kind. A BEGIN that meets another BEGIN before its END is
/// unterminated and produces nothing; scanning resumes at the later BEGIN.
pub fn extract(content: &str) -> Extracted {
    Extracted {
        messages: scan(content, BlockKind::Message),
        key_blocks: scan(content, BlockKind::PublicKey),
    }
}

fn scan(content: &str, kind: BlockKind) -> Vec<ArmoredBlock> {
    let begin = kind.begin_marker();
    let end = kind.end_marker();

    let mut blocks = Vec::new();
    let mut cursor = 0;

    while let Some(rel) = content[cursor..].find(begin) {
        let start = cursor + rel;
        let body_start = start + begin.len();

        let Some(end_rel) = content[body_start..].find(end) else {
            break;
        };
        let body_end = body_start + end_rel;

        if let Some(nested) = content[body_start..body_end].find(begin) {
            cursor = body_start + nested;
            continue;
        }

        let stop = body_end + end.len();
        blocks.push(ArmoredBlock {
            kind,
            offset: start,
            text: content[start..stop].to_string(),
        });
        cursor = stop;
    }

    blocks
}
