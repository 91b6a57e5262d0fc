use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use colored::Colorize;
use regex::{Captures, Regex};
use sha2::{Digest, Sha256};

use crate::cli::output;
use crate::core::errors::Result;
use crate::core::models::pgp::SignatureStatus;
use crate::core::models::render_item::{KeyOffer, PipelineReport, RenderItem};

static STRONG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<strong>(.*?)</strong>").expect("static regex"));
static EM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<em>(.*?)</em>").expect("static regex"));
static UNDERLINE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<u>(.*?)</u>").expect("static regex"));
static LINK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?s)<a(?: href="([^"]*)")?>(.*?)</a>"#).expect("static regex")
});
static ANY_TAG: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"</?[A-Za-z][^>]*>").expect("static regex"));

/// Continuation lines of one message sit under this prefix, so message
/// text can never start a line of its own in the badge column.
const CONTINUATION: &str = "    │ ";

/// Turn sanitized room markup into terminal text.
///
/// Control characters from the sender are dropped before any styling is
/// added; only newlines and tabs survive.
pub fn to_terminal(markup: &str) -> String {
    let markup = strip_controls(markup);
    let text = STRONG.replace_all(&markup, |c: &Captures<'_>| c[1].bold().cyan().to_string());
    let text = EM.replace_all(&text, |c: &Captures<'_>| c[1].italic().to_string());
    let text = UNDERLINE.replace_all(&text, |c: &Captures<'_>| c[1].underline().to_string());
    let text = LINK.replace_all(&text, |c: &Captures<'_>| match c.get(1) {
        Some(href) if href.as_str() != &c[2] => format!("{} ({})", &c[2], href.as_str()),
        _ => c[2].to_string(),
    });
    let text = ANY_TAG.replace_all(&text, "");
    unescape(&text)
}

fn strip_controls(text: &str) -> String {
    text.chars()
        .filter(|c| matches!(c, '\n' | '\t') || !c.is_control())
        .collect()
}

/// One printed item: badge on the first line, the rest indented under it.
fn format_line(badge: &str, text: &str) -> String {
    let body = text.lines().collect::<Vec<_>>().join(&format!("\n{CONTINUATION}"));
    format!("  {badge} {body}")
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}

fn signature_badge(status: &SignatureStatus) -> String {
    match status {
        SignatureStatus::Valid { .. } => "✓".green().to_string(),
        SignatureStatus::Invalid => "⚠ BAD SIGNATURE".red().bold().to_string(),
        SignatureStatus::UnknownSigner => "?".yellow().to_string(),
        SignatureStatus::Unsigned => "·".dimmed().to_string(),
    }
}

/// File extension for common image formats, sniffed from magic bytes.
pub fn image_extension(bytes: &[u8]) -> &'static str {
    match bytes {
        [0x89, b'P', b'N', b'G', ..] => "png",
        [0xFF, 0xD8, 0xFF, ..] => "jpg",
        [b'G', b'I', b'F', b'8', ..] => "gif",
        [b'R', b'I', b'F', b'F', _, _, _, _, b'W', b'E', b'B', b'P', ..] => "webp",
        _ => "png",
    }
}

/// Write `bytes` under `dir`, named by content hash. Same image, same file.
pub fn save_image(dir: &Path, bytes: &[u8]) -> Result<PathBuf> {
    std::fs::create_dir_all(dir)?;
    let digest = format!("{:x}", Sha256::digest(bytes));
    let path = dir.join(format!("{}.{}", &digest[..16], image_extension(bytes)));
    if !path.exists() {
        std::fs::write(&path, bytes)?;
    }
    Ok(path)
}

/// One-line description of a key offer.
pub fn describe_offer(offer: &KeyOffer) -> String {
    let who = offer
        .user_ids
        .first()
        .map(String::as_str)
        .unwrap_or("(no user ID)");
    format!("{who}  {}", offer.fingerprint.to_string().dimmed())
}

/// Print messages and per-item failures. Offers are left to the caller.
///
/// An image that cannot be saved is reported on its own line; the rest of
/// the report is still printed.
pub fn print_report(report: &PipelineReport, images_dir: &Path) {
    for item in &report.items {
        match item {
            RenderItem::PlainText { text, signature } => {
                println!("{}", format_line(&signature_badge(signature), &to_terminal(text)));
            }
            RenderItem::Image {
                bytes,
                caption,
                signature,
            } => {
                let badge = signature_badge(signature);
                if let Some(caption) = caption {
                    println!("{}", format_line(&badge, &to_terminal(caption)));
                }
                match save_image(images_dir, bytes) {
                    Ok(path) => println!(
                        "  {badge} image saved to {}",
                        path.display().to_string().cyan()
                    ),
                    Err(e) => {
                        tracing::warn!(dir = %images_dir.display(), error = %e, "image not saved");
                        output::warning(&format!("Could not save image: {e}"));
                    }
                }
            }
            RenderItem::KeyOffer(_) => {}
        }
    }

    for failure in &report.failures {
        output::warning(&failure.to_string());
    }
}
