use std::sync::LazyLock;

use regex::{Captures, Regex};

use crate::core::traits::sanitizer::ContentSanitizer;

static DANGEROUS_BLOCK: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<!--.*?-->")
        .expect("static regex")
});
static LINE_BREAK: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)<br\s*/?>").expect("static regex"));
static TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)<(/?)([A-Za-z][A-Za-z0-9]*)\b([^>]*)>").expect("static regex")
});
static HREF: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"(?i)\bhref\s*=\s*(?:"([^"]*)"|'([^']*)'|([^\s"'>]+))"#).expect("static regex")
});

const SAFE_SCHEMES: &[&str] = &["http://", "https://", "mailto:"];

/// Allow-list tag stripper.
///
/// Keeps `strong`, `em`, `u` and `a` (with a plain http(s)/mailto `href`
/// and no other attribute). Script and style elements are dropped with
/// their content, `<br>` becomes a newline, every other tag is removed and
/// its text kept.
#[derive(Debug, Clone)]
pub struct TagAllowlist {
    allowed: Vec<String>,
}

impl Default for TagAllowlist {
    fn default() -> Self {
        Self {
            allowed: ["strong", "em", "u", "a"].map(String::from).to_vec(),
        }
    }
}

impl TagAllowlist {
    fn is_allowed(&self, tag: &str) -> bool {
        self.allowed.iter().any(|t| t.eq_ignore_ascii_case(tag))
    }

    fn rewrite_tag(&self, caps: &Captures<'_>) -> String {
        let closing = !caps[1].is_empty();
        let name = caps[2].to_ascii_lowercase();

        if !self.is_allowed(&name) {
            return String::new();
        }
        if closing {
            return format!("</{name}>");
        }
        if name != "a" {
            return format!("<{name}>");
        }

        match safe_href(&caps[3]) {
            Some(href) => format!("<a href=\"{}\">", href.replace('"', "&quot;")),
            None => "<a>".to_string(),
        }
    }
}

fn safe_href(attrs: &str) -> Option<String> {
    let caps = HREF.captures(attrs)?;
    let value = caps.get(1).or(caps.get(2)).or(caps.get(3))?.as_str().trim();
    let lower = value.to_ascii_lowercase();
    SAFE_SCHEMES
        .iter()
        .any(|s| lower.starts_with(s))
        .then(|| value.to_string())
}

impl ContentSanitizer for TagAllowlist {
    fn sanitize(&self, raw: &str) -> String {
        let without_blocks = DANGEROUS_BLOCK.replace_all(raw, "");
        let with_breaks = LINE_BREAK.replace_all(&without_blocks, "\n");
        TAG.replace_all(&with_breaks, |caps: &Captures<'_>| self.rewrite_tag(caps))
            .into_owned()
    }
}
