//! Tolerant string-level helpers over HTML markup.
//!
//! These work on raw text with regexes and a balanced-tag scanner so they
//! behave on broken documents where a DOM parser would guess.

use once_cell::sync::Lazy;
use regex::Regex;

/// Any open, close or self-closing tag. Groups: slash, name, self-close slash.
static TAG: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)<(/?)([a-z][a-z0-9]*)\b[^>]*?(/?)>").unwrap());
static ATTRIBUTES: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)\b(?:class|id)\s*=\s*["']([^"']*)["']"#).unwrap());
static COMMENTS: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<!--.*?-->").unwrap());
static SCRIPTS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b.*?</script\s*>|<style\b.*?</style\s*>|<noscript\b.*?</noscript\s*>")
        .unwrap()
});
static BLOCK_CLOSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)</(p|div|h[1-6]|li|ul|ol|dl|dd|dt|article|section|main|blockquote|pre|table|tr|figure|figcaption|header|footer)\s*>|<hr\b[^>]*>",
    )
    .unwrap()
});
static SOURCE_WHITESPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\s+").unwrap());
static LINE_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)<br\b[^>]*>").unwrap());
static ANY_TAG: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?s)<[^>]*>").unwrap());
static HORIZONTAL_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r"[^\S\n]+").unwrap());
static LINE_EDGES: Lazy<Regex> = Lazy::new(|| Regex::new(r" ?\n ?").unwrap());
static BLANK_LINES: Lazy<Regex> = Lazy::new(|| Regex::new(r"\n{3,}").unwrap());

/// Class and id names that mark advertising.
static AD_MARKERS: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\b(ads?|advert\w*|sponsor\w*|promo\w*|banner|outbrain|taboola)\b").unwrap()
});
/// Class and id names that mark article bodies, which outrank an ad marker.
pub(crate) static CONTENT_MARKERS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)article|body|content|entry|main|post|story|text").unwrap());

/// Elements that never carry article text.
pub(crate) const NOISE_TAGS: &[&str] = &[
    "nav", "header", "footer", "aside", "form", "button", "script", "style", "noscript",
    "iframe", "svg", "template",
];

/// Space-joined `class` and `id` values of an opening tag.
pub(crate) fn signature(open_tag: &str) -> String {
    ATTRIBUTES
        .captures_iter(open_tag)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str())
        .collect::<Vec<_>>()
        .join(" ")
}

/// Find the tag balancing an element opened just before `from`.
/// Returns the byte range of the element's content and the end of its close tag.
pub(crate) fn element_end(html: &str, from: usize, name: &str) -> Option<(usize, usize)> {
    let mut depth = 1usize;
    let mut cursor = from;
    while let Some(caps) = TAG.captures_at(html, cursor) {
        let whole = caps.get(0)?;
        cursor = whole.end();
        if !caps[2].eq_ignore_ascii_case(name) || !caps[3].is_empty() {
            continue;
        }
        if caps[1].is_empty() {
            depth += 1;
        } else {
            depth -= 1;
            if depth == 0 {
                return Some((whole.start(), whole.end()));
            }
        }
    }
    None
}

/// Inner markup of every element whose opening tag satisfies `select`.
/// `select` receives the lowercase tag name and the full opening tag.
/// Unclosed elements are skipped.
pub(crate) fn inner_elements<'a>(
    html: &'a str,
    select: impl Fn(&str, &str) -> bool,
) -> Vec<&'a str> {
    let mut found = Vec::new();
    let mut cursor = 0;
    while let Some(caps) = TAG.captures_at(html, cursor) {
        let Some(whole) = caps.get(0) else { break };
        cursor = whole.end();
        if !caps[1].is_empty() || !caps[3].is_empty() {
            continue;
        }
        let name = caps[2].to_ascii_lowercase();
        if !select(&name, whole.as_str()) {
            continue;
        }
        if let Some((close_start, _)) = element_end(html, whole.end(), &name) {
            found.push(&html[whole.end()..close_start]);
        }
    }
    found
}

/// Remove every element whose opening tag satisfies `drop`, together with its
/// content. An unclosed match loses only its opening tag.
pub(crate) fn strip_elements(html: &str, drop: impl Fn(&str, &str) -> bool) -> String {
    let mut out = String::with_capacity(html.len());
    let mut kept_from = 0;
    let mut cursor = 0;
    while let Some(caps) = TAG.captures_at(html, cursor) {
        let Some(whole) = caps.get(0) else { break };
        cursor = whole.end();
        if !caps[1].is_empty() || !caps[3].is_empty() {
            continue;
        }
        let name = caps[2].to_ascii_lowercase();
        if !drop(&name, whole.as_str()) {
            continue;
        }
        out.push_str(&html[kept_from..whole.start()]);
        kept_from = match element_end(html, whole.end(), &name) {
            Some((_, end)) => end,
            None => whole.end(),
        };
        cursor = kept_from;
    }
    out.push_str(&html[kept_from..]);
    out
}

/// True for elements that are navigation chrome or advertising.
pub(crate) fn is_noise(name: &str, open_tag: &str) -> bool {
    if NOISE_TAGS.contains(&name) {
        return true;
    }
    let signature = signature(open_tag);
    AD_MARKERS.is_match(&signature) && !CONTENT_MARKERS.is_match(&signature)
}

/// Drop comments, scripts, chrome and ads from a fragment.
pub(crate) fn strip_noise(html: &str) -> String {
    let html = COMMENTS.replace_all(html, "");
    let html = SCRIPTS.replace_all(&html, "");
    strip_elements(&html, is_noise)
}

/// Render a fragment as plain text with paragraph breaks, capped at
/// `max_chars` characters plus a `...` marker.
pub(crate) fn to_text(html: &str, max_chars: usize) -> String {
    let html = COMMENTS.replace_all(html, "");
    let html = SCRIPTS.replace_all(&html, "");
    let html = SOURCE_WHITESPACE.replace_all(&html, " ");
    let html = BLOCK_CLOSE.replace_all(&html, "\n\n");
    let html = LINE_BREAK.replace_all(&html, "\n");
    let text = ANY_TAG.replace_all(&html, "");
    // Tags go first so an escaped `&lt;` in prose survives as a literal.
    let text = html_escape::decode_html_entities(&text);
    let text = HORIZONTAL_SPACE.replace_all(&text, " ");
    let text = LINE_EDGES.replace_all(&text, "\n");
    let text = BLANK_LINES.replace_all(&text, "\n\n");
    truncate(text.trim(), max_chars)
}

fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
        None => text.to_string(),
    }
}
