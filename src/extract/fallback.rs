//! Pattern-based extraction tiers used when DOM scoring comes up short.

use super::markup;
use crate::config::ExtractorConfig;
use once_cell::sync::Lazy;
use regex::Regex;

static CONTENT_CLASS: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)content|post|entry|article|story").unwrap());
static PARAGRAPH: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<p\b[^>]*>(.*?)</p\s*>").unwrap());
static BODY: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?is)<body\b[^>]*>(.*)</body\s*>").unwrap());
static BOILERPLATE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)^(advertisement|all rights reserved|copyright|©|sign up|subscribe|follow us|share this|related:|read more|click here|cookie)",
    )
    .unwrap()
});

type Selector = fn(&str, &str) -> bool;

/// Semantic containers in priority order.
const CONTAINERS: &[(&str, Selector)] = &[
    ("article", is_article as Selector),
    ("content block", is_content_block as Selector),
    ("main", is_main as Selector),
];

fn is_article(name: &str, _open_tag: &str) -> bool {
    name == "article"
}

fn is_content_block(name: &str, open_tag: &str) -> bool {
    matches!(name, "div" | "section") && CONTENT_CLASS.is_match(&markup::signature(open_tag))
}

fn is_main(name: &str, _open_tag: &str) -> bool {
    name == "main"
}

/// The longest semantic container, preferring earlier patterns whose best
/// match already clears `min_viable_chars`.
pub(crate) fn semantic_containers(html: &str, config: &ExtractorConfig) -> Option<String> {
    let mut longest: Option<(usize, String)> = None;
    for (label, select) in CONTAINERS {
        let best = markup::inner_elements(html, select)
            .into_iter()
            .map(markup::strip_noise)
            .map(|fragment| (text_len(&fragment, config), fragment))
            .max_by_key(|(len, _)| *len);
        let Some((len, fragment)) = best else { continue };
        tracing::trace!(pattern = *label, chars = len, "Semantic container");
        if len >= config.min_viable_chars {
            return Some(fragment);
        }
        if longest.as_ref().is_none_or(|(best_len, _)| len > *best_len) {
            longest = Some((len, fragment));
        }
    }
    longest.map(|(_, fragment)| fragment)
}

/// Every paragraph long enough to be prose, minus stock boilerplate lines.
pub(crate) fn paragraphs(html: &str, config: &ExtractorConfig) -> Option<String> {
    let html = markup::strip_noise(html);
    let kept: Vec<String> = PARAGRAPH
        .captures_iter(&html)
        .filter_map(|caps| caps.get(1))
        .map(|inner| markup::to_text(inner.as_str(), config.max_chars))
        .filter(|text| text.chars().count() > config.paragraph_min_chars)
        .filter(|text| !BOILERPLATE.is_match(text))
        .map(|text| format!("<p>{}</p>", html_escape::encode_text(&text)))
        .collect();
    if kept.is_empty() { None } else { Some(kept.concat()) }
}

/// The whole body with chrome, scripts and ads removed.
pub(crate) fn stripped_body(html: &str, _config: &ExtractorConfig) -> Option<String> {
    let body = BODY
        .captures(html)
        .and_then(|caps| caps.get(1))
        .map_or(html, |m| m.as_str());
    let stripped = markup::strip_noise(body);
    if stripped.trim().is_empty() { None } else { Some(stripped) }
}

fn text_len(fragment: &str, config: &ExtractorConfig) -> usize {
    markup::to_text(fragment, config.max_chars).chars().count()
}
