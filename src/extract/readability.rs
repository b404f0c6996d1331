//! Readability-style scoring over a parsed DOM.
//!
//! Every text-bearing block (`p`, `pre`, `td`) long enough to matter awards
//! points to its parent and half as many to its grandparent. Candidates start
//! from a tag- and class-based prior and are discounted by link density. The
//! winner's markup, stripped of chrome and ads, is the primary extraction.

use super::markup;
use crate::config::ExtractorConfig;
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use indexmap::IndexMap;

static TEXT_BLOCKS: Lazy<Selector> = Lazy::new(|| Selector::parse("p, pre, td").unwrap());
static LINKS: Lazy<Selector> = Lazy::new(|| Selector::parse("a").unwrap());

static UNLIKELY: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)banner|breadcrumb|combx|comment|community|cookie|disqus|extra|foot|header|legends|menu|modal|related|remark|replies|rss|share|shoutbox|sidebar|skyscraper|social|sponsor|subscribe|popup|\bads?\b|promo|newsletter",
    )
    .unwrap()
});
static MAYBE_CANDIDATE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)and|article|body|column|content|main|shadow").unwrap());
static POSITIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)article|body|content|entry|hentry|h-entry|main|page|post|story|text|blog")
        .unwrap()
});
static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)-ad-|hidden|^hid$|\bhid\b|banner|combx|comment|contact|foot|footer|footnote|masthead|media|meta|outbrain|promo|related|scroll|share|shoutbox|sidebar|skyscraper|sponsor|shopping|tags|tool|widget",
    )
    .unwrap()
});

/// Blocks shorter than this add nothing.
const MIN_BLOCK_CHARS: usize = 25;

/// Markup of the highest-scoring container, or `None` when nothing scored.
pub(crate) fn best_candidate(html: &str, _config: &ExtractorConfig) -> Option<String> {
    let document = Html::parse_document(html);
    // Insertion order follows the document, so ties go to the earliest candidate.
    let mut scores: IndexMap<_, (ElementRef<'_>, f64)> = IndexMap::new();

    for block in document.select(&TEXT_BLOCKS) {
        if is_unlikely(block) {
            continue;
        }
        let length = text_len(block);
        if length < MIN_BLOCK_CHARS {
            continue;
        }
        let commas = block.text().map(|t| t.matches(',').count()).sum::<usize>();
        let score = 1.0 + commas as f64 + (length / 100).min(3) as f64;

        let mut ancestors = block.ancestors().filter_map(ElementRef::wrap);
        if let Some(parent) = ancestors.next() {
            scores.entry(parent.id()).or_insert_with(|| (parent, initial_score(parent))).1 += score;
            if let Some(grandparent) = ancestors.next() {
                scores
                    .entry(grandparent.id())
                    .or_insert_with(|| (grandparent, initial_score(grandparent)))
                    .1 += score / 2.0;
            }
        }
    }

    let (best, score) = scores
        .into_values()
        .map(|(element, score)| (element, score * (1.0 - link_density(element))))
        .reduce(|best, next| if next.1 > best.1 { next } else { best })?;
    if score <= 0.0 {
        return None;
    }
    tracing::trace!(tag = best.value().name(), score, "Readability candidate");
    Some(markup::strip_noise(&best.html()))
}

/// The element or any ancestor is chrome by tag, or looks like it by class/id.
fn is_unlikely(element: ElementRef<'_>) -> bool {
    std::iter::once(element)
        .chain(element.ancestors().filter_map(ElementRef::wrap))
        .any(|node| {
            let value = node.value();
            if markup::NOISE_TAGS.contains(&value.name()) {
                return true;
            }
            let signature = format!(
                "{} {}",
                value.attr("class").unwrap_or_default(),
                value.id().unwrap_or_default()
            );
            UNLIKELY.is_match(&signature) && !MAYBE_CANDIDATE.is_match(&signature)
        })
}

fn initial_score(element: ElementRef<'_>) -> f64 {
    let base = match element.value().name() {
        "article" | "main" | "section" | "div" => 5.0,
        "pre" | "td" | "blockquote" => 3.0,
        "address" | "ol" | "ul" | "dl" | "dd" | "dt" | "li" | "form" => -3.0,
        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "th" => -5.0,
        _ => 0.0,
    };
    base + class_weight(element)
}

fn class_weight(element: ElementRef<'_>) -> f64 {
    let value = element.value();
    [value.attr("class"), value.id()]
        .into_iter()
        .flatten()
        .map(|name| {
            let mut weight = 0.0;
            if NEGATIVE.is_match(name) {
                weight -= 25.0;
            }
            if POSITIVE.is_match(name) {
                weight += 25.0;
            }
            weight
        })
        .sum()
}

fn text_len(element: ElementRef<'_>) -> usize {
    element
        .text()
        .flat_map(str::split_whitespace)
        .map(|word| word.chars().count() + 1)
        .sum()
}

fn link_density(element: ElementRef<'_>) -> f64 {
    let total = text_len(element);
    if total == 0 {
        return 1.0;
    }
    let linked: usize = element.select(&LINKS).map(text_len).sum();
    (linked as f64 / total as f64).min(1.0)
}
