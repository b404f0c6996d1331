//! Summary selection: feed description or extracted article text.
//!
//! The policy is description-first. A feed description that is substantial on
//! its own is chosen and the article page is never fetched. Otherwise the
//! extracted text is used when it is long enough, and the description is the
//! last resort.
//!
//! Cleanup runs on the chosen text and removes what aggregators wrap around
//! it: the headline repeated at the start, and publisher attribution at the
//! end (`- Reuters`, `example.com`, `CNN CNN` for a CNN story).

use crate::config::SummaryConfig;
use crate::models::Article;
use once_cell::sync::Lazy;
use regex::Regex;

static DOMAIN_SUFFIX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)[\s\-–—|·•]*[(\[]?\b(?:[a-z0-9-]+\.)+[a-z]{2,}[)\]]?\s*$").unwrap()
});
static TOKEN: Lazy<Regex> = Lazy::new(|| Regex::new(r"\S+").unwrap());

const LEADING_PUNCTUATION: &str = "-–—:|,.·•";
const TRAILING_SEPARATORS: &str = "-–—:|,·•";

/// Decides between description and extracted text for each article.
#[derive(Debug, Clone, Default)]
pub struct SummaryPolicy {
    config: SummaryConfig,
}

impl SummaryPolicy {
    pub fn new(config: SummaryConfig) -> Self {
        Self { config }
    }

    /// False when the feed description alone is substantial.
    pub fn needs_extraction(&self, article: &Article) -> bool {
        !is_substantial(article.description.trim(), &self.config)
    }

    /// The final summary for `article` given the extracted page text
    /// (empty when extraction was skipped or failed).
    pub fn summarize(&self, article: &Article, extracted: &str) -> String {
        let description = article.description.trim();
        let chosen = select(description, extracted.trim(), &self.config);
        let cleaned = clean(&article.title, chosen);
        if cleaned.is_empty() {
            // Cleanup can consume a description that was only headline and publisher.
            description.to_string()
        } else {
            cleaned
        }
    }
}

pub fn is_substantial(description: &str, config: &SummaryConfig) -> bool {
    description.chars().count() >= config.substantial_chars
}

/// Description when substantial, else extracted text above the acceptance
/// threshold, else the description (possibly empty).
pub fn select<'a>(description: &'a str, extracted: &'a str, config: &SummaryConfig) -> &'a str {
    if is_substantial(description, config) {
        description
    } else if extracted.chars().count() > config.accept_chars {
        extracted
    } else {
        description
    }
}

/// Strip a repeated headline from the start of `text` and publisher
/// attribution from its end.
pub fn clean(title: &str, text: &str) -> String {
    let (headline, publisher) = split_title(title);
    let text = strip_title_prefix(text.trim(), title.trim(), headline);
    strip_attribution(text, publisher)
}

/// `"Headline - Publisher"` into its parts; titles without a separator have no publisher.
fn split_title(title: &str) -> (&str, Option<&str>) {
    let title = title.trim();
    match title.rsplit_once(" - ") {
        Some((headline, publisher)) if !headline.trim().is_empty() && !publisher.trim().is_empty() => {
            (headline.trim(), Some(publisher.trim()))
        }
        _ => (title, None),
    }
}

fn strip_title_prefix<'a>(text: &'a str, title: &str, headline: &str) -> &'a str {
    [title, headline]
        .into_iter()
        .filter(|candidate| !candidate.is_empty())
        .find_map(|candidate| strip_prefix_ignore_case(text, candidate))
        .map_or(text, |rest| {
            rest.trim_start_matches(|c: char| c.is_whitespace() || LEADING_PUNCTUATION.contains(c))
        })
}

fn strip_attribution(text: &str, publisher: Option<&str>) -> String {
    let mut current = text.trim().to_string();
    loop {
        let next = strip_attribution_once(&current, publisher);
        if next == current {
            return current;
        }
        current = next;
    }
}

fn strip_attribution_once(text: &str, publisher: Option<&str>) -> String {
    let text = publisher
        .and_then(|p| strip_suffix_ignore_case(text, p))
        .unwrap_or(text);
    let text = DOMAIN_SUFFIX.replace(text, "");
    strip_repeated_tail(&text, publisher)
        .trim_end_matches(|c: char| c.is_whitespace() || TRAILING_SEPARATORS.contains(c))
        .to_string()
}

/// Drop a trailing run of two or more copies of one publisher token
/// (`"... CNN CNN"` for publisher `CNN`). Without a publisher nothing is dropped.
fn strip_repeated_tail<'a>(text: &'a str, publisher: Option<&str>) -> &'a str {
    let Some(publisher) = publisher else { return text };
    let tokens: Vec<_> = TOKEN.find_iter(text).collect();
    let Some(last) = tokens.last() else { return text };
    let is_publisher_token = publisher
        .split_whitespace()
        .any(|token| token.eq_ignore_ascii_case(last.as_str()));
    if !is_publisher_token {
        return text;
    }
    let run = tokens
        .iter()
        .rev()
        .take_while(|token| token.as_str().eq_ignore_ascii_case(last.as_str()))
        .count();
    if run < 2 {
        return text;
    }
    &text[..tokens[tokens.len() - run].start()]
}

fn chars_match(a: char, b: char) -> bool {
    a.to_lowercase().eq(b.to_lowercase())
}

/// `text` minus `prefix` (case-insensitive) when the prefix ends on a word boundary.
fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices();
    for expected in prefix.chars() {
        let (_, actual) = chars.next()?;
        if !chars_match(actual, expected) {
            return None;
        }
    }
    let rest = &text[chars.offset()..];
    match rest.chars().next() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}

/// `text` minus `suffix` (case-insensitive) when the suffix starts on a word boundary.
fn strip_suffix_ignore_case<'a>(text: &'a str, suffix: &str) -> Option<&'a str> {
    let mut chars = text.char_indices().rev();
    let mut cut = text.len();
    for expected in suffix.chars().rev() {
        let (index, actual) = chars.next()?;
        if !chars_match(actual, expected) {
            return None;
        }
        cut = index;
    }
    let rest = &text[..cut];
    match rest.chars().next_back() {
        Some(c) if c.is_alphanumeric() => None,
        _ => Some(rest),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn article(title: &str, description: &str) -> Article {
        Article {
            category: "World".into(),
            title: title.into(),
            link: "https://news.test/a".into(),
            description: description.into(),
            ..Default::default()
        }
    }

    const LONG: &str = "Lawmakers agreed on a framework for the new transit budget late on Thursday, \
        ending weeks of negotiations over fares.";

    #[test]
    fn test_select_rules() {
        let config = SummaryConfig::default();
        let extracted = "x".repeat(120);
        assert_eq!(select(LONG, &extracted, &config), LONG);
        assert_eq!(select("short", &extracted, &config), extracted);
        assert_eq!(select("short", "also short", &config), "short");
        assert_eq!(select("", "", &config), "");
    }

    #[test]
    fn test_substantial_description_is_unchanged() {
        let policy = SummaryPolicy::default();
        let article = article("Transit deal reached - City Wire", LONG);
        assert!(!policy.needs_extraction(&article));
        assert_eq!(policy.summarize(&article, ""), LONG);
    }

    #[test]
    fn test_headline_led_description_skips_extraction() {
        let policy = SummaryPolicy::default();
        let description = "Rail link opens early. Regional officials confirmed on Wednesday that the line will open next spring.";
        let article = article("Rail link opens early - City Wire", description);
        assert!(description.chars().count() >= 100);
        assert!(!policy.needs_extraction(&article));
        assert_eq!(
            policy.summarize(&article, ""),
            "Regional officials confirmed on Wednesday that the line will open next spring."
        );
    }

    #[test]
    fn test_short_description_needs_extraction() {
        let policy = SummaryPolicy::default();
        let article = article(
            "Transit deal reached - City Wire",
            "Transit deal reached City Wire",
        );
        assert!(policy.needs_extraction(&article));
        // Nothing else to offer: the raw description survives.
        assert_eq!(policy.summarize(&article, ""), "Transit deal reached City Wire");
        assert_eq!(policy.summarize(&article, LONG), LONG);
    }

    #[test]
    fn test_strips_title_prefix_case_insensitively() {
        assert_eq!(
            clean("Big News - Wire", "BIG NEWS — the rest of it is here."),
            "the rest of it is here."
        );
        assert_eq!(
            clean("Markets rally - Daily Ledger", "Markets rally: stocks rose on Monday. - Daily Ledger"),
            "stocks rose on Monday."
        );
    }

    #[test]
    fn test_prefix_must_end_on_word_boundary() {
        assert_eq!(clean("Foo", "Foobar rises"), "Foobar rises");
    }

    #[test]
    fn test_strips_domain_suffix() {
        assert_eq!(
            clean("Storm hits coast", "Heavy rain fell overnight across the coast. example.co.uk"),
            "Heavy rain fell overnight across the coast."
        );
        assert_eq!(
            clean("Storm hits coast", "Heavy rain fell overnight. (bbc.co.uk)"),
            "Heavy rain fell overnight."
        );
    }

    #[test]
    fn test_strips_repeated_publisher_tokens() {
        assert_eq!(
            clean("Quake shakes city - CNN", "Buildings swayed for several seconds CNN CNN CNN"),
            "Buildings swayed for several seconds"
        );
        assert_eq!(
            clean("Quake shakes city - Seattle Times", "Buildings swayed for several seconds Times Times"),
            "Buildings swayed for several seconds"
        );
    }

    #[test]
    fn test_keeps_repeated_place_names() {
        assert_eq!(
            clean(
                "Wine festival returns - Seattle Times",
                "The annual wine festival returns next month to Walla Walla"
            ),
            "The annual wine festival returns next month to Walla Walla"
        );
        assert_eq!(
            clean("Tourism rebounds", "Tourists are flocking back to Bora Bora"),
            "Tourists are flocking back to Bora Bora"
        );
    }

    #[test]
    fn test_strips_publisher_suffix_repeatedly() {
        assert_eq!(
            clean("Vote delayed - The Herald", "Council postponed the vote. The Herald - The Herald"),
            "Council postponed the vote."
        );
    }

    #[test]
    fn test_plain_text_untouched() {
        assert_eq!(clean("Title", "U.S. growth slowed to 2.1%."), "U.S. growth slowed to 2.1%.");
    }
}
