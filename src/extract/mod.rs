//! Main-text extraction from article pages.
//!
//! A [`ContentExtractor`] runs an ordered list of strategies over the page
//! markup. Each strategy proposes a fragment which is rendered to plain text;
//! the first rendering that reaches `min_viable_chars` wins. When none does,
//! the longest rendering is used if it reaches `min_content_chars`, and the
//! result is otherwise empty. Extraction never fails: garbage in, `""` out.
//!
//! Default strategy order:
//!
//! 1. DOM scoring ([`readability`])
//! 2. semantic containers (`<article>`, content-classed blocks, `<main>`)
//! 3. prose paragraphs
//! 4. the whole body minus chrome and ads

mod fallback;
mod markup;
mod readability;

use crate::config::ExtractorConfig;
use tracing::debug;

/// One extraction tier.
#[derive(Clone, Copy)]
pub struct Strategy {
    pub name: &'static str,
    pub run: fn(&str, &ExtractorConfig) -> Option<String>,
}

impl std::fmt::Debug for Strategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("Strategy").field(&self.name).finish()
    }
}

/// The built-in tiers in the order they are tried.
pub fn default_strategies() -> Vec<Strategy> {
    vec![
        Strategy {
            name: "readability",
            run: readability::best_candidate,
        },
        Strategy {
            name: "semantic",
            run: fallback::semantic_containers,
        },
        Strategy {
            name: "paragraphs",
            run: fallback::paragraphs,
        },
        Strategy {
            name: "body",
            run: fallback::stripped_body,
        },
    ]
}

#[derive(Debug, Clone)]
pub struct ContentExtractor {
    config: ExtractorConfig,
    strategies: Vec<Strategy>,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self::new(ExtractorConfig::default())
    }
}

impl ContentExtractor {
    pub fn new(config: ExtractorConfig) -> Self {
        Self::with_strategies(config, default_strategies())
    }

    pub fn with_strategies(config: ExtractorConfig, strategies: Vec<Strategy>) -> Self {
        Self { config, strategies }
    }

    pub fn config(&self) -> &ExtractorConfig {
        &self.config
    }

    /// Plain-text main content of `html`, or `""` when nothing usable is found.
    pub fn extract(&self, html: &str) -> String {
        if html.trim().is_empty() {
            return String::new();
        }
        let mut longest = String::new();
        let mut longest_len = 0;
        for strategy in &self.strategies {
            let Some(fragment) = (strategy.run)(html, &self.config) else {
                debug!(strategy = strategy.name, "No candidate");
                continue;
            };
            let text = markup::to_text(&fragment, self.config.max_chars);
            let len = text.chars().count();
            if len >= self.config.min_viable_chars {
                debug!(strategy = strategy.name, chars = len, "Extracted main content");
                return text;
            }
            debug!(strategy = strategy.name, chars = len, "Candidate below viable length");
            if len > longest_len {
                longest = text;
                longest_len = len;
            }
        }
        if longest_len >= self.config.min_content_chars {
            longest
        } else {
            String::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const STORY: &str = "The city council voted on Tuesday to extend late-night bus service \
        through the winter, citing strong ridership since the pilot began in spring. \
        Officials said the extension would cost less than expected.";

    fn noisy_page(article: &str) -> String {
        let filler = "Trending now: celebrity news, weather alerts, and more links to click. ";
        format!(
            r#"<html><head><title>Buses</title><script>track("{filler}")</script></head><body>
            <nav>{nav}</nav>
            <div class="ad-banner"><p>{ads}</p></div>
            <aside><p>{side}</p></aside>
            {article}
            <footer><p>{foot}</p></footer>
            </body></html>"#,
            nav = filler.repeat(20),
            ads = filler.repeat(20),
            side = filler.repeat(20),
            foot = filler.repeat(10),
        )
    }

    #[test]
    fn test_article_beats_noisy_body() {
        let page = noisy_page(&format!("<article><h1>Buses</h1><p>{STORY}</p><p>{STORY}</p></article>"));
        let text = ContentExtractor::default().extract(&page);
        assert!(text.contains("late-night bus service"));
        assert!(!text.contains("Trending now"));
        assert!(text.chars().count() >= 150);
    }

    #[test]
    fn test_falls_back_when_dom_scoring_finds_nothing() {
        // No <p> elements: the scorer has nothing to work with.
        let page = format!(
            r#"<body><nav>Home | World</nav><div class="entry-content">{STORY}<br>{STORY}</div></body>"#
        );
        let text = ContentExtractor::default().extract(&page);
        assert!(text.starts_with("The city council voted"));
        assert!(!text.contains("Home | World"));
    }

    #[test]
    fn test_short_content_is_kept_above_minimum() {
        let page = "<body><main>Residents can comment on the plan until March 3 at city hall.</main></body>";
        let text = ContentExtractor::default().extract(page);
        assert_eq!(text, "Residents can comment on the plan until March 3 at city hall.");
    }

    #[test]
    fn test_too_little_content_is_empty() {
        let page = "<body><nav>Menu</nav><div>Hi.</div></body>";
        assert_eq!(ContentExtractor::default().extract(page), "");
    }

    #[test]
    fn test_never_fails_on_garbage() {
        let extractor = ContentExtractor::default();
        let inputs = [
            String::new(),
            "   ".to_string(),
            "<".to_string(),
            "<<<>>></div></p><p".to_string(),
            "<div><div><div><section><article>unclosed".to_string(),
            String::from_utf8_lossy(&[0xff, 0xfe, 0x00, 0x3c, 0x70, 0x3e]).into_owned(),
            "plain text with no markup at all".to_string(),
        ];
        for input in &inputs {
            let text = extractor.extract(input);
            assert!(text.is_empty() || text.chars().count() >= 50, "{input:?} -> {text:?}");
        }
    }

    #[test]
    fn test_output_is_capped() {
        let long = format!("<article><p>{}</p></article>", STORY.repeat(60));
        let extractor = ContentExtractor::new(ExtractorConfig {
            max_chars: 500,
            ..ExtractorConfig::default()
        });
        let text = extractor.extract(&long);
        assert!(text.ends_with("..."));
        assert!(text.chars().count() <= 503);
    }

    #[test]
    fn test_custom_strategy_order() {
        fn fixed(_: &str, _: &ExtractorConfig) -> Option<String> {
            Some("<p>".to_string() + &"fixed text ".repeat(20) + "</p>")
        }
        let extractor = ContentExtractor::with_strategies(
            ExtractorConfig::default(),
            vec![Strategy { name: "fixed", run: fixed }],
        );
        assert!(extractor.extract("<p>anything</p>").starts_with("fixed text"));
    }
}
