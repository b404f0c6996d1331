//! Feed URL construction and the built-in category catalogue.
//!
//! Aggregator feeds come in three shapes:
//!
//! | Kind | URL |
//! |------|-----|
//! | Topic | `{base}/headlines/section/topic/{CODE}?hl=..&gl=..&ceid=..` |
//! | Geo | `{base}/headlines/section/geo/{location}?hl=..` |
//! | Query | `{base}/search?q={query}&hl=..` |

use crate::config::Locale;
use crate::models::{Source, SourceKind};

/// Name of the built-in category fed by the geo source.
pub const LOCAL_CATEGORY: &str = "Local";

/// Built-in categories in presentation order with their topic codes.
/// `Local` carries no code; its parameter is the configured location.
pub const DEFAULT_CATEGORIES: &[(&str, &str)] = &[
    ("U.S.", "NATION"),
    ("World", "WORLD"),
    (LOCAL_CATEGORY, "GEO"),
    ("Business", "BUSINESS"),
    ("Technology", "TECHNOLOGY"),
    ("Entertainment", "ENTERTAINMENT"),
    ("Sports", "SPORTS"),
    ("Science", "SCIENCE"),
    ("Health", "HEALTH"),
];

/// Build the feed URL for `source` under `base` (e.g. `https://news.google.com/rss`).
pub fn feed_url(base: &str, locale: &Locale, source: &Source) -> String {
    let base = base.trim_end_matches('/');
    let params = format!(
        "hl={}&gl={}&ceid={}",
        urlencoding::encode(&locale.hl),
        urlencoding::encode(&locale.gl),
        urlencoding::encode(&locale.ceid)
    );
    let parameter = source.parameter.trim();
    match source.kind {
        SourceKind::Topic => format!(
            "{base}/headlines/section/topic/{}?{params}",
            urlencoding::encode(&parameter.to_uppercase())
        ),
        SourceKind::Geo => format!(
            "{base}/headlines/section/geo/{}?{params}",
            urlencoding::encode(parameter)
        ),
        SourceKind::Query => format!("{base}/search?q={}&{params}", urlencoding::encode(parameter)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BASE: &str = "https://news.google.com/rss";

    #[test]
    fn test_topic_url() {
        let source = Source::new("Business", SourceKind::Topic, "business");
        assert_eq!(
            feed_url(BASE, &Locale::default(), &source),
            "https://news.google.com/rss/headlines/section/topic/BUSINESS?hl=en-US&gl=US&ceid=US%3Aen"
        );
    }

    #[test]
    fn test_geo_url_is_encoded() {
        let source = Source::new("Local", SourceKind::Geo, "New York, NY");
        let url = feed_url(BASE, &Locale::default(), &source);
        assert!(url.starts_with("https://news.google.com/rss/headlines/section/geo/New%20York%2C%20NY?"));
    }

    #[test]
    fn test_query_url_with_trailing_slash_base() {
        let source = Source::new("Rust", SourceKind::Query, "rust & wasm");
        let url = feed_url("https://news.test/rss/", &Locale::default(), &source);
        assert!(url.starts_with("https://news.test/rss/search?q=rust%20%26%20wasm&hl=en-US"));
    }
}
