//! Pipeline orchestrator.
//!
//! One run moves through `Idle → FetchingFeeds → Deduplicating →
//! ExtractingArticles → Done`, each stage finishing completely before the
//! next starts:
//!
//! 1. every enabled source's feed is fetched and parsed concurrently; a failed
//!    feed contributes no items,
//! 2. items are merged in source order, deduplicated across all categories and
//!    capped per category,
//! 3. articles whose description is not substantial are resolved, fetched and
//!    extracted concurrently (bounded by `max_concurrent_extractions`),
//! 4. the summary policy fills every article's `summary`.
//!
//! Per-feed and per-article failures are absorbed and logged. Only a run with
//! no sources at all ends in `Failed`.

use crate::config::PipelineConfig;
use crate::error::{FetchError, PipelineError};
use crate::extract::ContentExtractor;
use crate::feed;
use crate::models::{Article, PipelineResult, RawItem, Source};
use crate::resolver::RedirectResolver;
use crate::sources::feed_url;
use crate::summary::SummaryPolicy;
use crate::transport::{HttpTransport, RetryTransport, Transport};
use crate::worker::{ArticleWorker, Extraction};
use futures::future::join_all;
use futures::stream::{self, StreamExt};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::sync::Mutex;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PipelineState {
    Idle,
    FetchingFeeds,
    Deduplicating,
    ExtractingArticles,
    Done,
    Failed,
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineState::Idle => "idle",
            PipelineState::FetchingFeeds => "fetching_feeds",
            PipelineState::Deduplicating => "deduplicating",
            PipelineState::ExtractingArticles => "extracting_articles",
            PipelineState::Done => "done",
            PipelineState::Failed => "failed",
        };
        f.write_str(name)
    }
}

pub struct NewsPipeline<T> {
    transport: T,
    config: PipelineConfig,
    resolver: RedirectResolver,
    extractor: ContentExtractor,
    policy: SummaryPolicy,
    state: Mutex<PipelineState>,
}

impl NewsPipeline<RetryTransport<HttpTransport>> {
    /// Pipeline over the real network with the configured retry policy.
    pub fn from_config(config: PipelineConfig) -> Result<Self, FetchError> {
        let transport = RetryTransport::new(
            HttpTransport::new(config.max_redirects, config.max_body_bytes)?,
            config.max_retries,
            config.retry_base_delay(),
        );
        Ok(Self::new(transport, config))
    }
}

impl<T: Transport> NewsPipeline<T> {
    pub fn new(transport: T, config: PipelineConfig) -> Self {
        let resolver = RedirectResolver::new(config.aggregator_domains.clone(), config.article_timeout());
        let extractor = ContentExtractor::new(config.extractor.clone());
        let policy = SummaryPolicy::new(config.summary.clone());
        Self {
            transport,
            config,
            resolver,
            extractor,
            policy,
            state: Mutex::new(PipelineState::Idle),
        }
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// State reached by the most recent run.
    pub fn state(&self) -> PipelineState {
        match self.state.lock() {
            Ok(state) => *state,
            Err(poisoned) => *poisoned.into_inner(),
        }
    }

    fn transition(&self, next: PipelineState) {
        let mut state = match self.state.lock() {
            Ok(state) => state,
            Err(poisoned) => poisoned.into_inner(),
        };
        let previous = *state;
        info!(from = %previous, to = %next, "Pipeline state change");
        *state = next;
    }

    /// Run the pipeline over the sources from the configuration.
    pub async fn run_configured(&self) -> Result<PipelineResult, PipelineError> {
        let sources = self.config.sources();
        self.run(&sources).await
    }

    /// One full pass over `sources`. Disabled sources keep their key with an
    /// empty list and are never fetched.
    #[instrument(level = "info", skip_all, fields(sources = sources.len()))]
    pub async fn run(&self, sources: &[Source]) -> Result<PipelineResult, PipelineError> {
        self.transition(PipelineState::Idle);
        if sources.is_empty() {
            self.transition(PipelineState::Failed);
            return Err(PipelineError::NoSources);
        }

        let mut result = PipelineResult::new();
        for source in sources {
            result.ensure_category(&source.name);
        }

        self.transition(PipelineState::FetchingFeeds);
        let enabled = sources.iter().filter(|s| s.enabled).collect::<Vec<_>>();
        info!(enabled = enabled.len(), "Fetching feeds");
        let feeds = join_all(enabled.into_iter().map(|source| self.fetch_source(source))).await;

        self.transition(PipelineState::Deduplicating);
        let articles = dedupe(feeds, self.config.max_per_category);
        info!(articles = articles.len(), "Deduplicated feed items");

        self.transition(PipelineState::ExtractingArticles);
        let extractions = self.extract_all(&articles).await;

        for (mut article, extraction) in articles.into_iter().zip(extractions) {
            let extracted = extraction.as_ref().map_or("", |e| e.text.as_str());
            article.summary = self.policy.summarize(&article, extracted);
            article.canonical_link = extraction.map(|e| e.canonical_url).filter(|url| !url.is_empty());
            result.push(article);
        }

        self.transition(PipelineState::Done);
        info!(
            categories = result.len(),
            articles = result.total_articles(),
            "Pipeline run complete"
        );
        Ok(result)
    }

    /// Fetch and parse one source. Failures yield an empty item list.
    #[instrument(level = "info", skip_all, fields(source = %source.name))]
    async fn fetch_source(&self, source: &Source) -> (String, Vec<RawItem>) {
        let url = feed_url(&self.config.feed_base_url, &self.config.locale, source);
        let items = match feed::fetch_text(&self.transport, &url, self.config.feed_timeout()).await {
            Ok(xml) => feed::parse(&xml, self.config.description_max_chars),
            Err(e) => {
                warn!(%url, error = %e, "Feed fetch failed; category will be empty");
                Vec::new()
            }
        };
        info!(count = items.len(), "Fetched feed");
        (source.name.clone(), items)
    }

    /// One entry per article, in order. `None` where the description made
    /// extraction unnecessary.
    async fn extract_all(&self, articles: &[Article]) -> Vec<Option<Extraction>> {
        let worker = ArticleWorker::new(
            &self.transport,
            &self.resolver,
            &self.extractor,
            self.config.article_timeout(),
        );
        let worker = &worker;
        let policy = &self.policy;
        let pending = articles.iter().filter(|a| policy.needs_extraction(a)).count();
        info!(
            pending,
            skipped = articles.len() - pending,
            concurrency = self.config.max_concurrent_extractions,
            "Extracting article text"
        );

        stream::iter(articles)
            .map(|article| async move {
                if policy.needs_extraction(article) {
                    Some(worker.process(article).await)
                } else {
                    None
                }
            })
            .buffered(self.config.max_concurrent_extractions.max(1))
            .collect()
            .await
    }
}

/// Merge per-category items in order, dropping any identity already seen in
/// an earlier position, and admit at most `max_per_category` per category.
///
/// An identity counts as seen from its first visit, including visits that
/// were rejected because the category was already full.
pub fn dedupe(feeds: Vec<(String, Vec<RawItem>)>, max_per_category: usize) -> Vec<Article> {
    let mut seen = HashSet::new();
    let mut admitted: HashMap<String, usize> = HashMap::new();
    let mut articles = Vec::new();

    for (category, items) in feeds {
        for item in items {
            let identity = item.identity();
            if identity.is_empty() || !seen.insert(identity.to_string()) {
                continue;
            }
            let count = admitted.entry(category.clone()).or_default();
            if *count >= max_per_category {
                continue;
            }
            *count += 1;
            articles.push(Article::from_raw(&category, item));
        }
    }
    articles
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Locale;
    use crate::models::SourceKind;
    use crate::transport::testing::StaticTransport;

    const BASE: &str = "https://feeds.test/rss";

    const LONG: &str = "Regional officials confirmed on Wednesday that the new rail link will open \
        next spring, two years ahead of the original schedule.";

    fn raw(title: &str, link: &str) -> RawItem {
        RawItem {
            title: title.into(),
            link: link.into(),
            description: String::new(),
        }
    }

    fn topic(name: &str) -> Source {
        Source::new(name, SourceKind::Topic, name.to_uppercase())
    }

    fn url_for(source: &Source) -> String {
        feed_url(BASE, &Locale::default(), source)
    }

    fn item_xml(title: &str, link: &str, description: &str) -> String {
        format!("<item><title>{title}</title><link>{link}</link><description>{description}</description></item>")
    }

    fn feed_xml(items: &[String]) -> String {
        format!("<rss version=\"2.0\"><channel><title>t</title>{}</channel></rss>", items.concat())
    }

    fn config() -> PipelineConfig {
        PipelineConfig {
            feed_base_url: BASE.into(),
            ..PipelineConfig::default()
        }
    }

    #[test]
    fn test_dedupe_across_categories() {
        let feeds = vec![
            ("Business".to_string(), vec![raw("Merger", "https://x.test/a")]),
            ("Technology".to_string(), vec![raw("Merger", "https://x.test/a")]),
        ];
        let articles = dedupe(feeds, 2);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].category, "Business");
    }

    #[test]
    fn test_dedupe_caps_in_feed_order() {
        let items = (1..=5)
            .map(|i| raw(&format!("Story {i}"), &format!("https://x.test/{i}")))
            .collect();
        let articles = dedupe(vec![("World".to_string(), items)], 2);
        let titles: Vec<_> = articles.iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 1", "Story 2"]);
    }

    #[test]
    fn test_identity_seen_past_cap_blocks_later_category() {
        let feeds = vec![
            (
                "A".to_string(),
                vec![
                    raw("x1", "https://x.test/1"),
                    raw("x2", "https://x.test/2"),
                    raw("x3", "https://x.test/3"),
                ],
            ),
            ("B".to_string(), vec![raw("x3", "https://x.test/3"), raw("y", "https://y.test/")]),
        ];
        let articles = dedupe(feeds, 2);
        let b: Vec<_> = articles.iter().filter(|a| a.category == "B").map(|a| a.title.as_str()).collect();
        assert_eq!(b, vec!["y"]);
    }

    #[test]
    fn test_title_identity_is_trimmed() {
        let feeds = vec![
            ("U.S.".to_string(), vec![raw("  Foo Bar  ", "")]),
            ("World".to_string(), vec![raw("Foo Bar", "")]),
        ];
        let articles = dedupe(feeds, 2);
        assert_eq!(articles.len(), 1);
        assert_eq!(articles[0].identity(), "Foo Bar");
    }

    #[tokio::test]
    async fn test_duplicate_link_in_two_feeds() {
        let business = topic("Business");
        let technology = topic("Technology");
        let xml = feed_xml(&[item_xml("Chipmaker merger", "https://x.test/a", LONG)]);
        let transport = StaticTransport::new()
            .page(&url_for(&business), &xml)
            .page(&url_for(&technology), &xml);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[business, technology]).await.unwrap();
        let total = result.get("Business").unwrap().len() + result.get("Technology").unwrap().len();
        assert_eq!(total, 1);
        assert_eq!(result.get("Technology").unwrap().len(), 0);
        assert_eq!(pipeline.state(), PipelineState::Done);
    }

    #[tokio::test]
    async fn test_substantial_description_skips_network() {
        let world = topic("World");
        let xml = feed_xml(&[item_xml("Rail link opens early", "https://x.test/rail", LONG)]);
        let transport = StaticTransport::new().page(&url_for(&world), &xml);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[world.clone()]).await.unwrap();
        let article = &result.get("World").unwrap()[0];
        assert_eq!(article.summary, LONG);
        assert_eq!(article.canonical_link, None);
        assert_eq!(pipeline.transport().hits(), vec![url_for(&world)]);
    }

    #[tokio::test]
    async fn test_headline_led_description_skips_network() {
        let world = topic("World");
        let description = format!("Rail link opens early {LONG}");
        let xml = feed_xml(&[item_xml("Rail link opens early - City Wire", "https://pub.test/rail", &description)]);
        let transport = StaticTransport::new().page(&url_for(&world), &xml);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[world.clone()]).await.unwrap();
        let article = &result.get("World").unwrap()[0];
        assert_eq!(article.summary, LONG);
        assert_eq!(pipeline.transport().hits(), vec![url_for(&world)]);
    }

    #[tokio::test]
    async fn test_short_description_uses_extracted_text() {
        let science = topic("Science");
        let xml = feed_xml(&[item_xml("Comet visible tonight", "https://pub.test/comet", "Comet visible tonight")]);
        let page = format!(
            "<html><body><article><p>{LONG}</p><p>Astronomers said the comet, last seen in 1986, would be easiest to spot after midnight.</p></article></body></html>"
        );
        let transport = StaticTransport::new()
            .page(&url_for(&science), &xml)
            .page("https://pub.test/comet", &page);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[science]).await.unwrap();
        let article = &result.get("Science").unwrap()[0];
        assert!(article.summary.starts_with("Regional officials confirmed"));
        assert_eq!(article.canonical_link.as_deref(), Some("https://pub.test/comet"));
    }

    #[tokio::test]
    async fn test_failed_extraction_falls_back_to_description() {
        let health = topic("Health");
        let xml = feed_xml(&[item_xml("Clinic hours", "https://pub.test/clinic", "Clinics extend weekend hours")]);
        let transport = StaticTransport::new().page(&url_for(&health), &xml);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[health]).await.unwrap();
        let article = &result.get("Health").unwrap()[0];
        assert_eq!(article.summary, "Clinics extend weekend hours");
    }

    #[tokio::test]
    async fn test_failed_feed_and_disabled_source_keep_their_keys() {
        let us = topic("U.S.");
        let sports = topic("Sports").disabled();
        let world = topic("World");
        let xml = feed_xml(&[item_xml("Summit ends", "https://x.test/summit", LONG)]);
        // No route for U.S.: the fetch fails with a network error.
        let transport = StaticTransport::new().page(&url_for(&world), &xml);
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[us.clone(), sports.clone(), world]).await.unwrap();
        assert_eq!(result.categories().collect::<Vec<_>>(), vec!["U.S.", "Sports", "World"]);
        assert!(result.get("U.S.").unwrap().is_empty());
        assert!(result.get("Sports").unwrap().is_empty());
        assert_eq!(result.get("World").unwrap().len(), 1);
        assert_eq!(pipeline.transport().hit_count(&url_for(&sports)), 0);
        assert_eq!(pipeline.transport().hit_count(&url_for(&us)), 1);
    }

    #[tokio::test]
    async fn test_no_sources_fails() {
        let pipeline = NewsPipeline::new(StaticTransport::new(), config());
        let err = pipeline.run(&[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::NoSources));
        assert_eq!(pipeline.state(), PipelineState::Failed);
    }

    #[tokio::test]
    async fn test_cap_applies_to_fetched_feed() {
        let world = topic("World");
        let items: Vec<_> = (1..=5)
            .map(|i| item_xml(&format!("Story {i}"), &format!("https://x.test/{i}"), LONG))
            .collect();
        let transport = StaticTransport::new().page(&url_for(&world), &feed_xml(&items));
        let pipeline = NewsPipeline::new(transport, config());

        let result = pipeline.run(&[world]).await.unwrap();
        let titles: Vec<_> = result.get("World").unwrap().iter().map(|a| a.title.as_str()).collect();
        assert_eq!(titles, vec!["Story 1", "Story 2"]);
    }
}
