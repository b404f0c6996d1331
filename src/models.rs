//! Data models carried through the pipeline.
//!
//! - [`Source`]: a configured feed to fetch (topic, geo or free-text query)
//! - [`RawItem`]: one parsed feed entry
//! - [`Article`]: a deduplicated item on its way to a summary
//! - [`PipelineResult`]: the final `category -> articles` mapping
//! - [`Diagnostics`]: a text-free overview of a result for logging

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// What a [`Source`]'s `parameter` means.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SourceKind {
    /// `parameter` is an aggregator topic code such as `BUSINESS`.
    Topic,
    /// `parameter` is a free-form location such as `New York, NY`.
    Geo,
    /// `parameter` is a free-text search query.
    Query,
}

/// A fetch target. `name` doubles as the category name in the result.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct Source {
    pub name: String,
    pub kind: SourceKind,
    pub parameter: String,
    /// Disabled sources are never fetched but still appear in the result.
    #[serde(default = "enabled_by_default")]
    pub enabled: bool,
}

fn enabled_by_default() -> bool {
    true
}

impl Source {
    pub fn new(name: impl Into<String>, kind: SourceKind, parameter: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind,
            parameter: parameter.into(),
            enabled: true,
        }
    }

    /// Same source, switched off.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// One `<item>` of a feed after decoding and cleanup.
///
/// `title` is never empty; the parser drops items without one.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RawItem {
    pub title: String,
    pub link: String,
    pub description: String,
}

impl RawItem {
    /// Deduplication key: the trimmed link, or the trimmed title when there is no link.
    pub fn identity(&self) -> &str {
        let link = self.link.trim();
        if link.is_empty() {
            self.title.trim()
        } else {
            link
        }
    }
}

/// A deduplicated article. `summary` is filled exactly once by the
/// summary-selection policy and is empty when nothing usable was found.
#[derive(Debug, Clone, PartialEq, Eq, Default, Deserialize, Serialize)]
pub struct Article {
    pub category: String,
    pub title: String,
    pub link: String,
    pub description: String,
    pub summary: String,
    /// Publisher URL found by the redirect resolver, when extraction ran.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub canonical_link: Option<String>,
}

impl Article {
    pub fn from_raw(category: &str, item: RawItem) -> Self {
        Self {
            category: category.to_string(),
            title: item.title.trim().to_string(),
            link: item.link.trim().to_string(),
            description: item.description,
            summary: String::new(),
            canonical_link: None,
        }
    }

    /// See [`RawItem::identity`].
    pub fn identity(&self) -> &str {
        if self.link.is_empty() {
            &self.title
        } else {
            &self.link
        }
    }
}

/// Ordered `category -> articles` mapping produced by one pipeline run.
///
/// Keys follow source declaration order and every configured category is
/// present, even when its list is empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(transparent)]
pub struct PipelineResult {
    categories: IndexMap<String, Vec<Article>>,
}

impl PipelineResult {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a category without articles. Existing entries are untouched.
    pub fn ensure_category(&mut self, category: &str) {
        if !self.categories.contains_key(category) {
            self.categories.insert(category.to_string(), Vec::new());
        }
    }

    /// Append an article to the list of its own category.
    pub fn push(&mut self, article: Article) {
        self.categories
            .entry(article.category.clone())
            .or_default()
            .push(article);
    }

    pub fn get(&self, category: &str) -> Option<&[Article]> {
        self.categories.get(category).map(Vec::as_slice)
    }

    pub fn categories(&self) -> impl Iterator<Item = &str> {
        self.categories.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Article])> {
        self.categories
            .iter()
            .map(|(name, articles)| (name.as_str(), articles.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.categories.len()
    }

    pub fn is_empty(&self) -> bool {
        self.categories.is_empty()
    }

    pub fn total_articles(&self) -> usize {
        self.categories.values().map(Vec::len).sum()
    }

    /// Counts, titles and summary lengths per category, without article text.
    pub fn diagnostics(&self) -> Diagnostics {
        let categories = self
            .categories
            .iter()
            .map(|(name, articles)| {
                let entries = articles
                    .iter()
                    .map(|article| ArticleDiagnostics {
                        title: article.title.clone(),
                        summary_length: article.summary.chars().count(),
                        extracted: article.canonical_link.is_some(),
                    })
                    .collect::<Vec<_>>();
                (
                    name.clone(),
                    CategoryDiagnostics {
                        count: entries.len(),
                        articles: entries,
                    },
                )
            })
            .collect();
        Diagnostics {
            total_articles: self.total_articles(),
            categories,
        }
    }
}

/// Text-free overview of a [`PipelineResult`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostics {
    pub total_articles: usize,
    pub categories: IndexMap<String, CategoryDiagnostics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategoryDiagnostics {
    pub count: usize,
    pub articles: Vec<ArticleDiagnostics>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ArticleDiagnostics {
    pub title: String,
    pub summary_length: usize,
    /// Whether the article page was fetched rather than the description reused.
    pub extracted: bool,
}
