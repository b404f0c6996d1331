//! Article fetch-and-extract worker.
//!
//! Resolves an article's aggregator link to the publisher URL, downloads the
//! page and extracts its main text. Every failure is logged and absorbed: the
//! caller always gets an [`Extraction`], with empty text when anything went
//! wrong.

use crate::extract::ContentExtractor;
use crate::feed;
use crate::models::Article;
use crate::resolver::RedirectResolver;
use crate::transport::Transport;
use crate::utils::truncate_for_log;
use std::time::Duration;
use tracing::{debug, instrument, warn};

/// Outcome of processing one article.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Extraction {
    /// URL the text was fetched from; the original link when resolution failed.
    pub canonical_url: String,
    /// Main text, or empty.
    pub text: String,
}

/// Shared, read-only collaborators for article processing.
pub struct ArticleWorker<'a, T> {
    transport: &'a T,
    resolver: &'a RedirectResolver,
    extractor: &'a ContentExtractor,
    timeout: Duration,
}

impl<'a, T: Transport> ArticleWorker<'a, T> {
    pub fn new(
        transport: &'a T,
        resolver: &'a RedirectResolver,
        extractor: &'a ContentExtractor,
        timeout: Duration,
    ) -> Self {
        Self {
            transport,
            resolver,
            extractor,
            timeout,
        }
    }

    /// Resolve, fetch and extract `article`'s link. Never fails.
    #[instrument(level = "info", skip_all, fields(title = %truncate_for_log(&article.title, 60)))]
    pub async fn process(&self, article: &Article) -> Extraction {
        if article.link.is_empty() {
            debug!("Article has no link; nothing to fetch");
            return Extraction::default();
        }

        let canonical_url = self.resolver.resolve(self.transport, &article.link).await;
        let body = match feed::fetch_text(self.transport, &canonical_url, self.timeout).await {
            Ok(body) => body,
            Err(e) => {
                warn!(url = %canonical_url, error = %e, "Article fetch failed");
                return Extraction {
                    canonical_url,
                    text: String::new(),
                };
            }
        };
        if body.trim().is_empty() {
            warn!(url = %canonical_url, "Article page was empty");
            return Extraction {
                canonical_url,
                text: String::new(),
            };
        }

        let text = self.extractor.extract(&body);
        if text.is_empty() {
            warn!(url = %canonical_url, bytes = body.len(), "No main content found");
        } else {
            debug!(url = %canonical_url, chars = text.chars().count(), "Extracted article text");
        }
        Extraction {
            canonical_url,
            text,
        }
    }
}
