//! # Awful News Pipeline
//!
//! Builds a categorized digest of current news from aggregator RSS feeds.
//!
//! Given a list of [`Source`]s (topic sections, a geographic section, or
//! free-text searches), one run of [`NewsPipeline`]:
//!
//! 1. fetches every feed concurrently and parses its items,
//! 2. deduplicates stories across categories and caps each category,
//! 3. resolves aggregator redirect links to publisher URLs and extracts the
//!    article text where the feed's description is too thin,
//! 4. picks a summary per article.
//!
//! The result is an ordered `category -> articles` [`PipelineResult`].
//!
//! ```no_run
//! use awful_news_pipeline::{NewsPipeline, PipelineConfig};
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let pipeline = NewsPipeline::from_config(PipelineConfig::default())?;
//! let result = pipeline.run_configured().await?;
//! for (category, articles) in result.iter() {
//!     println!("{category}: {}", articles.len());
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod extract;
pub mod feed;
pub mod models;
pub mod outputs;
pub mod pipeline;
pub mod resolver;
pub mod sources;
pub mod summary;
pub mod transport;
pub mod utils;
pub mod worker;

pub use config::PipelineConfig;
pub use error::{ConfigError, FetchError, ParseError, PipelineError};
pub use extract::ContentExtractor;
pub use models::{Article, PipelineResult, RawItem, Source, SourceKind};
pub use pipeline::{NewsPipeline, PipelineState};
pub use resolver::RedirectResolver;
pub use summary::SummaryPolicy;
pub use transport::{HttpTransport, RetryTransport, Transport};
