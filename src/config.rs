//! Pipeline tunables and the source catalogue, loadable from YAML.
//!
//! Every field has a default so an empty file (or no file at all) yields a
//! working configuration that fetches the nine standard categories.
//!
//! ```yaml
//! max_per_category: 2
//! local_geo: "Portland, OR"
//! categories:
//!   Sports: false
//! custom_sources:
//!   - name: Rust
//!     query: rust programming language
//! ```

use crate::error::ConfigError;
use crate::models::{Source, SourceKind};
use crate::sources::{DEFAULT_CATEGORIES, LOCAL_CATEGORY};
use indexmap::IndexMap;
use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{debug, instrument};

/// Language and region parameters appended to every feed URL.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct Locale {
    pub hl: String,
    pub gl: String,
    pub ceid: String,
}

impl Default for Locale {
    fn default() -> Self {
        Self {
            hl: "en-US".to_string(),
            gl: "US".to_string(),
            ceid: "US:en".to_string(),
        }
    }
}

/// Thresholds for the content extractor.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ExtractorConfig {
    /// A tier's output is accepted outright at this length.
    pub min_viable_chars: usize,
    /// Below this nothing is returned at all.
    pub min_content_chars: usize,
    /// Paragraphs shorter than this are treated as boilerplate.
    pub paragraph_min_chars: usize,
    /// Output is truncated to this many characters plus a marker.
    pub max_chars: usize,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            min_viable_chars: 150,
            min_content_chars: 50,
            paragraph_min_chars: 30,
            max_chars: 5000,
        }
    }
}

/// Thresholds for choosing between the feed description and extracted text.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct SummaryConfig {
    /// A description at least this long is used without fetching the article.
    pub substantial_chars: usize,
    /// Extracted text must be longer than this to be preferred.
    pub accept_chars: usize,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            substantial_chars: 100,
            accept_chars: 80,
        }
    }
}

/// A free-text query feed added by the user.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct CustomSource {
    pub name: String,
    pub query: String,
    #[serde(default = "default_true")]
    pub enabled: bool,
}

fn default_true() -> bool {
    true
}

/// All tunables of one pipeline run.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub max_per_category: usize,
    pub local_geo: String,
    pub feed_base_url: String,
    pub locale: Locale,
    pub feed_timeout_secs: u64,
    pub article_timeout_secs: u64,
    pub max_redirects: usize,
    pub max_retries: usize,
    pub retry_base_delay_ms: u64,
    pub max_concurrent_extractions: usize,
    pub description_max_chars: usize,
    /// Response bodies are cut at this many bytes.
    pub max_body_bytes: usize,
    /// Hosts (and their subdomains) that serve redirects rather than articles.
    pub aggregator_domains: Vec<String>,
    pub extractor: ExtractorConfig,
    pub summary: SummaryConfig,
    /// Enable flags for the built-in categories; unknown names are ignored.
    pub categories: IndexMap<String, bool>,
    /// Replaces the built-in catalogue entirely when present.
    pub sources: Option<Vec<Source>>,
    pub custom_sources: Vec<CustomSource>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            max_per_category: 2,
            local_geo: "New York, NY".to_string(),
            feed_base_url: "https://news.google.com/rss".to_string(),
            locale: Locale::default(),
            feed_timeout_secs: 10,
            article_timeout_secs: 20,
            max_redirects: 10,
            max_retries: 1,
            retry_base_delay_ms: 500,
            max_concurrent_extractions: 16,
            description_max_chars: 600,
            max_body_bytes: 2 * 1024 * 1024,
            aggregator_domains: vec![
                "google.com".to_string(),
                "gstatic.com".to_string(),
                "googleusercontent.com".to_string(),
            ],
            extractor: ExtractorConfig::default(),
            summary: SummaryConfig::default(),
            categories: DEFAULT_CATEGORIES
                .iter()
                .map(|(name, _)| (name.to_string(), true))
                .collect(),
            sources: None,
            custom_sources: Vec::new(),
        }
    }
}

impl PipelineConfig {
    /// Load and validate a YAML config file.
    #[instrument(level = "info", skip_all, fields(path = %path.as_ref().display()))]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_yaml(&text)?;
        debug!(sources = config.sources().len(), "Loaded pipeline configuration");
        Ok(config)
    }

    /// Parse and validate YAML text. An empty document yields the defaults.
    pub fn from_yaml(text: &str) -> Result<Self, ConfigError> {
        let config = if text.trim().is_empty() {
            Self::default()
        } else {
            serde_yaml::from_str::<Self>(text)?
        };
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if !(1..=10).contains(&self.max_per_category) {
            return Err(ConfigError::Invalid(format!(
                "max_per_category must be between 1 and 10, got {}",
                self.max_per_category
            )));
        }
        if self.feed_timeout_secs == 0 || self.article_timeout_secs == 0 {
            return Err(ConfigError::Invalid("timeouts must be non-zero".to_string()));
        }
        if self.max_concurrent_extractions == 0 {
            return Err(ConfigError::Invalid(
                "max_concurrent_extractions must be at least 1".to_string(),
            ));
        }
        if self.max_body_bytes == 0 {
            return Err(ConfigError::Invalid("max_body_bytes must be at least 1".to_string()));
        }
        if self.extractor.min_content_chars > self.extractor.min_viable_chars {
            return Err(ConfigError::Invalid(
                "extractor.min_content_chars cannot exceed extractor.min_viable_chars".to_string(),
            ));
        }
        if url::Url::parse(&self.feed_base_url).is_err() {
            return Err(ConfigError::Invalid(format!(
                "feed_base_url is not a URL: {}",
                self.feed_base_url
            )));
        }
        let sources = self.sources();
        if let Some(name) = sources.iter().map(|s| s.name.as_str()).duplicates().next() {
            return Err(ConfigError::Invalid(format!("duplicate source name {name:?}")));
        }
        for source in sources {
            if source.name.trim().is_empty() {
                return Err(ConfigError::Invalid("source name cannot be empty".to_string()));
            }
            if source.enabled && source.parameter.trim().is_empty() {
                return Err(ConfigError::Invalid(format!(
                    "source {:?} has an empty parameter",
                    source.name
                )));
            }
        }
        Ok(())
    }

    /// The ordered source list for a run: the explicit `sources` list or the
    /// built-in catalogue filtered by `categories`, followed by custom queries.
    pub fn sources(&self) -> Vec<Source> {
        let mut sources = match &self.sources {
            Some(explicit) => explicit.clone(),
            None => DEFAULT_CATEGORIES
                .iter()
                .map(|(name, topic)| {
                    let source = if *name == LOCAL_CATEGORY {
                        Source::new(*name, SourceKind::Geo, self.local_geo.clone())
                    } else {
                        Source::new(*name, SourceKind::Topic, *topic)
                    };
                    if self.categories.get(*name).copied().unwrap_or(true) {
                        source
                    } else {
                        source.disabled()
                    }
                })
                .collect(),
        };
        sources.extend(self.custom_sources.iter().map(|custom| {
            let source = Source::new(custom.name.clone(), SourceKind::Query, custom.query.clone());
            if custom.enabled { source } else { source.disabled() }
        }));
        sources
    }

    pub fn feed_timeout(&self) -> Duration {
        Duration::from_secs(self.feed_timeout_secs)
    }

    pub fn article_timeout(&self) -> Duration {
        Duration::from_secs(self.article_timeout_secs)
    }

    pub fn retry_base_delay(&self) -> Duration {
        Duration::from_millis(self.retry_base_delay_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_cover_nine_categories() {
        let config = PipelineConfig::default();
        let sources = config.sources();
        assert_eq!(sources.len(), 9);
        assert_eq!(sources[0].name, "U.S.");
        assert_eq!(sources[0].parameter, "NATION");
        assert_eq!(sources[2].kind, SourceKind::Geo);
        assert_eq!(sources[2].parameter, "New York, NY");
        assert!(sources.iter().all(|s| s.enabled));
    }

    #[test]
    fn test_empty_yaml_is_default() {
        let config = PipelineConfig::from_yaml("   \n").unwrap();
        assert_eq!(config, PipelineConfig::default());
    }

    #[test]
    fn test_yaml_overrides_and_custom_sources() {
        let yaml = r#"
max_per_category: 3
local_geo: "Portland, OR"
categories:
  Sports: false
custom_sources:
  - name: Rust
    query: rust programming language
summary:
  substantial_chars: 120
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.max_per_category, 3);
        assert_eq!(config.summary.substantial_chars, 120);
        assert_eq!(config.summary.accept_chars, 80);

        let sources = config.sources();
        assert_eq!(sources.len(), 10);
        let sports = sources.iter().find(|s| s.name == "Sports").unwrap();
        assert!(!sports.enabled);
        let local = sources.iter().find(|s| s.name == "Local").unwrap();
        assert_eq!(local.parameter, "Portland, OR");
        let rust = sources.last().unwrap();
        assert_eq!(rust.kind, SourceKind::Query);
        assert_eq!(rust.parameter, "rust programming language");
    }

    #[test]
    fn test_explicit_sources_replace_catalogue() {
        let yaml = r#"
sources:
  - name: Business
    kind: topic
    parameter: BUSINESS
  - name: Weather
    kind: query
    parameter: weather
    enabled: false
"#;
        let config = PipelineConfig::from_yaml(yaml).unwrap();
        let sources = config.sources();
        assert_eq!(sources.len(), 2);
        assert!(!sources[1].enabled);
    }

    #[test]
    fn test_example_config_parses() {
        let config = PipelineConfig::from_yaml(include_str!("../config.example.yaml")).unwrap();
        let sources = config.sources();
        assert_eq!(sources.len(), 10);
        assert!(!sources.iter().find(|s| s.name == "Sports").unwrap().enabled);
    }

    #[test]
    fn test_rejects_out_of_range_cap() {
        let err = PipelineConfig::from_yaml("max_per_category: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(_)));
    }

    #[test]
    fn test_rejects_custom_source_shadowing_category() {
        let yaml = r#"
custom_sources:
  - name: Business
    query: earnings
"#;
        let err = PipelineConfig::from_yaml(yaml).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("Business")));
    }

    #[test]
    fn test_rejects_zero_body_limit() {
        let err = PipelineConfig::from_yaml("max_body_bytes: 0").unwrap_err();
        assert!(matches!(err, ConfigError::Invalid(msg) if msg.contains("max_body_bytes")));
    }

    #[test]
    fn test_rejects_bad_yaml() {
        let err = PipelineConfig::from_yaml("max_per_category: [").unwrap_err();
        assert!(matches!(err, ConfigError::Yaml(_)));
    }
}
