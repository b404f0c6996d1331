//! Command-line interface definitions.
//!
//! Every flag can also be given through an environment variable.

use clap::Parser;

/// Run one pass of the news pipeline and write the result as JSON.
///
/// # Examples
///
/// ```sh
/// # Defaults: nine categories, two articles each
/// awful_news_pipeline -j ./json
///
/// # With a config file and a different local edition
/// awful_news_pipeline -j ./json -c config.yaml --local-geo "Portland, OR"
/// ```
#[derive(Parser, Debug)]
#[command(author, version, about)]
pub struct Cli {
    /// Output directory for the JSON files
    #[arg(short, long, env = "NEWS_JSON_OUTPUT_DIR")]
    pub json_output_dir: String,

    /// Optional path to config.yaml file
    #[arg(short, long, env = "NEWS_CONFIG")]
    pub config: Option<String>,

    /// Override `max_per_category` from the config file
    #[arg(long, env = "NEWS_MAX_PER_CATEGORY")]
    pub max_per_category: Option<usize>,

    /// Override `local_geo` from the config file
    #[arg(long, env = "NEWS_LOCAL_GEO")]
    pub local_geo: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "awful_news_pipeline",
            "--json-output-dir",
            "./json",
            "--max-per-category",
            "3",
            "--local-geo",
            "Austin, TX",
        ]);

        assert_eq!(cli.json_output_dir, "./json");
        assert_eq!(cli.max_per_category, Some(3));
        assert_eq!(cli.local_geo.as_deref(), Some("Austin, TX"));
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["awful_news_pipeline", "-j", "/tmp/json", "-c", "news.yaml"]);

        assert_eq!(cli.json_output_dir, "/tmp/json");
        assert_eq!(cli.config.as_deref(), Some("news.yaml"));
    }

    #[test]
    fn test_cli_rejects_non_numeric_cap() {
        let parsed = Cli::try_parse_from(["awful_news_pipeline", "-j", "x", "--max-per-category", "two"]);
        assert!(parsed.is_err());
    }
}
