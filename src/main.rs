//! # Awful News Pipeline
//!
//! Runs one pass of the news pipeline and files the result as JSON.
//!
//! ## Usage
//!
//! ```sh
//! awful_news_pipeline -j ./json -c config.yaml
//! ```
//!
//! ## Architecture
//!
//! 1. **Configuration**: YAML file (optional) plus CLI overrides
//! 2. **Feeds**: one concurrent fetch per enabled category
//! 3. **Articles**: cross-category dedup, per-category cap, extraction where
//!    the feed description is thin
//! 4. **Output**: `{dir}/{date}/{edition}.json` and its diagnostics

use awful_news_pipeline::outputs::json::{self, Edition};
use awful_news_pipeline::utils::ensure_writable_dir;
use awful_news_pipeline::{NewsPipeline, PipelineConfig};
use clap::Parser;
use itertools::Itertools;
use std::error::Error;
use tracing::{debug, error, info, instrument};
use tracing_subscriber::{EnvFilter, fmt as tfmt};

mod cli;

use cli::Cli;

#[tokio::main]
#[instrument]
async fn main() -> Result<(), Box<dyn Error>> {
    // --- Tracing init ---
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tfmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_file(false)
        .with_line_number(false)
        .with_timer(tracing_subscriber::fmt::time::UtcTime::rfc_3339())
        .init();

    let start_time = std::time::Instant::now();
    info!("news pipeline starting up");

    let args = Cli::parse();
    debug!(?args, "Parsed CLI arguments");

    // Early check: ensure JSON output dir is writable
    if let Err(e) = ensure_writable_dir(&args.json_output_dir).await {
        error!(
            path = %args.json_output_dir,
            error = %e,
            "JSON output directory is not writable (fix perms or choose a different path)"
        );
        return Err(e);
    }

    // ---- Load config ----
    let mut config = match &args.config {
        Some(path) => PipelineConfig::load(path)?,
        None => {
            info!("No config file given; using defaults");
            PipelineConfig::default()
        }
    };
    if let Some(max) = args.max_per_category {
        config.max_per_category = max;
    }
    if let Some(geo) = &args.local_geo {
        config.local_geo = geo.clone();
    }
    config.validate()?;
    info!(
        max_per_category = config.max_per_category,
        local_geo = %config.local_geo,
        "Configuration ready"
    );

    // ---- Run ----
    let edition = Edition::now();
    info!(local_date = %edition.local_date, time_of_day = %edition.time_of_day, "Edition initialized");

    let pipeline = NewsPipeline::from_config(config)?;
    let result = pipeline.run_configured().await?;
    info!(
        total = result.total_articles(),
        per_category = %result.iter().map(|(name, articles)| format!("{name}={}", articles.len())).join(" "),
        "Pipeline finished"
    );

    // ---- Output ----
    match json::write_result(&result, &edition, &args.json_output_dir).await {
        Ok(files) => info!(
            result = %files.result.display(),
            diagnostics = %files.diagnostics.display(),
            "Wrote JSON output"
        ),
        Err(e) => {
            error!(error = %e, "Failed to write JSON output");
            return Err(e);
        }
    }

    let elapsed = start_time.elapsed();
    info!(
        ?elapsed,
        secs = elapsed.as_secs(),
        millis = elapsed.subsec_millis(),
        "Execution complete"
    );

    Ok(())
}
