//! JSON output of a pipeline run.
//!
//! Files are organized by date with edition names:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── morning.json
//!     ├── morning.diagnostics.json
//!     └── evening.json
//! ```

use crate::models::PipelineResult;
use serde::Serialize;
use std::error::Error;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{error, info, instrument};

/// Date and edition a run is filed under.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Edition {
    /// `YYYY-MM-DD`
    pub local_date: String,
    /// `morning`, `afternoon` or `evening`
    pub time_of_day: String,
}

impl Edition {
    /// The edition for the current local date and time.
    pub fn now() -> Self {
        Self {
            local_date: chrono::Local::now().date_naive().to_string(),
            time_of_day: crate::utils::time_of_day(),
        }
    }
}

/// Paths of the files written for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFiles {
    pub result: PathBuf,
    pub diagnostics: PathBuf,
}

/// Write `result` and its diagnostics under `{json_output_dir}/{date}/`.
///
/// # Output Path
///
/// - `{json_output_dir}/{date}/{time_of_day}.json`: the full result
/// - `{json_output_dir}/{date}/{time_of_day}.diagnostics.json`: counts, titles
///   and summary lengths
#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_result(
    result: &PipelineResult,
    edition: &Edition,
    json_output_dir: &str,
) -> Result<WrittenFiles, Box<dyn Error>> {
    let full_json_dir = Path::new(json_output_dir).join(&edition.local_date);

    info!(full_json_dir = %full_json_dir.display(), "Ensuring JSON directory exists");
    if let Err(e) = fs::create_dir_all(&full_json_dir).await {
        error!(full_json_dir = %full_json_dir.display(), error = %e, "Failed to create JSON dir");
        return Err(e.into());
    }

    let files = WrittenFiles {
        result: full_json_dir.join(format!("{}.json", edition.time_of_day)),
        diagnostics: full_json_dir.join(format!("{}.diagnostics.json", edition.time_of_day)),
    };
    write_json(&files.result, result).await?;
    write_json(&files.diagnostics, &result.diagnostics()).await?;
    Ok(files)
}

async fn write_json<T: Serialize>(path: &Path, value: &T) -> Result<(), Box<dyn Error>> {
    let json = serde_json::to_string_pretty(value)?;
    info!(path = %path.display(), bytes = json.len(), "Writing JSON");
    fs::write(path, json).await?;
    Ok(())
}
