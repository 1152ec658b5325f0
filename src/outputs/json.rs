//! JSON run reports.
//!
//! # Output Structure
//!
//! Files are organized by date, one per run:
//! ```text
//! json_output_dir/
//! └── 2025-05-06/
//!     ├── brief-071500.json
//!     └── brief-183002.json
//! ```

use crate::error::BriefError;
use crate::pipeline::BriefRun;
use crate::utils::ensure_writable_dir;
use chrono::{DateTime, Local};
use std::path::PathBuf;
use tokio::fs;
use tracing::{info, instrument};

/// Write a [`BriefRun`] to `{json_output_dir}/{date}/brief-{HHMMSS}.json`.
///
/// # Errors
///
/// Returns [`BriefError::Io`] if the directory is not writable or the write
/// fails, and [`BriefError::Json`] if serialization fails.
pub async fn write_run_report(run: &BriefRun, json_output_dir: &str) -> Result<PathBuf, BriefError> {
    write_run_report_at(run, json_output_dir, Local::now()).await
}

#[instrument(level = "info", skip_all, fields(json_output_dir = %json_output_dir))]
pub async fn write_run_report_at(
    run: &BriefRun,
    json_output_dir: &str,
    now: DateTime<Local>,
) -> Result<PathBuf, BriefError> {
    let json = serde_json::to_string_pretty(run)?;

    let full_json_dir = format!(
        "{}/{}",
        json_output_dir.trim_end_matches('/'),
        now.format("%Y-%m-%d")
    );
    ensure_writable_dir(&full_json_dir).await?;

    let path = PathBuf::from(&full_json_dir).join(format!("brief-{}.json", now.format("%H%M%S")));
    fs::write(&path, json).await?;
    info!(path = %path.display(), "Wrote run report");
    Ok(path)
}
