//! Utility functions for string shaping, link normalization, timestamps, and
//! file system checks.
//!
//! This module provides helpers used throughout the pipeline:
//! - Length-bounded strings for logs and warnings
//! - Whitespace collapsing and CJK detection for keywords
//! - Trailing-slash-insensitive link normalization for dedup and grounding
//! - The [`try_each`] combinator for best-effort extraction chains
//! - File system validation for output directories

use chrono::{DateTime, NaiveDate};
use std::fmt::Display;
use std::fs as stdfs;
use std::io;
use tokio::fs;
use tracing::{info, instrument};

/// Maximum length of an underlying error message embedded in a warning.
pub const ERROR_MESSAGE_MAX: usize = 160;

/// Truncate a string for logging purposes.
///
/// Long strings are cut at `max` characters with an ellipsis and a count of
/// the dropped characters appended.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(truncate_for_log("short", 100), "short");
/// assert_eq!(truncate_for_log(&"a".repeat(500), 10), "aaaaaaaaaa…(+490 chars)");
/// ```
pub fn truncate_for_log(s: &str, max: usize) -> String {
    let total = s.chars().count();
    if total <= max {
        s.to_string()
    } else {
        let head: String = s.chars().take(max).collect();
        format!("{}…(+{} chars)", head, total - max)
    }
}

/// Render an error for inclusion in a user-facing warning.
///
/// Messages longer than [`ERROR_MESSAGE_MAX`] characters are cut to 157
/// characters plus `"..."` so aggregated warning lists stay bounded.
pub fn error_message(err: &impl Display) -> String {
    let text = err.to_string();
    if text.chars().count() > ERROR_MESSAGE_MAX {
        let head: String = text.chars().take(ERROR_MESSAGE_MAX - 3).collect();
        format!("{head}...")
    } else {
        text
    }
}

/// Keep at most `max` characters of `s`.
pub fn truncate_chars(s: &str, max: usize) -> String {
    match s.char_indices().nth(max) {
        Some((idx, _)) => s[..idx].to_string(),
        None => s.to_string(),
    }
}

/// Trim and collapse every whitespace run to a single space.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `true` if `s` contains a character in the CJK Unified Ideographs block.
pub fn contains_cjk(s: &str) -> bool {
    s.chars().any(|c| ('\u{4E00}'..='\u{9FFF}').contains(&c))
}

/// Normalize a link for identity comparisons: trimmed, trailing slashes removed.
pub fn normalize_link(link: &str) -> String {
    link.trim().trim_end_matches('/').to_string()
}

/// Parse a feed date (RFC 3339, RFC 2822, or bare `YYYY-MM-DD`) to epoch millis.
///
/// Unparsable or empty dates map to `-1` so they rank as the oldest.
pub fn to_timestamp(raw: &str) -> i64 {
    let raw = raw.trim();
    if raw.is_empty() {
        return -1;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return dt.timestamp_millis();
    }
    if let Ok(dt) = DateTime::parse_from_rfc2822(raw) {
        return dt.timestamp_millis();
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return midnight.and_utc().timestamp_millis();
        }
    }
    -1
}

/// Run each strategy in order and return the first `Some`.
pub fn try_each<I: ?Sized, T>(input: &I, strategies: &[fn(&I) -> Option<T>]) -> Option<T> {
    strategies.iter().find_map(|strategy| strategy(input))
}

/// Ensure a directory exists and is writable.
///
/// Creates the directory if needed, then creates and removes a probe file.
///
/// # Errors
///
/// Returns the underlying I/O error if the directory cannot be created or
/// is not writable.
#[instrument(level = "info", skip_all, fields(path = %path))]
pub async fn ensure_writable_dir(path: &str) -> io::Result<()> {
    fs::create_dir_all(path).await?;
    let probe_path = format!("{}/..__probe_write__", path.trim_end_matches('/'));
    stdfs::File::create(&probe_path)?;
    let _ = stdfs::remove_file(&probe_path);
    info!("Output directory is writable");
    Ok(())
}
