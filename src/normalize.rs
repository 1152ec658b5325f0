//! Input normalization for the keyword, headline limit, and RSS source list.
//!
//! None of these functions fail: malformed input falls back to a default or,
//! for RSS URLs, is reported back in [`NormalizedRssUrls::invalid`].

use crate::utils::collapse_whitespace;
use itertools::Itertools;
use url::Url;

pub const DEFAULT_KEYWORD: &str = "人工智能 国别 政策";
pub const DEFAULT_LIMIT: usize = 12;
pub const MIN_LIMIT: usize = 1;
pub const MAX_LIMIT: usize = 20;

/// RSS sources as they arrive from the caller.
#[derive(Debug, Clone)]
pub enum RssInput {
    /// One URL per entry.
    List(Vec<String>),
    /// Free text, split on newlines and commas.
    Text(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedRssUrls {
    /// Accepted http/https URLs, deduplicated in first-seen order.
    pub urls: Vec<String>,
    /// Entries that failed to parse or used another scheme.
    pub invalid: Vec<String>,
}

/// Parse the limit like a lenient integer parser and clamp it to `[1, 20]`.
///
/// Leading whitespace, an optional sign, and a leading run of digits are
/// accepted (`"7 items"` is 7, `"3.9"` is 3). Anything without leading digits
/// yields [`DEFAULT_LIMIT`].
pub fn normalize_limit(value: Option<&str>) -> usize {
    let Some(parsed) = value.and_then(parse_leading_int) else {
        return DEFAULT_LIMIT;
    };
    parsed.clamp(MIN_LIMIT as i64, MAX_LIMIT as i64) as usize
}

fn parse_leading_int(raw: &str) -> Option<i64> {
    let s = raw.trim_start();
    let (negative, rest) = match s.as_bytes().first() {
        Some(b'-') => (true, &s[1..]),
        Some(b'+') => (false, &s[1..]),
        _ => (false, s),
    };
    let digits: String = rest.chars().take_while(char::is_ascii_digit).collect();
    if digits.is_empty() {
        return None;
    }
    let magnitude = digits.parse::<i64>().unwrap_or(i64::MAX);
    Some(if negative { -magnitude } else { magnitude })
}

/// Trim and collapse whitespace; an empty keyword becomes [`DEFAULT_KEYWORD`].
pub fn normalize_keyword(value: Option<&str>) -> String {
    let normalized = collapse_whitespace(value.unwrap_or(""));
    if normalized.is_empty() {
        DEFAULT_KEYWORD.to_string()
    } else {
        normalized
    }
}

/// Validate RSS source entries.
///
/// Each non-empty entry is trimmed and parsed as a URL. Entries that fail to
/// parse or whose scheme is not http/https are collected into `invalid`.
pub fn normalize_rss_urls(input: &RssInput) -> NormalizedRssUrls {
    let entries: Vec<&str> = match input {
        RssInput::List(items) => items.iter().map(String::as_str).collect(),
        RssInput::Text(text) => text.split(['\n', ',']).collect(),
    };

    let mut urls = Vec::new();
    let mut invalid = Vec::new();
    for entry in entries {
        let text = entry.trim();
        if text.is_empty() {
            continue;
        }
        match Url::parse(text) {
            Ok(parsed) if matches!(parsed.scheme(), "http" | "https") => {
                urls.push(parsed.to_string());
            }
            _ => invalid.push(text.to_string()),
        }
    }

    NormalizedRssUrls {
        urls: urls.into_iter().unique().collect(),
        invalid,
    }
}
