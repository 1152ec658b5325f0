//! Command-line interface definitions for Daily Brief.
//!
//! This module defines the CLI arguments and options using the `clap` crate.
//! All arguments can be provided via command-line flags or environment variables.
//! Numeric tuning knobs are taken as raw strings; [`crate::config`] decides
//! what an out-of-range or malformed value means.

use clap::Parser;

/// Command-line arguments for the Daily Brief application.
///
/// # Examples
///
/// ```sh
/// # Default keyword, print the brief without submitting it
/// daily_brief --dry-run
///
/// # Custom keyword and extra sources, write the run report
/// daily_brief -k "chip export controls" -r https://feeds.bbci.co.uk/news/rss.xml -j ./reports
///
/// # Tune enrichment through the environment
/// ENRICH_CONCURRENCY=5 ENRICH_FACT_COUNT=3 daily_brief -l 8
/// ```
#[derive(Parser, Debug, Default)]
#[command(author, version, about)]
pub struct Cli {
    /// Topic keyword for the brief
    #[arg(short, long, env = "BRIEF_KEYWORD")]
    pub keyword: Option<String>,

    /// Maximum number of headlines (1-20)
    #[arg(short, long, env = "BRIEF_LIMIT")]
    pub limit: Option<String>,

    /// Extra RSS source URL (repeatable)
    #[arg(short, long = "rss", value_name = "URL")]
    pub rss: Vec<String>,

    /// Extra RSS source URLs separated by newlines or commas
    #[arg(long, env = "BRIEF_RSS_URLS")]
    pub rss_urls: Option<String>,

    /// Optional path to a YAML settings file
    #[arg(short, long, env = "BRIEF_CONFIG")]
    pub config: Option<String>,

    /// Output directory for the JSON run report
    #[arg(short, long, env = "BRIEF_JSON_DIR")]
    pub json_output_dir: Option<String>,

    /// Assemble and print the brief without submitting it
    #[arg(long)]
    pub dry_run: bool,

    /// Skip fact enrichment
    #[arg(long)]
    pub no_enrich: bool,

    /// Language-model API key
    #[arg(long, env = "OPENAI_API_KEY", hide_env_values = true)]
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    #[arg(long, env = "OPENAI_BASE_URL")]
    pub openai_base_url: Option<String>,

    /// Language-model name
    #[arg(long, env = "OPENAI_MODEL")]
    pub model: Option<String>,

    /// Generation API key
    #[arg(long, env = "GAMMA_API_KEY", hide_env_values = true)]
    pub gamma_api_key: Option<String>,

    /// RSS source used when no other source is usable
    #[arg(long, env = "RSS_URL")]
    pub default_rss_url: Option<String>,

    /// Keyword translation timeout in milliseconds
    #[arg(long, env = "TRANSLATE_TIMEOUT_MS")]
    pub translate_timeout_ms: Option<String>,

    /// Facts extracted per headline
    #[arg(long, env = "ENRICH_FACT_COUNT")]
    pub fact_count: Option<String>,

    /// Related news items searched per headline
    #[arg(long, env = "ENRICH_RELATED_LIMIT")]
    pub related_limit: Option<String>,

    /// Headlines enriched concurrently
    #[arg(long, env = "ENRICH_CONCURRENCY")]
    pub concurrency: Option<String>,

    /// Article fetch timeout in milliseconds
    #[arg(long, env = "ARTICLE_FETCH_TIMEOUT_MS")]
    pub article_timeout_ms: Option<String>,

    /// Fact extraction timeout in milliseconds
    #[arg(long, env = "ENRICH_TIMEOUT_MS")]
    pub enrich_timeout_ms: Option<String>,

    /// Per-source RSS fetch timeout in milliseconds
    #[arg(long, env = "FEED_TIMEOUT_MS")]
    pub feed_timeout_ms: Option<String>,

    /// Maximum items accepted from a single RSS source
    #[arg(long, env = "NEWS_POOL_MAX_ITEMS")]
    pub news_pool_max_items: Option<String>,

    /// Generation status poll interval in milliseconds
    #[arg(long, env = "GAMMA_POLL_INTERVAL_MS")]
    pub poll_interval_ms: Option<String>,

    /// Generation status poll attempts before giving up
    #[arg(long, env = "GAMMA_POLL_MAX_TRIES")]
    pub poll_max_tries: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_parsing() {
        let cli = Cli::parse_from([
            "daily_brief",
            "--keyword",
            "chip controls",
            "--limit",
            "8",
            "--rss",
            "https://a.example/feed",
            "--rss",
            "https://b.example/feed",
            "--dry-run",
        ]);

        assert_eq!(cli.keyword.as_deref(), Some("chip controls"));
        assert_eq!(cli.limit.as_deref(), Some("8"));
        assert_eq!(cli.rss.len(), 2);
        assert!(cli.dry_run);
        assert!(!cli.no_enrich);
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["daily_brief", "-k", "ai", "-l", "3", "-j", "/tmp/json"]);

        assert_eq!(cli.keyword.as_deref(), Some("ai"));
        assert_eq!(cli.limit.as_deref(), Some("3"));
        assert_eq!(cli.json_output_dir.as_deref(), Some("/tmp/json"));
    }

    #[test]
    fn test_cli_accepts_garbage_numeric_overrides() {
        let cli = Cli::parse_from(["daily_brief", "--concurrency", "lots", "--fact-count=-3"]);

        assert_eq!(cli.concurrency.as_deref(), Some("lots"));
        assert_eq!(cli.fact_count.as_deref(), Some("-3"));
    }
}
