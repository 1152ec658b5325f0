//! Immutable run configuration.
//!
//! Every tunable arrives as an optional raw string (flag, environment
//! variable, or YAML file) and is turned into a typed value exactly once by
//! [`resolve`]. The resulting [`BriefConfig`] is built in `main` and passed by
//! reference into each component; nothing downstream reads the environment.
//!
//! Precedence: command line / environment, then the YAML file, then the default.

use crate::cli::Cli;
use crate::error::BriefError;
use crate::normalize::RssInput;
use crate::pipeline::BriefRequest;
use serde::{Deserialize, Deserializer};
use std::str::FromStr;
use std::time::Duration;
use tokio::fs;
use tracing::{info, instrument};

pub const DEFAULT_RSS_URL: &str =
    "https://news.google.com/rss/search?q=artificial%20intelligence&hl=en-US&gl=US&ceid=US:en";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Parse an optional raw override, falling back to `default` and clamping to `[min, max]`.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(resolve(Some("9"), 3usize, 1, 8), 8);
/// assert_eq!(resolve(Some("many"), 3usize, 1, 8), 3);
/// assert_eq!(resolve::<usize>(None, 3, 1, 8), 3);
/// ```
pub fn resolve<T>(raw: Option<&str>, default: T, min: T, max: T) -> T
where
    T: FromStr + Ord + Copy,
{
    raw.and_then(|value| value.trim().parse::<T>().ok())
        .unwrap_or(default)
        .clamp(min, max)
}

fn resolve_ms(raw: Option<&str>, default: u64, min: u64, max: u64) -> Duration {
    Duration::from_millis(resolve(raw, default, min, max))
}

/// Optional YAML settings file. Keys mirror the environment variables in snake_case.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub struct FileSettings {
    #[serde(deserialize_with = "lenient_string")]
    pub keyword: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub limit: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub rss_urls: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub openai_base_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub model: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub rss_url: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub translate_timeout_ms: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub enrich_fact_count: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub enrich_related_limit: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub enrich_concurrency: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub article_fetch_timeout_ms: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub enrich_timeout_ms: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub feed_timeout_ms: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub news_pool_max_items: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gamma_poll_interval_ms: Option<String>,
    #[serde(deserialize_with = "lenient_string")]
    pub gamma_poll_max_tries: Option<String>,
}

/// Accept strings, numbers, booleans, or a list of strings (joined by newlines).
fn lenient_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    use serde_yaml::Value;

    let value = Option::<Value>::deserialize(deserializer)?;
    Ok(match value {
        Some(Value::String(s)) => Some(s),
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::Bool(b)) => Some(b.to_string()),
        Some(Value::Sequence(items)) => Some(
            items
                .iter()
                .filter_map(Value::as_str)
                .collect::<Vec<_>>()
                .join("\n"),
        ),
        _ => None,
    })
}

/// Read and parse the YAML settings file at `path`.
///
/// # Errors
///
/// Returns [`BriefError::Io`] if the file cannot be read or
/// [`BriefError::Yaml`] if it is not valid YAML for [`FileSettings`].
#[instrument(level = "info", skip_all, fields(%path))]
pub async fn load_file_settings(path: &str) -> Result<FileSettings, BriefError> {
    let text = fs::read_to_string(path).await?;
    let settings: FileSettings = serde_yaml::from_str(&text)?;
    info!("Loaded settings file");
    Ok(settings)
}

/// Language-model endpoint settings. `api_key` is `None` when no credential is configured.
#[derive(Debug, Clone)]
pub struct LlmSettings {
    pub api_key: Option<String>,
    pub base_url: String,
    pub model: String,
}

#[derive(Debug, Clone)]
pub struct BriefConfig {
    pub llm: LlmSettings,
    pub gamma_api_key: Option<String>,
    pub default_rss_url: String,
    pub translate_timeout: Duration,
    pub fact_count: usize,
    pub related_limit: usize,
    pub concurrency: usize,
    pub article_fetch_timeout: Duration,
    pub enrich_timeout: Duration,
    pub feed_timeout: Duration,
    pub news_pool_max_items: usize,
    pub poll_interval: Duration,
    pub poll_max_tries: usize,
}

impl Default for BriefConfig {
    fn default() -> Self {
        Self::resolve(&Cli::default(), &FileSettings::default())
    }
}

fn non_empty(value: Option<&String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

impl BriefConfig {
    /// Combine CLI/environment values with the settings file into one immutable config.
    pub fn resolve(cli: &Cli, file: &FileSettings) -> Self {
        let pick = |a: &Option<String>, b: &Option<String>| a.clone().or_else(|| b.clone());

        Self {
            llm: LlmSettings {
                api_key: non_empty(cli.openai_api_key.as_ref()),
                base_url: non_empty(pick(&cli.openai_base_url, &file.openai_base_url).as_ref())
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: non_empty(pick(&cli.model, &file.model).as_ref())
                    .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            },
            gamma_api_key: non_empty(cli.gamma_api_key.as_ref()),
            default_rss_url: non_empty(pick(&cli.default_rss_url, &file.rss_url).as_ref())
                .unwrap_or_else(|| DEFAULT_RSS_URL.to_string()),
            translate_timeout: resolve_ms(
                pick(&cli.translate_timeout_ms, &file.translate_timeout_ms).as_deref(),
                5000,
                1000,
                20000,
            ),
            fact_count: resolve(
                pick(&cli.fact_count, &file.enrich_fact_count).as_deref(),
                2,
                1,
                6,
            ),
            related_limit: resolve(
                pick(&cli.related_limit, &file.enrich_related_limit).as_deref(),
                3,
                1,
                8,
            ),
            concurrency: resolve(
                pick(&cli.concurrency, &file.enrich_concurrency).as_deref(),
                3,
                1,
                8,
            ),
            article_fetch_timeout: resolve_ms(
                pick(&cli.article_timeout_ms, &file.article_fetch_timeout_ms).as_deref(),
                4500,
                1000,
                20000,
            ),
            enrich_timeout: resolve_ms(
                pick(&cli.enrich_timeout_ms, &file.enrich_timeout_ms).as_deref(),
                15000,
                1000,
                30000,
            ),
            feed_timeout: resolve_ms(
                pick(&cli.feed_timeout_ms, &file.feed_timeout_ms).as_deref(),
                10000,
                1000,
                30000,
            ),
            news_pool_max_items: resolve(
                pick(&cli.news_pool_max_items, &file.news_pool_max_items).as_deref(),
                60,
                1,
                200,
            ),
            poll_interval: resolve_ms(
                pick(&cli.poll_interval_ms, &file.gamma_poll_interval_ms).as_deref(),
                2500,
                500,
                60000,
            ),
            poll_max_tries: resolve(
                pick(&cli.poll_max_tries, &file.gamma_poll_max_tries).as_deref(),
                120,
                1,
                1000,
            ),
        }
    }
}

/// Build the pipeline request from the CLI, falling back to the settings file.
///
/// Repeated `--rss` flags win over free-text source lists.
pub fn brief_request(cli: &Cli, file: &FileSettings) -> BriefRequest {
    let rss = if cli.rss.is_empty() {
        RssInput::Text(
            cli.rss_urls
                .clone()
                .or_else(|| file.rss_urls.clone())
                .unwrap_or_default(),
        )
    } else {
        RssInput::List(cli.rss.clone())
    };

    BriefRequest {
        keyword: cli.keyword.clone().or_else(|| file.keyword.clone()),
        limit: cli.limit.clone().or_else(|| file.limit.clone()),
        rss,
        enrich: !cli.no_enrich,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_clamps_and_defaults() {
        assert_eq!(resolve(Some("9"), 3usize, 1, 8), 8);
        assert_eq!(resolve(Some("0"), 3usize, 1, 8), 1);
        assert_eq!(resolve(Some(" 5 "), 3usize, 1, 8), 5);
        assert_eq!(resolve(Some("many"), 3usize, 1, 8), 3);
        assert_eq!(resolve(Some("-2"), 3usize, 1, 8), 3);
        assert_eq!(resolve::<usize>(None, 3, 1, 8), 3);
        assert_eq!(resolve(Some("999999"), 5000u64, 1000, 20000), 20000);
    }

    #[test]
    fn test_defaults() {
        let config = BriefConfig::resolve(&Cli::default(), &FileSettings::default());
        assert_eq!(config.translate_timeout, Duration::from_millis(5000));
        assert_eq!(config.fact_count, 2);
        assert_eq!(config.related_limit, 3);
        assert_eq!(config.concurrency, 3);
        assert_eq!(config.article_fetch_timeout, Duration::from_millis(4500));
        assert_eq!(config.enrich_timeout, Duration::from_millis(15000));
        assert_eq!(config.feed_timeout, Duration::from_millis(10000));
        assert_eq!(config.news_pool_max_items, 60);
        assert_eq!(config.default_rss_url, DEFAULT_RSS_URL);
        assert_eq!(config.llm.model, DEFAULT_MODEL);
        assert!(config.llm.api_key.is_none());
    }

    #[test]
    fn test_cli_overrides_file() {
        let cli = Cli {
            concurrency: Some("6".to_string()),
            openai_api_key: Some("  ".to_string()),
            ..Cli::default()
        };
        let file: FileSettings = serde_yaml::from_str(
            "enrich_concurrency: 2\nenrich_fact_count: 4\nmodel: local-model\narticle_fetch_timeout_ms: '50'\n",
        )
        .unwrap();

        let config = BriefConfig::resolve(&cli, &file);
        assert_eq!(config.concurrency, 6);
        assert_eq!(config.fact_count, 4);
        assert_eq!(config.llm.model, "local-model");
        assert_eq!(config.article_fetch_timeout, Duration::from_millis(1000));
        assert!(config.llm.api_key.is_none(), "blank key counts as missing");
    }

    #[test]
    fn test_file_settings_accept_source_lists() {
        let file: FileSettings =
            serde_yaml::from_str("rss_urls:\n  - https://a.example/rss\n  - https://b.example/rss\nlimit: 5\n")
                .unwrap();
        assert_eq!(
            file.rss_urls.as_deref(),
            Some("https://a.example/rss\nhttps://b.example/rss")
        );

        let request = brief_request(&Cli::default(), &file);
        assert_eq!(request.limit.as_deref(), Some("5"));
        assert!(request.enrich);
        match request.rss {
            RssInput::Text(text) => assert!(text.contains("b.example")),
            RssInput::List(_) => panic!("expected text input"),
        }
    }

    #[test]
    fn test_brief_request_prefers_repeated_flags() {
        let cli = Cli {
            rss: vec!["https://a.example/rss".to_string()],
            rss_urls: Some("https://ignored.example/rss".to_string()),
            no_enrich: true,
            ..Cli::default()
        };
        let request = brief_request(&cli, &FileSettings::default());
        assert!(!request.enrich);
        match request.rss {
            RssInput::List(urls) => assert_eq!(urls, vec!["https://a.example/rss"]),
            RssInput::Text(_) => panic!("expected list input"),
        }
    }
}
