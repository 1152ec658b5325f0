//! Headline fetching from RSS/Atom sources.
//!
//! # Submodules
//!
//! - [`parser`]: XML parsing and the [`FeedSource`] collaborator trait
//! - [`image`]: Image URL extraction from feed entries
//! - [`google_news`]: Google News search URL construction
//! - [`rank`]: Cross-source dedup and recency ranking
//!
//! # Concurrency
//!
//! Every source is fetched at once and joined with a wait-all: the source
//! list is operator-controlled and small. Each fetch is bounded by the feed
//! client's own timeout, and a failing source contributes zero items and one
//! warning without affecting its siblings.

pub mod google_news;
pub mod image;
pub mod parser;
pub mod rank;

pub use parser::{FeedDocument, FeedSource, HttpFeedSource};

use crate::error::FeedError;
use crate::models::Headline;
use crate::utils::error_message;
use futures::future::join_all;
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, Default)]
pub struct FetchOutcome {
    /// Items from every successful source, in source order.
    pub items: Vec<Headline>,
    /// One entry per failed source.
    pub warnings: Vec<String>,
    /// The sources actually fetched, after the default fallback.
    pub effective_sources: Vec<String>,
}

/// Convert one feed document into headlines, keeping at most `cap` items.
pub fn headlines_from_document(document: &FeedDocument, cap: usize) -> Vec<Headline> {
    let source = document
        .title
        .as_deref()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .unwrap_or("RSS");

    document
        .items
        .iter()
        .take(cap)
        .map(|entry| {
            let title = entry.title.trim();
            let mut headline = Headline::new(
                if title.is_empty() { "Untitled" } else { title },
                entry.link.trim(),
                source,
                entry.date(),
            );
            headline.image_url = image::extract_image_url(entry);
            headline
        })
        .collect()
}

pub struct FeedFetcher<'a, S> {
    source: &'a S,
    default_rss_url: &'a str,
    per_source_cap: usize,
}

impl<'a, S: FeedSource> FeedFetcher<'a, S> {
    pub fn new(source: &'a S, default_rss_url: &'a str, per_source_cap: usize) -> Self {
        Self {
            source,
            default_rss_url,
            per_source_cap: per_source_cap.max(1),
        }
    }

    async fn fetch_source(&self, url: &str) -> Result<Vec<Headline>, FeedError> {
        let document = self.source.parse(url).await?;
        Ok(headlines_from_document(&document, self.per_source_cap))
    }

    /// Fetch every source concurrently and concatenate their items.
    ///
    /// An empty source list falls back to the configured default RSS URL
    /// and records a warning.
    #[instrument(level = "info", skip_all, fields(sources = source_urls.len()))]
    pub async fn fetch(&self, source_urls: &[String]) -> FetchOutcome {
        let mut outcome = FetchOutcome {
            effective_sources: source_urls.to_vec(),
            ..FetchOutcome::default()
        };
        if outcome.effective_sources.is_empty() {
            outcome.effective_sources.push(self.default_rss_url.to_string());
            outcome
                .warnings
                .push("no usable RSS source was provided; fell back to the default RSS feed".to_string());
        }

        let results = join_all(
            outcome
                .effective_sources
                .iter()
                .map(|url| async move { (url, self.fetch_source(url).await) }),
        )
        .await;

        for (url, result) in results {
            match result {
                Ok(items) => {
                    info!(%url, count = items.len(), "Fetched feed items");
                    outcome.items.extend(items);
                }
                Err(e) => {
                    warn!(%url, error = %e, "Feed fetch failed");
                    outcome
                        .warnings
                        .push(format!("source fetch failed ({url}): {}", error_message(&e)));
                }
            }
        }

        outcome
    }
}
