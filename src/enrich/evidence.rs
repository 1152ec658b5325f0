//! Per-headline evidence gathering.
//!
//! Two best-effort lookups run side by side for each headline: the article
//! page itself, reduced to a plain-text snippet, and a secondary news search
//! for related coverage. Neither can fail the headline; a miss is simply
//! absent evidence.

use crate::feeds::{FeedDocument, FeedSource, google_news};
use crate::models::{EvidenceBundle, Headline, RelatedItem, SourceCandidate};
use crate::utils::{collapse_whitespace, error_message, normalize_link, truncate_chars};
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::ACCEPT;
use scraper::Html;
use std::collections::HashSet;
use std::time::Duration;
use tracing::{debug, instrument};

/// Longest article snippet kept, in characters.
pub const ARTICLE_SNIPPET_MAX: usize = 1800;

static NON_CONTENT: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?is)<script\b[^>]*>.*?</script\s*>|<style\b[^>]*>.*?</style\s*>|<noscript\b[^>]*>.*?</noscript\s*>|<!--.*?-->")
        .expect("valid non-content regex")
});

/// Strip scripts, styles, and comments, then flatten the remaining markup to text.
pub fn html_to_text(html: &str) -> String {
    let cleaned = NON_CONTENT.replace_all(html, " ");
    let document = Html::parse_document(&cleaned);
    let text = document.root_element().text().collect::<Vec<_>>().join(" ");
    collapse_whitespace(&text)
}

/// Related items from a search document, skipping the headline's own link
/// and repeats by normalized link.
pub fn related_from_document(
    document: &FeedDocument,
    own_link: &str,
    limit: usize,
) -> Vec<RelatedItem> {
    let fallback_source = document
        .title
        .as_deref()
        .filter(|t| !t.trim().is_empty())
        .unwrap_or("Google News");
    let mut seen: HashSet<String> = HashSet::new();
    let own = normalize_link(own_link);
    if !own.is_empty() {
        seen.insert(own);
    }

    document
        .items
        .iter()
        .filter(|entry| {
            let key = normalize_link(&entry.link);
            !key.is_empty() && seen.insert(key)
        })
        .take(limit)
        .map(|entry| RelatedItem {
            title: match entry.title.trim() {
                "" => "Untitled".to_string(),
                t => t.to_string(),
            },
            link: entry.link.trim().to_string(),
            source: entry
                .source_name
                .clone()
                .unwrap_or_else(|| fallback_source.to_string()),
            published_at: entry.date().to_string(),
        })
        .collect()
}

/// The citation whitelist: the headline link (when present), then each related link.
pub fn source_candidates(headline: &Headline, related: &[RelatedItem]) -> Vec<SourceCandidate> {
    let own = (!headline.link.trim().is_empty()).then(|| SourceCandidate {
        title: headline.title.clone(),
        url: headline.link.trim().to_string(),
        source: headline.source.clone(),
    });
    own.into_iter()
        .chain(related.iter().map(|item| SourceCandidate {
            title: item.title.clone(),
            url: item.link.clone(),
            source: item.source.clone(),
        }))
        .collect()
}

/// Render the text shown to the language model. No evidence renders as "".
pub fn build_evidence_text(article_snippet: Option<&str>, related: &[RelatedItem]) -> String {
    let mut sections = Vec::new();
    if let Some(snippet) = article_snippet.filter(|s| !s.is_empty()) {
        sections.push(format!("Article summary:\n{snippet}"));
    }
    if !related.is_empty() {
        let lines = related
            .iter()
            .enumerate()
            .map(|(i, item)| {
                let mut line = format!("{}. {} ({})", i + 1, item.title, item.source);
                if !item.published_at.is_empty() {
                    line.push_str(&format!(" [{}]", item.published_at));
                }
                line.push_str(&format!("\n   URL: {}", item.link));
                line
            })
            .collect::<Vec<_>>()
            .join("\n");
        sections.push(format!("Related news candidates:\n{lines}"));
    }
    sections.join("\n\n")
}

pub struct EvidenceGatherer<'a, S> {
    http: &'a Client,
    feeds: &'a S,
    article_timeout: Duration,
}

impl<'a, S: FeedSource> EvidenceGatherer<'a, S> {
    pub fn new(http: &'a Client, feeds: &'a S, article_timeout: Duration) -> Self {
        Self {
            http,
            feeds,
            article_timeout,
        }
    }

    /// Gather the article snippet and related coverage for one headline.
    #[instrument(level = "debug", skip_all, fields(link = %headline.link))]
    pub async fn gather(&self, headline: &Headline, keyword: &str, related_limit: usize) -> EvidenceBundle {
        let (article_snippet, related_news) = tokio::join!(
            self.fetch_article_snippet(&headline.link),
            self.search_related(headline, keyword, related_limit.max(1)),
        );

        let source_candidates = source_candidates(headline, &related_news);
        let evidence_text = build_evidence_text(article_snippet.as_deref(), &related_news);
        EvidenceBundle {
            article_snippet,
            related_news,
            source_candidates,
            evidence_text,
        }
    }

    async fn fetch_article_snippet(&self, link: &str) -> Option<String> {
        let link = link.trim();
        if !(link.starts_with("http://") || link.starts_with("https://")) {
            return None;
        }

        let fetch = async {
            let response = self
                .http
                .get(link)
                .header(ACCEPT, "text/html,application/xhtml+xml;q=0.9,*/*;q=0.8")
                .send()
                .await?
                .error_for_status()?;
            response.text().await
        };

        let html = match tokio::time::timeout(self.article_timeout, fetch).await {
            Ok(Ok(html)) => html,
            Ok(Err(e)) => {
                debug!(%link, error = %error_message(&e), "Article fetch failed");
                return None;
            }
            Err(_) => {
                debug!(%link, timeout_ms = self.article_timeout.as_millis() as u64, "Article fetch timed out");
                return None;
            }
        };

        let snippet = truncate_chars(&html_to_text(&html), ARTICLE_SNIPPET_MAX);
        (!snippet.is_empty()).then_some(snippet)
    }

    async fn search_related(&self, headline: &Headline, keyword: &str, limit: usize) -> Vec<RelatedItem> {
        let query = collapse_whitespace(&format!("{} {}", headline.title, keyword));
        let url = google_news::search_url(&query);
        match self.feeds.parse(&url).await {
            Ok(document) => related_from_document(&document, &headline.link, limit),
            Err(e) => {
                debug!(%query, error = %e, "Related search failed");
                Vec::new()
            }
        }
    }
}
