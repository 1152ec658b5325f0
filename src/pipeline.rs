//! End-to-end brief run.
//!
//! Normalize the request, translate the search keyword, fetch and rank
//! headlines, enrich them, and assemble the brief text. Every stage degrades
//! to warnings; the run only fails when no headline survives the fetch.

use crate::api::AskAsync;
use crate::config::BriefConfig;
use crate::enrich::evidence::EvidenceGatherer;
use crate::enrich::facts::FactExtractor;
use crate::enrich::{EnrichOptions, Enricher};
use crate::error::BriefError;
use crate::feeds::rank::rank_headlines;
use crate::feeds::{FeedFetcher, FeedSource, google_news};
use crate::models::{Headline, KeywordTranslation};
use crate::normalize::{RssInput, normalize_keyword, normalize_limit, normalize_rss_urls};
use crate::outputs::brief::build_brief_input;
use crate::translate::KeywordTranslator;
use itertools::Itertools;
use reqwest::Client;
use serde::Serialize;
use tracing::{info, instrument, warn};

/// Raw inputs for one run, before normalization.
#[derive(Debug, Clone)]
pub struct BriefRequest {
    pub keyword: Option<String>,
    pub limit: Option<String>,
    pub rss: RssInput,
    pub enrich: bool,
}

/// Everything a run produced, as written to the JSON report.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BriefRun {
    pub limit: usize,
    /// Normalized display keyword.
    pub keyword: String,
    pub translation: KeywordTranslation,
    /// Accepted operator RSS URLs.
    pub rss_urls: Vec<String>,
    pub effective_sources: Vec<String>,
    pub enrichment_enabled: bool,
    pub enriched_count: usize,
    pub headlines: Vec<Headline>,
    pub warnings: Vec<String>,
    /// The assembled brief text for the generation API.
    pub input_text: String,
}

pub struct Pipeline<'a, C, S> {
    config: &'a BriefConfig,
    llm: Option<&'a C>,
    feeds: &'a S,
    http: &'a Client,
}

impl<'a, C: AskAsync, S: FeedSource> Pipeline<'a, C, S> {
    pub fn new(config: &'a BriefConfig, llm: Option<&'a C>, feeds: &'a S, http: &'a Client) -> Self {
        Self {
            config,
            llm,
            feeds,
            http,
        }
    }

    /// Run every stage for `request`.
    ///
    /// Warnings are ordered: translation, per-source fetch failures, invalid
    /// RSS entries, then per-item enrichment.
    ///
    /// # Errors
    ///
    /// [`BriefError::NoHeadlines`], carrying the warnings so far, when no
    /// headline survives fetching and ranking.
    #[instrument(level = "info", skip_all)]
    pub async fn run(&self, request: &BriefRequest) -> Result<BriefRun, BriefError> {
        let limit = normalize_limit(request.limit.as_deref());
        let keyword = normalize_keyword(request.keyword.as_deref());
        let rss = normalize_rss_urls(&request.rss);
        info!(limit, %keyword, sources = rss.urls.len(), invalid = rss.invalid.len(), "Normalized request");

        let translation = KeywordTranslator::new(self.llm, &self.config.llm.model, self.config.translate_timeout)
            .translate(&keyword)
            .await;
        let search_keyword = translation.search_keyword.clone();

        let mut warnings: Vec<String> = translation.warning.iter().cloned().collect();

        let sources: Vec<String> = std::iter::once(google_news::search_url(&search_keyword))
            .chain(rss.urls.iter().cloned())
            .unique()
            .collect();
        let fetched = FeedFetcher::new(
            self.feeds,
            &self.config.default_rss_url,
            self.config.news_pool_max_items,
        )
        .fetch(&sources)
        .await;
        warnings.extend(fetched.warnings);

        if !rss.invalid.is_empty() {
            warnings.push(format!(
                "ignored invalid RSS URL(s): {}",
                rss.invalid.join(", ")
            ));
        }

        let mut headlines = rank_headlines(fetched.items, limit);
        if headlines.is_empty() {
            warn!(warnings = warnings.len(), "No headlines survived fetching");
            return Err(BriefError::NoHeadlines { warnings });
        }
        info!(count = headlines.len(), "Ranked headlines");

        let mut enriched_count = 0;
        if request.enrich {
            let enricher = Enricher::new(
                EvidenceGatherer::new(self.http, self.feeds, self.config.article_fetch_timeout),
                FactExtractor::new(self.llm, &self.config.llm.model, self.config.enrich_timeout),
            );
            let options = EnrichOptions {
                keyword: &search_keyword,
                fact_count: self.config.fact_count,
                related_limit: self.config.related_limit,
                concurrency: self.config.concurrency,
            };
            let report = enricher.enrich(headlines, &options).await;
            headlines = report.items;
            enriched_count = report.enriched_count;
            warnings.extend(report.warnings);
        }

        let input_text = build_brief_input(&headlines, &keyword);

        Ok(BriefRun {
            limit,
            keyword,
            translation,
            rss_urls: rss.urls,
            effective_sources: fetched.effective_sources,
            enrichment_enabled: request.enrich,
            enriched_count,
            headlines,
            warnings,
            input_text,
        })
    }
}
