//! Bounded-concurrency headline enrichment.
//!
//! # Submodules
//!
//! - [`evidence`]: Article snippet and related-coverage gathering
//! - [`facts`]: Grounded fact extraction from gathered evidence
//!
//! # Concurrency
//!
//! A fixed number of workers pull headline indices from a shared cursor, so
//! a slow item only holds up its own worker. Each worker returns its results
//! tagged with the input index and they are slotted back in input order.
//! A panic while enriching one headline is caught and reported against that
//! item alone.

pub mod evidence;
pub mod facts;

use crate::api::AskAsync;
use crate::feeds::FeedSource;
use crate::models::Headline;
use evidence::EvidenceGatherer;
use facts::FactExtractor;
use futures::FutureExt;
use futures::future::join_all;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicUsize, Ordering};
use tracing::{info, instrument, warn};

pub const MAX_CONCURRENCY: usize = 8;

#[derive(Debug, Clone)]
pub struct EnrichOptions<'a> {
    pub keyword: &'a str,
    pub fact_count: usize,
    pub related_limit: usize,
    pub concurrency: usize,
}

#[derive(Debug, Clone, Default)]
pub struct EnrichmentReport {
    /// One entry per input headline, in input order.
    pub items: Vec<Headline>,
    /// Per-item warnings labeled with the 1-based item position.
    pub warnings: Vec<String>,
    /// Headlines that ended up with at least one fact.
    pub enriched_count: usize,
}

type ItemOutcome = (Headline, Option<String>);

fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}

pub struct Enricher<'a, C, S> {
    gatherer: EvidenceGatherer<'a, S>,
    extractor: FactExtractor<'a, C>,
}

impl<'a, C: AskAsync, S: FeedSource> Enricher<'a, C, S> {
    pub fn new(gatherer: EvidenceGatherer<'a, S>, extractor: FactExtractor<'a, C>) -> Self {
        Self {
            gatherer,
            extractor,
        }
    }

    async fn enrich_one(&self, headline: &Headline, options: &EnrichOptions<'_>) -> ItemOutcome {
        let evidence = self
            .gatherer
            .gather(headline, options.keyword, options.related_limit)
            .await;
        let extraction = self
            .extractor
            .extract(headline, &evidence, options.fact_count)
            .await;

        let mut item = headline.base();
        item.article_snippet = evidence.article_snippet;
        item.expanded_facts = extraction.facts;
        item.enrichment_warning = extraction.warning.clone();
        (item, extraction.warning)
    }

    /// Enrich every headline with at most `options.concurrency` in flight.
    #[instrument(level = "info", skip_all, fields(count = headlines.len(), concurrency = options.concurrency))]
    pub async fn enrich(&self, headlines: Vec<Headline>, options: &EnrichOptions<'_>) -> EnrichmentReport {
        if headlines.is_empty() {
            return EnrichmentReport::default();
        }
        let workers = options
            .concurrency
            .clamp(1, MAX_CONCURRENCY)
            .min(headlines.len());

        let cursor = AtomicUsize::new(0);
        let cursor = &cursor;
        let pool = &headlines;
        let results = join_all((0..workers).map(|_| async move {
            let mut done = Vec::new();
            loop {
                let index = cursor.fetch_add(1, Ordering::SeqCst);
                let Some(headline) = pool.get(index) else {
                    break;
                };
                let outcome = AssertUnwindSafe(self.enrich_one(headline, options))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|payload| {
                        let message = panic_message(payload.as_ref());
                        warn!(item = index + 1, %message, "Enrichment panicked");
                        let warning = format!("enrichment failed: {message}");
                        let mut item = headline.base();
                        item.enrichment_warning = Some(warning.clone());
                        (item, Some(warning))
                    });
                done.push((index, outcome));
            }
            done
        }))
        .await;

        let mut slots: Vec<Option<ItemOutcome>> = vec![None; headlines.len()];
        for (index, outcome) in results.into_iter().flatten() {
            slots[index] = Some(outcome);
        }

        let mut report = EnrichmentReport::default();
        for (index, (slot, original)) in slots.into_iter().zip(headlines.iter()).enumerate() {
            let (item, warning) = slot.unwrap_or_else(|| (original.base(), None));
            if let Some(warning) = warning {
                report.warnings.push(format!("item {}: {warning}", index + 1));
            }
            if !item.expanded_facts.is_empty() {
                report.enriched_count += 1;
            }
            report.items.push(item);
        }

        info!(
            enriched = report.enriched_count,
            warnings = report.warnings.len(),
            "Enrichment finished"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ChatRequest;
    use crate::error::LlmError;
    use crate::feeds::google_news;
    use crate::test_support::{FakeFeeds, ScriptedLlm, entry};
    use reqwest::Client;
    use std::time::Duration;

    const GOOD_REPLY: &str =
        r#"{"facts":[{"fact":"Confirmed.","sources":[{"title":"R","url":"https://r.example/1"}]}]}"#;

    fn related_feeds() -> FakeFeeds {
        FakeFeeds::default().with_prefix(
            google_news::SEARCH_ENDPOINT,
            "Search",
            vec![entry("Related", "https://r.example/1", "")],
        )
    }

    fn headlines(n: usize) -> Vec<Headline> {
        (0..n)
            .map(|i| Headline::new(&format!("Story {i}"), "", "Wire", ""))
            .collect()
    }

    fn options(concurrency: usize) -> EnrichOptions<'static> {
        EnrichOptions {
            keyword: "policy",
            fact_count: 2,
            related_limit: 3,
            concurrency,
        }
    }

    #[tokio::test]
    async fn test_worker_pool_bounds_in_flight_calls() {
        let feeds = related_feeds();
        let http = Client::new();
        let llm = ScriptedLlm::new(vec![GOOD_REPLY.to_string()]).with_delay(Duration::from_millis(30));
        let enricher = Enricher::new(
            EvidenceGatherer::new(&http, &feeds, Duration::from_secs(1)),
            FactExtractor::new(Some(&llm), "m", Duration::from_secs(2)),
        );

        let report = enricher.enrich(headlines(6), &options(2)).await;
        assert_eq!(llm.call_count(), 6);
        assert_eq!(llm.peak_in_flight.load(Ordering::SeqCst), 2);
        assert_eq!(report.enriched_count, 6);
        assert!(report.warnings.is_empty());
        let titles: Vec<_> = report.items.iter().map(|h| h.title.as_str()).collect();
        assert_eq!(
            titles,
            vec!["Story 0", "Story 1", "Story 2", "Story 3", "Story 4", "Story 5"]
        );
    }

    #[tokio::test]
    async fn test_concurrency_is_clamped() {
        let feeds = related_feeds();
        let http = Client::new();
        let llm = ScriptedLlm::new(vec![GOOD_REPLY.to_string()]).with_delay(Duration::from_millis(20));
        let enricher = Enricher::new(
            EvidenceGatherer::new(&http, &feeds, Duration::from_secs(1)),
            FactExtractor::new(Some(&llm), "m", Duration::from_secs(2)),
        );

        let report = enricher.enrich(headlines(12), &options(50)).await;
        assert_eq!(report.items.len(), 12);
        assert!(llm.peak_in_flight.load(Ordering::SeqCst) <= MAX_CONCURRENCY);

        let report = enricher.enrich(headlines(2), &options(0)).await;
        assert_eq!(report.enriched_count, 2);
    }

    /// Panics on one headline, answers normally for the rest.
    struct PanicOn(&'static str);

    impl AskAsync for PanicOn {
        async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
            if request.messages[1].content.contains(self.0) {
                panic!("model exploded");
            }
            Ok(GOOD_REPLY.to_string())
        }
    }

    #[tokio::test]
    async fn test_panicking_item_is_isolated() {
        let feeds = related_feeds();
        let http = Client::new();
        let llm = PanicOn("Story 1");
        let enricher = Enricher::new(
            EvidenceGatherer::new(&http, &feeds, Duration::from_secs(1)),
            FactExtractor::new(Some(&llm), "m", Duration::from_secs(2)),
        );

        let input = headlines(3);
        let report = enricher.enrich(input.clone(), &options(3)).await;
        assert_eq!(report.items.len(), 3);
        assert_eq!(report.enriched_count, 2);
        assert_eq!(report.warnings, vec!["item 2: enrichment failed: model exploded"]);

        let failed = &report.items[1];
        assert_eq!(failed.title, input[1].title);
        assert!(failed.expanded_facts.is_empty());
        assert!(failed.enrichment_warning.is_some());
    }

    #[tokio::test]
    async fn test_missing_evidence_warns_per_item() {
        let feeds = FakeFeeds::default();
        let http = Client::new();
        let llm = ScriptedLlm::new(vec![GOOD_REPLY.to_string()]);
        let enricher = Enricher::new(
            EvidenceGatherer::new(&http, &feeds, Duration::from_secs(1)),
            FactExtractor::new(Some(&llm), "m", Duration::from_secs(2)),
        );

        let report = enricher.enrich(headlines(2), &options(3)).await;
        assert_eq!(report.enriched_count, 0);
        assert_eq!(report.warnings.len(), 2);
        assert!(report.warnings[0].starts_with("item 1: "));
        assert!(report.warnings[1].starts_with("item 2: "));
        assert_eq!(llm.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_input() {
        let feeds = FakeFeeds::default();
        let http = Client::new();
        let enricher: Enricher<'_, ScriptedLlm, FakeFeeds> = Enricher::new(
            EvidenceGatherer::new(&http, &feeds, Duration::from_secs(1)),
            FactExtractor::new(None, "m", Duration::from_secs(2)),
        );
        let report = enricher.enrich(Vec::new(), &options(3)).await;
        assert!(report.items.is_empty());
        assert_eq!(report.enriched_count, 0);
    }
}
