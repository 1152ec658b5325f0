//! Data models for headlines, grounded facts, and the evidence gathered for them.
//!
//! This module defines the core data structures used throughout the pipeline:
//! - [`Headline`]: One normalized news item, later enriched in place
//! - [`Fact`] / [`FactSource`]: A claim and the evidence URLs that back it
//! - [`RelatedItem`] / [`SourceCandidate`] / [`EvidenceBundle`]: Per-headline evidence
//! - [`KeywordTranslation`]: The outcome of search-keyword translation
//!
//! Serialized field names are camelCase to match the run report consumed by
//! the front ends.

use crate::utils::{normalize_link, to_timestamp};
use serde::{Deserialize, Serialize};

/// A single news item surfaced from a feed.
///
/// `title`, `link`, `source`, and `published_at` are fixed once the feed
/// fetcher creates the headline. Enrichment only fills the snippet, facts,
/// and warning fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Headline {
    pub title: String,
    /// Article URL; empty when the feed entry carried none.
    pub link: String,
    /// Title of the feed the item came from.
    pub source: String,
    /// Raw date string from the feed; empty when unknown.
    pub published_at: String,
    pub image_url: Option<String>,
    pub article_snippet: Option<String>,
    pub expanded_facts: Vec<Fact>,
    pub enrichment_warning: Option<String>,
}

impl Headline {
    pub fn new(title: &str, link: &str, source: &str, published_at: &str) -> Self {
        Self {
            title: title.to_string(),
            link: link.to_string(),
            source: source.to_string(),
            published_at: published_at.to_string(),
            image_url: None,
            article_snippet: None,
            expanded_facts: Vec::new(),
            enrichment_warning: None,
        }
    }

    /// Dedup identity: normalized link, or lowercased title plus raw date.
    pub fn identity_key(&self) -> String {
        let link = normalize_link(&self.link);
        if link.is_empty() {
            format!(
                "{}__{}",
                self.title.trim().to_lowercase(),
                self.published_at
            )
        } else {
            link
        }
    }

    /// Epoch millis of `published_at`, `-1` when unparsable.
    pub fn timestamp(&self) -> i64 {
        to_timestamp(&self.published_at)
    }

    /// Copy of this headline with every enrichment field reset.
    pub fn base(&self) -> Self {
        let mut base = Self::new(&self.title, &self.link, &self.source, &self.published_at);
        base.image_url = self.image_url.clone();
        base
    }
}

/// A verifiable claim with at least one cited source drawn from gathered evidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Fact {
    #[serde(rename = "fact")]
    pub text: String,
    pub sources: Vec<FactSource>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FactSource {
    pub title: String,
    pub url: String,
}

/// A news item found by the secondary search scoped to one headline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItem {
    pub title: String,
    pub link: String,
    pub source: String,
    pub published_at: String,
}

/// An entry in the source whitelist a fact may cite.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceCandidate {
    pub title: String,
    pub url: String,
    pub source: String,
}

/// Everything gathered to ground enrichment for one headline.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EvidenceBundle {
    pub article_snippet: Option<String>,
    pub related_news: Vec<RelatedItem>,
    /// Headline link first, then each related link.
    pub source_candidates: Vec<SourceCandidate>,
    /// The literal text shown to the language model.
    pub evidence_text: String,
}

/// Outcome of deciding whether, and how, to translate the search keyword.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeywordTranslation {
    pub original_keyword: String,
    pub translated_keyword: Option<String>,
    /// Translated keyword when applied, otherwise the original.
    pub search_keyword: String,
    pub translation_applied: bool,
    pub warning: Option<String>,
}

impl KeywordTranslation {
    /// No translation: search with the keyword as given.
    pub fn untranslated(keyword: &str, warning: Option<String>) -> Self {
        Self {
            original_keyword: keyword.to_string(),
            translated_keyword: None,
            search_keyword: keyword.to_string(),
            translation_applied: false,
            warning,
        }
    }

    pub fn translated(keyword: &str, translated: &str) -> Self {
        Self {
            original_keyword: keyword.to_string(),
            translated_keyword: Some(translated.to_string()),
            search_keyword: translated.to_string(),
            translation_applied: true,
            warning: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity_key_prefers_normalized_link() {
        let a = Headline::new("Title", "https://a.example/story/", "Feed", "");
        let b = Headline::new("Other", "https://a.example/story", "Feed", "");
        assert_eq!(a.identity_key(), b.identity_key());
    }

    #[test]
    fn test_identity_key_falls_back_to_title_and_date() {
        let a = Headline::new("  Big News ", "", "Feed", "2025-05-06");
        let b = Headline::new("big news", "", "Other", "2025-05-06");
        let c = Headline::new("big news", "", "Other", "2025-05-07");
        assert_eq!(a.identity_key(), b.identity_key());
        assert_ne!(a.identity_key(), c.identity_key());
    }

    #[test]
    fn test_base_clears_enrichment_fields() {
        let mut h = Headline::new("T", "https://a.example/", "Feed", "2025-05-06");
        h.image_url = Some("https://img.example/x.png".to_string());
        h.article_snippet = Some("snippet".to_string());
        h.enrichment_warning = Some("warn".to_string());
        h.expanded_facts.push(Fact {
            text: "X".to_string(),
            sources: vec![FactSource {
                title: "T".to_string(),
                url: "https://a.example/".to_string(),
            }],
        });

        let base = h.base();
        assert_eq!(base.title, "T");
        assert_eq!(base.image_url.as_deref(), Some("https://img.example/x.png"));
        assert!(base.article_snippet.is_none());
        assert!(base.expanded_facts.is_empty());
        assert!(base.enrichment_warning.is_none());
    }

    #[test]
    fn test_headline_serializes_camel_case() {
        let h = Headline::new("T", "https://a.example/", "Feed", "2025-05-06");
        let json = serde_json::to_string(&h).unwrap();
        assert!(json.contains("\"publishedAt\":\"2025-05-06\""));
        assert!(json.contains("\"expandedFacts\":[]"));
    }

    #[test]
    fn test_fact_serializes_with_fact_key() {
        let fact = Fact {
            text: "X".to_string(),
            sources: vec![],
        };
        let json = serde_json::to_string(&fact).unwrap();
        assert_eq!(json, r#"{"fact":"X","sources":[]}"#);
    }

    #[test]
    fn test_translation_constructors() {
        let t = KeywordTranslation::translated("人工智能", "artificial intelligence");
        assert!(t.translation_applied);
        assert_eq!(t.search_keyword, "artificial intelligence");

        let u = KeywordTranslation::untranslated("ai policy", None);
        assert!(!u.translation_applied);
        assert_eq!(u.search_keyword, "ai policy");
        assert!(u.translated_keyword.is_none());
    }
}
