//! Grounded fact extraction.
//!
//! The model is asked for a strict JSON object of facts, each citing its
//! sources. Every cited URL is checked against the headline's source
//! whitelist; unmatched citations are dropped and a fact left with no
//! citation is discarded. Only malformed output is retried.

use crate::api::{AskAsync, ChatMessage, ChatRequest, ask_with_timeout};
use crate::error::LlmError;
use crate::models::{EvidenceBundle, Fact, FactSource, Headline, SourceCandidate};
use crate::utils::{error_message, normalize_link, truncate_chars};
use itertools::Itertools;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;
use tracing::{debug, instrument, warn};

pub const MAX_ATTEMPTS: usize = 2;
/// Longest evidence text sent to the model, in characters.
pub const EVIDENCE_PROMPT_MAX: usize = 2600;
pub const MAX_FACT_COUNT: usize = 6;

const SYSTEM_PROMPT: &str = "You extract verifiable facts about a news headline from the evidence provided. \
Use only the evidence. Cite only URLs that appear in the allowed source list and never invent a source. \
Reply with a single JSON object and nothing else, in exactly this shape: \
{\"facts\":[{\"fact\":\"...\",\"sources\":[{\"title\":\"...\",\"url\":\"...\"}]}]}";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FactExtraction {
    pub facts: Vec<Fact>,
    pub warning: Option<String>,
}

impl FactExtraction {
    fn failed(warning: String) -> Self {
        Self {
            facts: Vec::new(),
            warning: Some(warning),
        }
    }
}

#[derive(Debug)]
enum AttemptError {
    /// The reply could not be read as the facts contract.
    Format(String),
    Call(LlmError),
}

#[derive(Debug, Deserialize)]
struct RawFacts {
    facts: Vec<RawFact>,
}

#[derive(Debug, Deserialize)]
struct RawFact {
    #[serde(default, alias = "text")]
    fact: String,
    #[serde(default)]
    sources: Option<Vec<RawSource>>,
}

#[derive(Debug, Deserialize)]
struct RawSource {
    #[serde(default)]
    url: String,
}

/// Map normalized URL to the canonical citation for that candidate.
pub fn build_whitelist(candidates: &[SourceCandidate]) -> HashMap<String, FactSource> {
    let mut whitelist = HashMap::new();
    for candidate in candidates {
        let key = normalize_link(&candidate.url);
        if key.is_empty() {
            continue;
        }
        whitelist.entry(key).or_insert_with(|| FactSource {
            title: candidate.title.clone(),
            url: candidate.url.clone(),
        });
    }
    whitelist
}

fn strip_code_fence(raw: &str) -> &str {
    let trimmed = raw.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // Drop the info string (e.g. `json`) on the opening fence line.
    let body = rest.split_once('\n').map_or("", |(_, body)| body);
    body.trim_end().trim_end_matches("```").trim()
}

fn parse_fact_response(raw: &str) -> Result<RawFacts, String> {
    let cleaned = strip_code_fence(raw);
    match serde_json::from_str::<RawFacts>(cleaned) {
        Ok(parsed) => Ok(parsed),
        Err(direct) => {
            // Search the untouched reply: a one-line fence strips to nothing.
            let (Some(start), Some(end)) = (raw.find('{'), raw.rfind('}')) else {
                return Err(direct.to_string());
            };
            if end <= start {
                return Err(direct.to_string());
            }
            serde_json::from_str::<RawFacts>(&raw[start..=end]).map_err(|e| e.to_string())
        }
    }
}

/// Keep only facts with text and at least one whitelisted citation.
fn ground_facts(
    raw: RawFacts,
    whitelist: &HashMap<String, FactSource>,
    fact_count: usize,
) -> Vec<Fact> {
    raw.facts
        .into_iter()
        .filter_map(|raw_fact| {
            let text = raw_fact.fact.trim().to_string();
            if text.is_empty() {
                return None;
            }
            let sources: Vec<FactSource> = raw_fact
                .sources
                .iter()
                .flatten()
                .filter_map(|s| whitelist.get(&normalize_link(&s.url)))
                .unique_by(|s| normalize_link(&s.url))
                .cloned()
                .collect();
            (!sources.is_empty()).then_some(Fact { text, sources })
        })
        .take(fact_count)
        .collect()
}

fn build_prompt(headline: &Headline, evidence: &EvidenceBundle, fact_count: usize) -> String {
    let allowed = evidence
        .source_candidates
        .iter()
        .map(|c| format!("- {} | {}", c.title, c.url))
        .join("\n");
    format!(
        "Headline: {title}\nSource: {source}\nLink: {link}\n\n\
         Return at most {fact_count} facts.\n\n\
         Allowed sources:\n{allowed}\n\n\
         Evidence:\n{evidence}",
        title = headline.title,
        source = headline.source,
        link = headline.link,
        evidence = truncate_chars(&evidence.evidence_text, EVIDENCE_PROMPT_MAX),
    )
}

pub struct FactExtractor<'a, C> {
    llm: Option<&'a C>,
    model: &'a str,
    timeout: Duration,
}

impl<'a, C: AskAsync> FactExtractor<'a, C> {
    pub fn new(llm: Option<&'a C>, model: &'a str, timeout: Duration) -> Self {
        Self {
            llm,
            model,
            timeout,
        }
    }

    async fn attempt(
        &self,
        llm: &C,
        request: &ChatRequest,
        whitelist: &HashMap<String, FactSource>,
        fact_count: usize,
    ) -> Result<Vec<Fact>, AttemptError> {
        let reply = ask_with_timeout(llm, request, self.timeout)
            .await
            .map_err(AttemptError::Call)?;
        let raw = parse_fact_response(&reply).map_err(AttemptError::Format)?;
        Ok(ground_facts(raw, whitelist, fact_count))
    }

    /// Extract up to `fact_count` grounded facts. Never fails; problems come
    /// back as the extraction's warning.
    #[instrument(level = "debug", skip_all, fields(link = %headline.link))]
    pub async fn extract(
        &self,
        headline: &Headline,
        evidence: &EvidenceBundle,
        fact_count: usize,
    ) -> FactExtraction {
        let Some(llm) = self.llm else {
            return FactExtraction::failed(
                "fact extraction skipped: no language-model API key is configured".to_string(),
            );
        };
        if evidence.evidence_text.is_empty() {
            return FactExtraction::failed(
                "fact extraction skipped: no article text or related coverage could be gathered"
                    .to_string(),
            );
        }

        let fact_count = fact_count.clamp(1, MAX_FACT_COUNT);
        let whitelist = build_whitelist(&evidence.source_candidates);
        let request = ChatRequest {
            model: self.model.to_string(),
            temperature: 0.2,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(build_prompt(headline, evidence, fact_count)),
            ],
        };

        let mut last_format_error = String::new();
        for attempt in 1..=MAX_ATTEMPTS {
            match self.attempt(llm, &request, &whitelist, fact_count).await {
                Ok(facts) if facts.is_empty() => {
                    return FactExtraction::failed(
                        "fact extraction found no facts backed by the gathered sources".to_string(),
                    );
                }
                Ok(facts) => {
                    debug!(count = facts.len(), "Extracted grounded facts");
                    return FactExtraction {
                        facts,
                        warning: None,
                    };
                }
                Err(AttemptError::Format(reason)) => {
                    warn!(attempt, reason = %reason, "Fact extraction reply was not valid JSON");
                    last_format_error = reason;
                }
                Err(AttemptError::Call(e)) if e.is_timeout() => {
                    return FactExtraction::failed(format!(
                        "fact extraction timed out after {} ms (raise ENRICH_TIMEOUT_MS to allow longer)",
                        self.timeout.as_millis()
                    ));
                }
                Err(AttemptError::Call(e)) => {
                    return FactExtraction::failed(format!(
                        "fact extraction failed: {}",
                        error_message(&e)
                    ));
                }
            }
        }

        FactExtraction::failed(format!(
            "fact extraction output was not valid JSON after {MAX_ATTEMPTS} attempts: {}",
            error_message(&last_format_error)
        ))
    }
}
