//! Search keyword translation.
//!
//! English feeds cover far more sources than CJK ones, so a keyword with
//! Chinese characters is translated to a short English phrase before the
//! feed search. [`KeywordTranslator::translate`] is total: every failure
//! path searches with the original keyword and explains why in a warning.

use crate::api::{AskAsync, ChatMessage, ChatRequest, ask_with_timeout};
use crate::models::KeywordTranslation;
use crate::normalize::normalize_keyword;
use crate::utils::{collapse_whitespace, contains_cjk, error_message};
use std::time::Duration;
use tracing::{info, instrument, warn};

const SYSTEM_PROMPT: &str = "You translate news search keywords into concise English search phrases. \
Reply with the English phrase only: no quotes, no explanation, no punctuation beyond what the phrase needs.";

const QUOTE_CHARS: &[char] = &[
    '"', '\'', '`', '“', '”', '‘', '’', '「', '」', '『', '』', '《', '》',
];

pub struct KeywordTranslator<'a, C> {
    llm: Option<&'a C>,
    model: &'a str,
    timeout: Duration,
}

/// Strip wrapping quotes/backticks and collapse whitespace in a model reply.
pub fn clean_translation(raw: &str) -> String {
    let first_line = raw.trim().lines().next().unwrap_or("");
    collapse_whitespace(first_line.trim().trim_matches(QUOTE_CHARS))
}

impl<'a, C: AskAsync> KeywordTranslator<'a, C> {
    /// `llm` is `None` when no language-model credential is configured.
    pub fn new(llm: Option<&'a C>, model: &'a str, timeout: Duration) -> Self {
        Self {
            llm,
            model,
            timeout,
        }
    }

    #[instrument(level = "info", skip(self))]
    pub async fn translate(&self, keyword: &str) -> KeywordTranslation {
        let keyword = normalize_keyword(Some(keyword));
        if !contains_cjk(&keyword) {
            return KeywordTranslation::untranslated(&keyword, None);
        }

        let Some(llm) = self.llm else {
            return KeywordTranslation::untranslated(
                &keyword,
                Some(
                    "keyword translation skipped: no language-model API key is configured; searching with the original keyword"
                        .to_string(),
                ),
            );
        };

        let request = ChatRequest {
            model: self.model.to_string(),
            temperature: 0.1,
            messages: vec![
                ChatMessage::system(SYSTEM_PROMPT),
                ChatMessage::user(format!("Keyword: {keyword}")),
            ],
        };

        match ask_with_timeout(llm, &request, self.timeout).await {
            Ok(reply) => {
                let translated = clean_translation(&reply);
                if translated.is_empty() {
                    warn!("Translation reply was empty");
                    KeywordTranslation::untranslated(
                        &keyword,
                        Some(
                            "keyword translation returned nothing; searching with the original keyword"
                                .to_string(),
                        ),
                    )
                } else {
                    info!(%translated, "Translated search keyword");
                    KeywordTranslation::translated(&keyword, &translated)
                }
            }
            Err(e) if e.is_timeout() => KeywordTranslation::untranslated(
                &keyword,
                Some(format!(
                    "keyword translation timed out after {} ms (raise TRANSLATE_TIMEOUT_MS to allow longer); searching with the original keyword",
                    self.timeout.as_millis()
                )),
            ),
            Err(e) => KeywordTranslation::untranslated(
                &keyword,
                Some(format!(
                    "keyword translation failed: {}; searching with the original keyword",
                    error_message(&e)
                )),
            ),
        }
    }
}
