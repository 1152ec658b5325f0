//! Gamma generation API client.
//!
//! A brief is submitted once with [`GenerationApi::create`] and then polled
//! with [`poll_generation`] until Gamma reports it completed or failed. The
//! finished page's `og:image` is scraped as a cover image on a best-effort
//! basis by [`fetch_og_image`].
//!
//! Gamma has moved fields between the top level and `finalResult` across API
//! revisions, so status parsing checks both.

use crate::error::GenerationError;
use crate::normalize::normalize_keyword;
use crate::utils::try_each;
use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use serde::Serialize;
use serde_json::{Value, json};
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

pub const GAMMA_BASE: &str = "https://public-api.gamma.app/v1.0";

const IMAGE_MODEL: &str = "flux-2-pro";

/// Upper bound on each create/poll request.
pub const GAMMA_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

static OG_IMAGE_PROPERTY_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+property=["']og:image["'][^>]*content=["']([^"']+)["']"#)
        .expect("valid og:image regex")
});
static OG_IMAGE_CONTENT_FIRST: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?i)<meta[^>]+content=["']([^"']+)["'][^>]*property=["']og:image["']"#)
        .expect("valid og:image regex")
});

/// Snapshot of one generation job.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationStatus {
    /// `pending`, `processing`, `completed`, or `failed`.
    pub status: String,
    pub progress: u8,
    pub gamma_url: Option<String>,
    pub pdf_url: Option<String>,
    pub error: Option<String>,
}

fn string_at(payload: &Value, pointer: &str) -> Option<String> {
    payload
        .pointer(pointer)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn pdf_url_in(payload: &Value) -> Option<String> {
    try_each(
        payload,
        &[
            |p: &Value| string_at(p, "/file_url"),
            |p: &Value| string_at(p, "/pdfUrl"),
            |p: &Value| string_at(p, "/fileUrl"),
            |p: &Value| string_at(p, "/exportUrl"),
            |p: &Value| string_at(p, "/downloadUrl"),
            |p: &Value| string_at(p, "/files/pdf"),
            |p: &Value| string_at(p, "/files/pdfUrl"),
            |p: &Value| string_at(p, "/exports/pdf"),
            |p: &Value| string_at(p, "/exports/pdfUrl"),
            |p: &Value| string_at(p, "/exports/pdf/url"),
        ],
    )
}

/// PDF export URL from the top level, then from `finalResult`.
pub fn extract_pdf_url(payload: &Value) -> Option<String> {
    try_each(
        payload,
        &[pdf_url_in, |p: &Value| p.get("finalResult").and_then(pdf_url_in)],
    )
}

fn top_or_final(payload: &Value, key: &str) -> Option<String> {
    string_at(payload, &format!("/{key}"))
        .or_else(|| string_at(payload, &format!("/finalResult/{key}")))
}

impl GenerationStatus {
    pub fn from_payload(payload: &Value) -> Self {
        let status = top_or_final(payload, "status").unwrap_or_else(|| "processing".to_string());
        let gamma_url = top_or_final(payload, "gammaUrl").or_else(|| top_or_final(payload, "url"));
        let progress = payload
            .get("progress")
            .filter(|v| !v.is_null())
            .or_else(|| payload.pointer("/finalResult/progress"))
            .and_then(Value::as_f64)
            .map(|p| p.round().clamp(0.0, 100.0) as u8)
            .unwrap_or(if status == "completed" { 100 } else { 50 });
        let error = payload
            .get("error")
            .filter(|v| !v.is_null())
            .or_else(|| payload.pointer("/finalResult/error"))
            .and_then(|v| match v {
                Value::Null => None,
                Value::String(s) => Some(s.clone()),
                other => other
                    .get("message")
                    .and_then(Value::as_str)
                    .map(str::to_string)
                    .or_else(|| Some(other.to_string())),
            });

        Self {
            status,
            progress,
            gamma_url,
            pdf_url: extract_pdf_url(payload),
            error,
        }
    }

    pub fn is_completed(&self) -> bool {
        self.status == "completed"
    }

    pub fn is_failed(&self) -> bool {
        self.status == "failed"
    }
}

/// Create/poll interface of the generation service.
pub trait GenerationApi {
    /// Submit a brief and return its generation id.
    async fn create(&self, input_text: &str, keyword: &str) -> Result<String, GenerationError>;

    async fn get(&self, generation_id: &str) -> Result<GenerationStatus, GenerationError>;
}

/// Request body for a social-card brief with a PDF export.
pub fn creation_payload(input_text: &str, keyword: &str) -> Value {
    let keyword = normalize_keyword(Some(keyword));
    json!({
        "inputText": input_text,
        "exportAs": "pdf",
        "textMode": "preserve",
        "format": "social",
        "cardOptions": { "dimensions": "4x5" },
        "cardSplit": "inputTextBreaks",
        "sharingOptions": { "externalAccess": "view" },
        "imageOptions": {
            "source": "aiGenerated",
            "model": IMAGE_MODEL,
            "style": "editorial news illustration, clean modern, tech-focused, high contrast",
        },
        "additionalInstructions": format!(
            "Output all content in Simplified Chinese. Organize the brief around this topic keyword: {keyword}. \
             Create region/country-focused social cards in a clean news style with a 4:5 layout. \
             Every single news card must include exactly one explanatory image. \
             Use the provided image URL as the real image whenever available; if missing or invalid, \
             generate one relevant AI image using {IMAGE_MODEL}. Keep each card short and scannable."
        ),
    })
}

#[derive(Debug, Clone)]
pub struct GammaClient {
    http: Client,
    api_key: String,
    base_url: String,
    request_timeout: Duration,
}

impl GammaClient {
    pub fn new(http: Client, api_key: &str) -> Self {
        Self::with_base_url(http, api_key, GAMMA_BASE)
    }

    pub fn with_base_url(http: Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
            request_timeout: GAMMA_REQUEST_TIMEOUT,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, GenerationError> {
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(GenerationError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.json().await?)
    }
}

impl GenerationApi for GammaClient {
    #[instrument(level = "info", skip_all, fields(chars = input_text.chars().count()))]
    async fn create(&self, input_text: &str, keyword: &str) -> Result<String, GenerationError> {
        let response = self
            .http
            .post(format!("{}/generations", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .header(ACCEPT, "application/json")
            .json(&creation_payload(input_text, keyword))
            .timeout(self.request_timeout)
            .send()
            .await?;
        let payload = Self::read_json(response).await?;

        match string_at(&payload, "/generationId") {
            Some(id) => {
                info!(generation_id = %id, "Created generation");
                Ok(id)
            }
            None => Err(GenerationError::MissingId(payload.to_string())),
        }
    }

    #[instrument(level = "debug", skip(self))]
    async fn get(&self, generation_id: &str) -> Result<GenerationStatus, GenerationError> {
        let response = self
            .http
            .get(format!("{}/generations/{generation_id}", self.base_url))
            .header("X-API-KEY", &self.api_key)
            .header(ACCEPT, "application/json")
            .timeout(self.request_timeout)
            .send()
            .await?;
        let payload = Self::read_json(response).await?;
        Ok(GenerationStatus::from_payload(&payload))
    }
}

/// Poll until the generation completes with a URL, fails, or `max_tries` runs out.
///
/// # Errors
///
/// [`GenerationError::Failed`] when Gamma reports failure,
/// [`GenerationError::PollingExhausted`] when tries run out, and any
/// transport or API error from a poll.
#[instrument(level = "info", skip(api))]
pub async fn poll_generation<G: GenerationApi>(
    api: &G,
    generation_id: &str,
    interval: Duration,
    max_tries: usize,
) -> Result<GenerationStatus, GenerationError> {
    for attempt in 1..=max_tries.max(1) {
        let status = api.get(generation_id).await?;
        debug!(attempt, status = %status.status, progress = status.progress, "Polled generation");

        if status.is_completed() && status.gamma_url.is_some() {
            info!(url = ?status.gamma_url, "Generation completed");
            return Ok(status);
        }
        if status.is_failed() {
            let reason = status.error.unwrap_or_else(|| "unknown error".to_string());
            warn!(%reason, "Generation failed");
            return Err(GenerationError::Failed(reason));
        }
        tokio::time::sleep(interval).await;
    }
    Err(GenerationError::PollingExhausted(generation_id.to_string()))
}

fn og_image_property_first(html: &str) -> Option<String> {
    OG_IMAGE_PROPERTY_FIRST
        .captures(html)
        .map(|c| c[1].to_string())
}

fn og_image_content_first(html: &str) -> Option<String> {
    OG_IMAGE_CONTENT_FIRST
        .captures(html)
        .map(|c| c[1].to_string())
}

/// `og:image` of an HTML document, with the attributes in either order.
pub fn extract_og_image(html: &str) -> Option<String> {
    try_each(html, &[og_image_property_first, og_image_content_first])
}

/// Best-effort cover image of the finished page. Any failure, including
/// running past `timeout`, is `None`.
pub async fn fetch_og_image(http: &Client, url: &str, timeout: Duration) -> Option<String> {
    let fetch = async {
        let response = http.get(url).header(ACCEPT, "text/html").send().await?;
        response.error_for_status()?.text().await
    };
    match tokio::time::timeout(timeout, fetch).await {
        Ok(Ok(html)) => extract_og_image(&html),
        Ok(Err(e)) => {
            debug!(%url, error = %e, "Cover image page fetch failed");
            None
        }
        Err(_) => {
            debug!(%url, timeout_ms = timeout.as_millis() as u64, "Cover image page fetch timed out");
            None
        }
    }
}
