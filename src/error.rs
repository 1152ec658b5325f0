//! Error types for each external collaborator and for the pipeline as a whole.
//!
//! Collaborator errors ([`FeedError`], [`LlmError`], [`GenerationError`]) are
//! caught at the smallest enclosing unit and turned into warning strings. Only
//! [`BriefError`] escapes to the caller.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("feed responded with status {0}")]
    Status(u16),

    #[error("XML parse error: {0}")]
    Xml(#[from] quick_xml::Error),
}

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request timed out after {ms} ms")]
    Timeout { ms: u128 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("response contained no message content")]
    EmptyResponse,
}

impl LlmError {
    pub fn is_timeout(&self) -> bool {
        match self {
            LlmError::Timeout { .. } => true,
            LlmError::Http(e) => e.is_timeout(),
            _ => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("generation API error ({status}): {body}")]
    Api { status: u16, body: String },

    #[error("no generationId in response: {0}")]
    MissingId(String),

    #[error("generation failed: {0}")]
    Failed(String),

    #[error("polling timed out: generationId={0}")]
    PollingExhausted(String),
}

#[derive(Debug, Error)]
pub enum BriefError {
    /// Nothing survived the fetch stage, so there is nothing to enrich or assemble.
    #[error("no usable headlines were fetched; check the keyword or RSS sources")]
    NoHeadlines { warnings: Vec<String> },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    #[error(transparent)]
    Generation(#[from] GenerationError),
}
