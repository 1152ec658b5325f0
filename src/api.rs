//! Language-model API interaction with per-call timeouts.
//!
//! This module provides a small interface for communicating with an
//! OpenAI-compatible chat completion API.
//!
//! # Architecture
//!
//! - [`AskAsync`]: Core trait defining async LLM interaction
//! - [`OpenAiClient`]: `reqwest` implementation against `/chat/completions`
//! - [`ask_with_timeout`]: Bounds any [`AskAsync`] call; expiry drops the
//!   in-flight request
//!
//! Retries are owned by the callers, which know whether a failure is worth
//! repeating (see [`crate::enrich::facts`]).

use crate::config::LlmSettings;
use crate::error::LlmError;
use reqwest::Client;
use reqwest::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::{debug, instrument, warn};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub temperature: f32,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    content: Option<String>,
}

/// Trait for async LLM interaction.
///
/// Implementors send a chat request and return the first choice's text.
pub trait AskAsync {
    async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Client for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct OpenAiClient {
    http: Client,
    api_key: String,
    base_url: String,
}

impl OpenAiClient {
    pub fn new(http: Client, api_key: &str, base_url: &str) -> Self {
        Self {
            http,
            api_key: api_key.to_string(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Build a client only when a credential is configured.
    pub fn from_settings(http: &Client, settings: &LlmSettings) -> Option<Self> {
        settings
            .api_key
            .as_deref()
            .map(|key| Self::new(http.clone(), key, &settings.base_url))
    }
}

impl AskAsync for OpenAiClient {
    #[instrument(level = "debug", skip_all, fields(model = %request.model))]
    async fn ask(&self, request: &ChatRequest) -> Result<String, LlmError> {
        let url = format!("{}/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
            .header(CONTENT_TYPE, "application/json")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LlmError::Api {
                status: status.as_u16(),
                body,
            });
        }

        let payload: ChatResponse = response.json().await?;
        payload
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or(LlmError::EmptyResponse)
    }
}

/// Run `client.ask` under `timeout`, mapping expiry to [`LlmError::Timeout`].
pub async fn ask_with_timeout<C: AskAsync>(
    client: &C,
    request: &ChatRequest,
    timeout: Duration,
) -> Result<String, LlmError> {
    let t0 = Instant::now();
    let res = match tokio::time::timeout(timeout, client.ask(request)).await {
        Ok(res) => res,
        Err(_) => Err(LlmError::Timeout {
            ms: timeout.as_millis(),
        }),
    };
    let dt = t0.elapsed();

    match &res {
        Ok(_) => debug!(elapsed_ms = dt.as_millis() as u64, "LLM call succeeded"),
        Err(e) => warn!(elapsed_ms = dt.as_millis() as u64, error = %e, "LLM call failed"),
    }
    res
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::ScriptedLlm;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ChatRequest {
        ChatRequest {
            model: "test-model".to_string(),
            temperature: 0.1,
            messages: vec![ChatMessage::system("sys"), ChatMessage::user("hello")],
        }
    }

    #[tokio::test]
    async fn test_openai_client_returns_first_choice() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer sk-test"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{ "message": { "role": "assistant", "content": "artificial intelligence" } }]
            })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Client::new(), "sk-test", &format!("{}/v1/", server.uri()));
        let text = client.ask(&request()).await.expect("should succeed");
        assert_eq!(text, "artificial intelligence");
    }

    #[tokio::test]
    async fn test_openai_client_reports_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Client::new(), "sk-bad", &server.uri());
        match client.ask(&request()).await {
            Err(LlmError::Api { status, body }) => {
                assert_eq!(status, 401);
                assert_eq!(body, "bad key");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_openai_client_empty_choices() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({ "choices": [] })))
            .mount(&server)
            .await;

        let client = OpenAiClient::new(Client::new(), "sk-test", &server.uri());
        assert!(matches!(client.ask(&request()).await, Err(LlmError::EmptyResponse)));
    }

    #[tokio::test]
    async fn test_ask_with_timeout_expires() {
        let llm = ScriptedLlm::new(vec!["late".to_string()]).with_delay(Duration::from_millis(300));
        let err = ask_with_timeout(&llm, &request(), Duration::from_millis(20))
            .await
            .unwrap_err();
        assert!(matches!(err, LlmError::Timeout { ms: 20 }));
    }

    #[test]
    fn test_from_settings_requires_key() {
        let mut settings = LlmSettings {
            api_key: None,
            base_url: "https://api.example/v1".to_string(),
            model: "m".to_string(),
        };
        assert!(OpenAiClient::from_settings(&Client::new(), &settings).is_none());
        settings.api_key = Some("sk".to_string());
        assert!(OpenAiClient::from_settings(&Client::new(), &settings).is_some());
    }
}
