//! Chat-completion service access.
//!
//! The wire types mirror the OpenAI chat-completions schema. Every response
//! field is optional here; [`crate::generator`] decides whether a response has
//! the shape it needs.

use crate::error::{Error, Result};
use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

/// Default Azure OpenAI REST API version.
pub const DEFAULT_API_VERSION: &str = "2024-02-01";

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System instructions
    System,
    /// End user
    User,
    /// Model output
    Assistant,
}

/// A role-tagged chat message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    /// Author role
    pub role: Role,
    /// Message text
    pub content: String,
}

impl ChatMessage {
    /// Creates a user message.
    #[must_use]
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// A single-turn chat completion request.
///
/// The deployment selects the model and travels in the URL, not the body.
#[derive(Debug, Clone, Serialize)]
pub struct ChatRequest {
    /// Deployment (model) identifier
    #[serde(skip)]
    pub deployment: String,
    /// Conversation so far
    pub messages: Vec<ChatMessage>,
    /// Sampling temperature
    pub temperature: f32,
    /// Maximum tokens to generate
    pub max_tokens: u32,
}

/// Raw chat completion response.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatResponse {
    /// Generated alternatives
    #[serde(default)]
    pub choices: Vec<ChatChoice>,
    /// Token accounting
    pub usage: Option<ChatUsage>,
}

/// One generated alternative.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoice {
    /// Generated message
    pub message: Option<ChatChoiceMessage>,
    /// Why generation stopped
    pub finish_reason: Option<String>,
}

/// Message inside a choice.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatChoiceMessage {
    /// Generated text; absent when the content filter intervened
    pub content: Option<String>,
}

/// Token usage counters.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatUsage {
    /// Tokens in the prompt
    pub prompt_tokens: Option<u64>,
    /// Tokens generated
    pub completion_tokens: Option<u64>,
    /// Sum of both
    pub total_tokens: Option<u64>,
}

/// A remote chat-completion endpoint.
pub trait CompletionService {
    /// Sends one request and returns the decoded response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the request fails, the service answers with a
    /// non-success status, or the body is not JSON.
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse>;
}

/// Blocking Azure OpenAI chat-completions client.
#[derive(Debug, Clone)]
pub struct AzureOpenAiClient {
    client: Client,
    endpoint: Url,
    api_version: String,
}

impl AzureOpenAiClient {
    /// Creates a client for the resource at `endpoint`.
    ///
    /// # Errors
    ///
    /// Returns an error if the endpoint is not a valid URL, the key is not a
    /// valid header value, or the HTTP client cannot be built.
    pub fn new(
        endpoint: &str,
        api_key: &str,
        api_version: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let endpoint = Url::parse(endpoint).map_err(|e| {
            Error::config(format!("Invalid completion endpoint '{endpoint}': {e}"))
        })?;

        let mut key = HeaderValue::from_str(api_key)
            .map_err(|_| Error::config("Completion API key contains invalid characters"))?;
        key.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert("api-key", key);

        let client = Client::builder()
            .default_headers(headers)
            .timeout(timeout)
            .build()?;

        Ok(Self {
            client,
            endpoint,
            api_version: api_version.into(),
        })
    }

    fn completions_url(&self, deployment: &str) -> Result<Url> {
        let mut url = self.endpoint.clone();
        url.path_segments_mut()
            .map_err(|()| {
                Error::config(format!("Cannot use '{}' as a base URL", self.endpoint))
            })?
            .pop_if_empty()
            .extend(["openai", "deployments", deployment, "chat", "completions"]);
        url.query_pairs_mut()
            .append_pair("api-version", &self.api_version);
        Ok(url)
    }
}

impl CompletionService for AzureOpenAiClient {
    #[instrument(skip(self, request), fields(deployment = %request.deployment), level = "debug")]
    fn complete(&self, request: &ChatRequest) -> Result<ChatResponse> {
        let url = self.completions_url(&request.deployment)?;

        debug!("Sending completion request ({} messages)", request.messages.len());
        let response = self.client.post(url).json(request).send()?;

        let status = response.status();
        let body = response.text()?;

        if !status.is_success() {
            debug!("Completion API error: {} - {}", status, body);
            return Err(match status {
                StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Error::Auth {
                    message: format!("completion service rejected the request ({status}): {body}"),
                },
                _ => Error::Api {
                    status: status.as_u16(),
                    message: body,
                },
            });
        }

        serde_json::from_str(&body).map_err(|e| {
            Error::generation(format!("completion response is not valid JSON: {e}"))
        })
    }
}
