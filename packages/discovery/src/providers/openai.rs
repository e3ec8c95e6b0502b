//! OpenAI-compatible chat completions backend.
//!
//! Works against any server speaking the `/chat/completions` protocol
//! (OpenAI, Azure proxies, OpenRouter, local gateways).
//!
//! # Example
//!
//! ```rust,ignore
//! use discovery::providers::OpenAiProvider;
//! use discovery::security::BackendCredentials;
//!
//! let creds = BackendCredentials::new("sk-...", "gpt-4o", "https://api.openai.com/v1");
//! let provider = OpenAiProvider::new(creds);
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::security::BackendCredentials;
use crate::traits::provider::{Provider, SubmitOptions};

/// Default OpenAI API base URL.
pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Default chat model.
pub const DEFAULT_MODEL: &str = "gpt-4o";

/// Chat-completions provider.
#[derive(Clone)]
pub struct OpenAiProvider {
    name: String,
    client: Client,
    credentials: BackendCredentials,
    temperature: f32,
    max_tokens: u32,
}

impl OpenAiProvider {
    pub fn new(credentials: BackendCredentials) -> Self {
        Self {
            name: "openai".to_string(),
            client: Client::new(),
            credentials,
            temperature: 0.0,
            max_tokens: 4096,
        }
    }

    /// Name used in logs and errors (default: "openai").
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set a custom HTTP client.
    pub fn with_client(mut self, client: Client) -> Self {
        self.client = client;
        self
    }

    /// Sampling temperature (default: 0.0).
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    /// Completion token cap (default: 4096).
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn model(&self) -> &str {
        &self.credentials.model
    }

    fn request<'a>(&'a self, prompt: &'a str, options: &'a SubmitOptions) -> ChatRequest<'a> {
        let mut messages = Vec::with_capacity(2);
        if let Some(system) = options.system.as_deref() {
            messages.push(ChatMessage {
                role: "system",
                content: system,
            });
        }
        messages.push(ChatMessage {
            role: "user",
            content: prompt,
        });

        ChatRequest {
            model: &self.credentials.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
            response_format: options.json_mode.then_some(ResponseFormat {
                format_type: "json_object",
            }),
        }
    }

    fn network_error(&self, error: reqwest::Error) -> ProviderError {
        ProviderError::Network {
            provider: self.name.clone(),
            message: error.to_string(),
        }
    }
}

#[async_trait]
impl Provider for OpenAiProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String> {
        debug!(provider = %self.name, model = %self.credentials.model, json_mode = options.json_mode, "Chat completion request");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.credentials.base_url))
            .header("Authorization", self.credentials.bearer())
            .header("Content-Type", "application/json")
            .json(&self.request(prompt, options))
            .send()
            .await
            .map_err(|e| self.network_error(e))?;

        let status = response.status();
        let body = response.text().await.map_err(|e| self.network_error(e))?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorEnvelope>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err(ProviderError::Api {
                provider: self.name.clone(),
                status: Some(status.as_u16()),
                message,
            });
        }

        parse_chat_response(&self.name, &body)
    }
}

/// Pull the answer text out of a 2xx body.
///
/// Some gateways report errors with a 200 status and an `error` object, so
/// that is checked before the choices.
fn parse_chat_response(provider: &str, body: &str) -> ProviderResult<String> {
    let parsed: ChatResponse = serde_json::from_str(body).map_err(|e| ProviderError::Api {
        provider: provider.to_string(),
        status: None,
        message: format!("unreadable response: {e}"),
    })?;

    if let Some(error) = parsed.error {
        return Err(ProviderError::Api {
            provider: provider.to_string(),
            status: None,
            message: error.message,
        });
    }

    parsed
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| ProviderError::EmptyResponse {
            provider: provider.to_string(),
        })
}

// Request/Response types

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    message: String,
}
