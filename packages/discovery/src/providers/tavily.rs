//! Tavily web-search backend.
//!
//! Search results are rendered to plain text so the extractor can treat them
//! like any other backend answer.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{ProviderError, ProviderResult};
use crate::security::BackendCredentials;
use crate::traits::provider::{Provider, SubmitOptions};

/// Default Tavily API base URL.
pub const TAVILY_BASE_URL: &str = "https://api.tavily.com";

/// Tavily rejects longer queries.
const MAX_QUERY_CHARS: usize = 400;

/// Tavily search request.
#[derive(Debug, Serialize)]
struct TavilyRequest<'a> {
    query: &'a str,
    search_depth: &'a str,
    max_results: usize,
    include_answer: bool,
}

/// Tavily search response.
#[derive(Debug, Deserialize)]
struct TavilyResponse {
    #[serde(default)]
    answer: Option<String>,
    #[serde(default)]
    results: Vec<TavilyResult>,
}

/// A single Tavily search result.
#[derive(Debug, Deserialize)]
struct TavilyResult {
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    content: String,
}

/// Web search via Tavily.
pub struct TavilyProvider {
    client: reqwest::Client,
    credentials: BackendCredentials,
    search_depth: String,
    max_results: usize,
}

impl TavilyProvider {
    pub fn new(credentials: BackendCredentials) -> Self {
        Self {
            client: reqwest::Client::new(),
            credentials,
            search_depth: "advanced".to_string(),
            max_results: 10,
        }
    }

    /// Set search depth ("basic" or "advanced").
    pub fn with_search_depth(mut self, depth: impl Into<String>) -> Self {
        self.search_depth = depth.into();
        self
    }

    /// Results per query (default: 10).
    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }
}

#[async_trait]
impl Provider for TavilyProvider {
    fn name(&self) -> &str {
        "tavily"
    }

    async fn submit(&self, prompt: &str, _options: &SubmitOptions) -> ProviderResult<String> {
        let query = search_query(prompt);
        debug!(query = %query, "Tavily search");

        let request = TavilyRequest {
            query: &query,
            search_depth: &self.search_depth,
            max_results: self.max_results,
            include_answer: true,
        };

        let response = self
            .client
            .post(format!("{}/search", self.credentials.base_url))
            .header("Content-Type", "application/json")
            .header("Authorization", self.credentials.bearer())
            .json(&request)
            .send()
            .await
            .map_err(|e| ProviderError::Network {
                provider: "tavily".into(),
                message: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Api {
                provider: "tavily".into(),
                status: Some(status.as_u16()),
                message,
            });
        }

        let parsed: TavilyResponse = response.json().await.map_err(|e| ProviderError::Api {
            provider: "tavily".into(),
            status: Some(status.as_u16()),
            message: format!("unreadable response: {e}"),
        })?;

        render_results(&parsed).ok_or_else(|| ProviderError::EmptyResponse {
            provider: "tavily".into(),
        })
    }
}

/// The first paragraph of a task, capped to Tavily's query length.
fn search_query(prompt: &str) -> String {
    let first = prompt.trim().split("\n\n").next().unwrap_or_default().trim();
    first.chars().take(MAX_QUERY_CHARS).collect()
}

fn render_results(response: &TavilyResponse) -> Option<String> {
    let mut text = String::new();
    if let Some(answer) = response.answer.as_deref().filter(|a| !a.trim().is_empty()) {
        text.push_str("Summary: ");
        text.push_str(answer.trim());
        text.push_str("\n\n");
    }
    for (idx, result) in response.results.iter().enumerate() {
        text.push_str(&format!(
            "{}. {}\n{}\n{}\n\n",
            idx + 1,
            result.title.trim(),
            result.url,
            result.content.trim()
        ));
    }
    let text = text.trim().to_string();
    (!text.is_empty()).then_some(text)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_search_query_uses_first_paragraph() {
        let prompt = "List gravure ink companies in Malaysia.\n\nFor each company give its name.";
        assert_eq!(search_query(prompt), "List gravure ink companies in Malaysia.");

        let long = "x".repeat(1000);
        assert_eq!(search_query(&long).len(), MAX_QUERY_CHARS);
    }

    #[test]
    fn test_render_results() {
        let response: TavilyResponse = serde_json::from_str(
            r#"{"answer":"Two makers found.","results":[{"url":"https://acme.com","title":"Acme Inks","content":"Gravure inks since 1990","score":0.9}]}"#,
        )
        .unwrap();
        let text = render_results(&response).unwrap();
        assert!(text.starts_with("Summary: Two makers found."));
        assert!(text.contains("1. Acme Inks\nhttps://acme.com\nGravure inks since 1990"));
    }

    #[test]
    fn test_render_empty_is_none() {
        let response: TavilyResponse = serde_json::from_str(r#"{"results":[]}"#).unwrap();
        assert!(render_results(&response).is_none());
    }

    #[tokio::test]
    #[ignore]
    async fn test_tavily_search() {
        let creds = BackendCredentials::from_env("TAVILY_API_KEY", "", TAVILY_BASE_URL).unwrap();
        let provider = TavilyProvider::new(creds);
        let text = provider
            .submit("gravure ink manufacturers in Malaysia", &SubmitOptions::text())
            .await
            .unwrap();
        assert!(!text.is_empty());
    }
}
