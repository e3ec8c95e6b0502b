//! HTTP page client used by the evidence fetcher.

use async_trait::async_trait;

use crate::error::FetchResult;

/// A fetched HTTP response, before classification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageResponse {
    pub status: u16,
    pub body: String,

    /// URL after redirects.
    pub final_url: String,
}

impl PageResponse {
    pub fn new(status: u16, body: impl Into<String>, final_url: impl Into<String>) -> Self {
        Self {
            status,
            body: body.into(),
            final_url: final_url.into(),
        }
    }

    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }
}

/// Fetches one URL. Non-2xx statuses are returned as responses, not errors,
/// so the caller can tell a 403 bot wall from a dead host.
#[async_trait]
pub trait PageClient: Send + Sync {
    async fn get(&self, url: &str) -> FetchResult<PageResponse>;

    fn name(&self) -> &str {
        "http"
    }
}
