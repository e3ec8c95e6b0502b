//! reqwest-backed page client with SSRF validation.

use async_trait::async_trait;
use reqwest::redirect::Policy;
use std::time::Duration;
use tracing::debug;

use crate::error::{FetchError, FetchResult};
use crate::security::UrlValidator;
use crate::traits::page_client::{PageClient, PageResponse};

const DEFAULT_USER_AGENT: &str =
    "Mozilla/5.0 (compatible; DiscoveryBot/1.0; +https://minnesotadigitalaid.org)";

const MAX_REDIRECTS: usize = 5;

/// Fetches pages over HTTP(S).
///
/// Every URL is validated (including a DNS check) before the request, and
/// every redirect hop is validated before it is followed.
///
/// # Example
///
/// ```rust,ignore
/// use discovery::fetchers::HttpPageClient;
///
/// let client = HttpPageClient::new(Duration::from_secs(15))?;
/// let page = client.get("https://example.com").await?;
/// ```
pub struct HttpPageClient {
    client: reqwest::Client,
    validator: UrlValidator,
    timeout: Duration,
}

impl HttpPageClient {
    /// Create a client with the default validator and user agent.
    pub fn new(timeout: Duration) -> FetchResult<Self> {
        Self::with_validator(timeout, UrlValidator::new(), DEFAULT_USER_AGENT)
    }

    /// Create a client with a custom validator and user agent.
    pub fn with_validator(
        timeout: Duration,
        validator: UrlValidator,
        user_agent: &str,
    ) -> FetchResult<Self> {
        let redirect_validator = validator.clone();
        let policy = Policy::custom(move |attempt| {
            if attempt.previous().len() >= MAX_REDIRECTS {
                attempt.error("too many redirects")
            } else if redirect_validator.validate(attempt.url().as_str()).is_err() {
                attempt.stop()
            } else {
                attempt.follow()
            }
        });

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .user_agent(user_agent)
            .redirect(policy)
            .build()
            .map_err(|e| FetchError::Http(e.to_string()))?;

        Ok(Self {
            client,
            validator,
            timeout,
        })
    }
}

#[async_trait]
impl PageClient for HttpPageClient {
    async fn get(&self, url: &str) -> FetchResult<PageResponse> {
        self.validator.validate_with_dns(url).await?;

        debug!(url = %url, "HTTP fetch starting");
        let response = self
            .client
            .get(url)
            .header("Accept", "text/html,application/xhtml+xml;q=0.9,*/*;q=0.5")
            .header("Accept-Language", "en;q=0.9,*;q=0.5")
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout {
                        url: url.to_string(),
                    }
                } else if e.is_builder() {
                    FetchError::InvalidUrl {
                        url: url.to_string(),
                    }
                } else {
                    FetchError::Http(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        let final_url = response.url().to_string();
        let body = response.text().await.map_err(|e| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: url.to_string(),
                }
            } else {
                FetchError::Http(e.to_string())
            }
        })?;

        debug!(url = %url, status, final_url = %final_url, bytes = body.len(), "HTTP fetch done");
        Ok(PageResponse::new(status, body, final_url))
    }

    fn name(&self) -> &str {
        "http"
    }
}

impl std::fmt::Debug for HttpPageClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpPageClient")
            .field("timeout", &self.timeout)
            .finish()
    }
}
