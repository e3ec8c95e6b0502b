//! Testing utilities including mock implementations.
//!
//! These are useful for testing applications that use the discovery library
//! without making real provider, HTTP or judge calls.

use async_trait::async_trait;
use indexmap::IndexMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use crate::error::{
    DiscoveryError, FetchError, FetchResult, JudgeError, JudgeResult, ProviderError,
    ProviderResult, Result,
};
use crate::traits::judge::{Judge, JudgeRequest, JudgeVerdict};
use crate::traits::page_client::{PageClient, PageResponse};
use crate::traits::provider::{Provider, SubmitOptions};
use crate::traits::sink::ReportSink;
use crate::types::report::DiscoveryReport;

/// Record of a call made to a [`MockProvider`].
#[derive(Debug, Clone)]
pub struct ProviderCall {
    pub prompt: String,
    pub json_mode: bool,
}

/// A mock provider for testing.
///
/// Answers are scripted by prompt substring; the first matching rule wins.
/// Prompts matching no rule get the default response, or an empty-response
/// error when there is none.
#[derive(Clone)]
pub struct MockProvider {
    name: String,

    /// Scripted answers by prompt substring, in insertion order
    responses: Arc<RwLock<IndexMap<String, String>>>,

    /// Prompt substrings that produce an API error
    failures: Arc<RwLock<Vec<String>>>,

    default_response: Option<String>,
    always_fail: bool,
    delay: Option<Duration>,

    /// Call tracking for assertions
    calls: Arc<RwLock<Vec<ProviderCall>>>,
}

impl MockProvider {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            responses: Arc::default(),
            failures: Arc::default(),
            default_response: None,
            always_fail: false,
            delay: None,
            calls: Arc::default(),
        }
    }

    /// Answer prompts containing `needle` with `response`.
    pub fn with_response(self, needle: impl Into<String>, response: impl Into<String>) -> Self {
        self.responses
            .write()
            .unwrap()
            .insert(needle.into(), response.into());
        self
    }

    /// Answer unmatched prompts with `response`.
    pub fn with_default_response(mut self, response: impl Into<String>) -> Self {
        self.default_response = Some(response.into());
        self
    }

    /// Fail prompts containing `needle`.
    pub fn failing_on(self, needle: impl Into<String>) -> Self {
        self.failures.write().unwrap().push(needle.into());
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Sleep before answering.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Get all calls made to this mock.
    pub fn calls(&self) -> Vec<ProviderCall> {
        self.calls.read().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }

    /// Number of calls whose prompt contained `needle`.
    pub fn calls_containing(&self, needle: &str) -> usize {
        self.calls
            .read()
            .unwrap()
            .iter()
            .filter(|c| c.prompt.contains(needle))
            .count()
    }

    /// Clear call history.
    pub fn clear_calls(&self) {
        self.calls.write().unwrap().clear();
    }

    fn mock_error(&self) -> ProviderError {
        ProviderError::Api {
            provider: self.name.clone(),
            status: Some(500),
            message: "mock failure".into(),
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String> {
        self.calls.write().unwrap().push(ProviderCall {
            prompt: prompt.to_string(),
            json_mode: options.json_mode,
        });

        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }

        if self.always_fail
            || self
                .failures
                .read()
                .unwrap()
                .iter()
                .any(|needle| prompt.contains(needle.as_str()))
        {
            return Err(self.mock_error());
        }

        let scripted = self
            .responses
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| prompt.contains(needle.as_str()))
            .map(|(_, response)| response.clone());

        scripted
            .or_else(|| self.default_response.clone())
            .ok_or_else(|| ProviderError::EmptyResponse {
                provider: self.name.clone(),
            })
    }
}

/// A mock page client for testing.
///
/// Pages are keyed by exact URL. Unknown URLs fail like a refused
/// connection, unless a fallback page is set.
#[derive(Clone, Default)]
pub struct MockPageClient {
    pages: Arc<RwLock<IndexMap<String, PageResponse>>>,
    fallback: Option<(u16, String)>,
    fetched: Arc<RwLock<Vec<String>>>,
}

impl MockPageClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `body` with `status` at `url`.
    pub fn with_page(self, url: impl Into<String>, status: u16, body: impl Into<String>) -> Self {
        let url = url.into();
        let response = PageResponse::new(status, body, url.clone());
        self.pages.write().unwrap().insert(url, response);
        self
    }

    /// Serve `body` at `url` as if redirected to `final_url`.
    pub fn with_redirect(
        self,
        url: impl Into<String>,
        final_url: impl Into<String>,
        body: impl Into<String>,
    ) -> Self {
        let response = PageResponse::new(200, body, final_url);
        self.pages.write().unwrap().insert(url.into(), response);
        self
    }

    /// Serve this for every URL without its own page.
    pub fn with_fallback_page(mut self, status: u16, body: impl Into<String>) -> Self {
        self.fallback = Some((status, body.into()));
        self
    }

    /// Every URL requested, in order.
    pub fn fetched(&self) -> Vec<String> {
        self.fetched.read().unwrap().clone()
    }

    /// Number of requests whose URL contained `needle`.
    pub fn fetch_count(&self, needle: &str) -> usize {
        self.fetched
            .read()
            .unwrap()
            .iter()
            .filter(|u| u.contains(needle))
            .count()
    }
}

#[async_trait]
impl PageClient for MockPageClient {
    async fn get(&self, url: &str) -> FetchResult<PageResponse> {
        self.fetched.write().unwrap().push(url.to_string());

        if let Some(page) = self.pages.read().unwrap().get(url) {
            return Ok(page.clone());
        }
        match &self.fallback {
            Some((status, body)) => Ok(PageResponse::new(*status, body.clone(), url)),
            None => Err(FetchError::Http(format!("connection refused: {url}"))),
        }
    }

    fn name(&self) -> &str {
        "mock"
    }
}

/// A mock judge for testing.
///
/// Verdicts are scripted by candidate-name substring, with an optional
/// default.
#[derive(Clone)]
pub struct MockJudge {
    id: String,
    verdicts: Arc<RwLock<IndexMap<String, JudgeVerdict>>>,
    default: Option<JudgeVerdict>,
    always_fail: bool,

    /// Candidate names judged, with whether evidence was supplied
    calls: Arc<RwLock<Vec<(String, bool)>>>,
}

impl MockJudge {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            verdicts: Arc::default(),
            default: None,
            always_fail: false,
            calls: Arc::default(),
        }
    }

    /// Verdict for candidates whose name contains `needle`.
    pub fn with_verdict(self, needle: impl Into<String>, verdict: JudgeVerdict) -> Self {
        self.verdicts.write().unwrap().insert(needle.into(), verdict);
        self
    }

    /// Verdict for every other candidate.
    pub fn with_default(mut self, verdict: JudgeVerdict) -> Self {
        self.default = Some(verdict);
        self
    }

    /// Fail every call.
    pub fn failing(mut self) -> Self {
        self.always_fail = true;
        self
    }

    /// Names judged, in call order.
    pub fn judged(&self) -> Vec<String> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .map(|(name, _)| name.clone())
            .collect()
    }

    /// Whether the last call for `name` carried evidence.
    pub fn saw_evidence_for(&self, name: &str) -> Option<bool> {
        self.calls
            .read()
            .unwrap()
            .iter()
            .rev()
            .find(|(n, _)| n == name)
            .map(|(_, evidence)| *evidence)
    }

    pub fn call_count(&self) -> usize {
        self.calls.read().unwrap().len()
    }
}

#[async_trait]
impl Judge for MockJudge {
    fn id(&self) -> &str {
        &self.id
    }

    async fn judge(&self, request: &JudgeRequest<'_>) -> JudgeResult<JudgeVerdict> {
        self.calls
            .write()
            .unwrap()
            .push((request.name.to_string(), request.evidence.is_some()));

        if self.always_fail {
            return Err(JudgeError::Provider {
                judge: self.id.clone(),
                source: ProviderError::Timeout {
                    provider: "mock".into(),
                    after: Duration::from_secs(60),
                },
            });
        }

        let scripted = self
            .verdicts
            .read()
            .unwrap()
            .iter()
            .find(|(needle, _)| request.name.contains(needle.as_str()))
            .map(|(_, verdict)| verdict.clone());

        scripted
            .or_else(|| self.default.clone())
            .ok_or_else(|| JudgeError::Parse {
                judge: self.id.clone(),
                message: format!("no scripted verdict for {}", request.name),
            })
    }
}

/// In-memory report sink.
#[derive(Clone, Default)]
pub struct MemorySink {
    reports: Arc<RwLock<Vec<DiscoveryReport>>>,
    reject: bool,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Refuse every delivery.
    pub fn rejecting() -> Self {
        Self {
            reject: true,
            ..Self::default()
        }
    }

    pub fn reports(&self) -> Vec<DiscoveryReport> {
        self.reports.read().unwrap().clone()
    }

    pub fn last(&self) -> Option<DiscoveryReport> {
        self.reports.read().unwrap().last().cloned()
    }
}

#[async_trait]
impl ReportSink for MemorySink {
    async fn deliver(&self, report: &DiscoveryReport) -> Result<()> {
        if self.reject {
            return Err(DiscoveryError::Delivery("sink is rejecting reports".into()));
        }
        self.reports.write().unwrap().push(report.clone());
        Ok(())
    }
}
