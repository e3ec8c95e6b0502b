//! Backend settings loaded from the environment.

use std::env;
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};
use crate::pipeline::judge::LlmJudge;
use crate::providers::fallback::FallbackChain;
use crate::providers::openai::{OpenAiProvider, DEFAULT_MODEL, OPENAI_BASE_URL};
use crate::providers::rate_limited::RateLimitedProvider;
use crate::providers::router::ProviderRouter;
use crate::providers::tavily::{TavilyProvider, TAVILY_BASE_URL};
use crate::security::BackendCredentials;
use crate::traits::judge::Judge;
use crate::traits::provider::Provider;
use crate::types::task::BackendClass;

/// Which backends are configured, and how to reach them.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    /// Primary OpenAI backend (required).
    pub openai: BackendCredentials,

    /// Tavily web search (optional).
    pub tavily: Option<BackendCredentials>,

    /// Secondary OpenAI-compatible backend (optional).
    pub fallback: Option<BackendCredentials>,

    /// Per-backend request quota.
    pub requests_per_second: NonZeroU32,
}

impl ProviderSettings {
    /// Load from environment variables.
    ///
    /// - `OPENAI_API_KEY` (required), `OPENAI_MODEL`, `OPENAI_BASE_URL`
    /// - `TAVILY_API_KEY`
    /// - `FALLBACK_API_KEY`, `FALLBACK_BASE_URL`, `FALLBACK_MODEL`
    /// - `DISCOVERY_PROVIDER_RPS` (default: 5)
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let openai = BackendCredentials::from_env(
            "OPENAI_API_KEY",
            env_or("OPENAI_MODEL", DEFAULT_MODEL),
            env_or("OPENAI_BASE_URL", OPENAI_BASE_URL),
        )?;

        let tavily = BackendCredentials::optional_from_env("TAVILY_API_KEY", "", TAVILY_BASE_URL);

        let fallback = match env::var("FALLBACK_BASE_URL") {
            Ok(base_url) if !base_url.trim().is_empty() => Some(BackendCredentials::from_env(
                "FALLBACK_API_KEY",
                env_or("FALLBACK_MODEL", DEFAULT_MODEL),
                base_url.trim(),
            )?),
            _ => None,
        };

        let rps = env_or("DISCOVERY_PROVIDER_RPS", "5");
        let requests_per_second = rps
            .trim()
            .parse::<u32>()
            .ok()
            .and_then(NonZeroU32::new)
            .ok_or_else(|| {
                DiscoveryError::Config(format!("DISCOVERY_PROVIDER_RPS has an invalid value: {rps}"))
            })?;

        Ok(Self {
            openai,
            tavily,
            fallback,
            requests_per_second,
        })
    }

    fn generation_backends(&self) -> Vec<Arc<dyn Provider>> {
        let mut backends: Vec<Arc<dyn Provider>> = vec![Arc::new(RateLimitedProvider::new(
            OpenAiProvider::new(self.openai.clone()),
            self.requests_per_second,
        ))];
        if let Some(fallback) = &self.fallback {
            backends.push(Arc::new(RateLimitedProvider::new(
                OpenAiProvider::new(fallback.clone()).with_name("fallback"),
                self.requests_per_second,
            )));
        }
        backends
    }

    /// Build the router and the judge panel over one set of backends.
    ///
    /// Each backend's rate limiter is created once and shared, so router and
    /// judge traffic to the same backend count against the same quota.
    pub fn build(&self, timeout: Duration) -> (ProviderRouter, Vec<Arc<dyn Judge>>) {
        let generation = self.generation_backends();
        let router = self.router_from(&generation, timeout);
        let judges = judges_from(&generation, timeout);
        (router, judges)
    }

    /// Knowledge-grounded and directory tasks go to the generation chain
    /// (primary, then fallback). Web-search tasks go to Tavily first when it
    /// is configured, then fall back to the generation chain.
    fn router_from(&self, generation: &[Arc<dyn Provider>], timeout: Duration) -> ProviderRouter {
        let default: Arc<dyn Provider> = Arc::new(FallbackChain::new(generation.to_vec(), timeout));

        match &self.tavily {
            Some(tavily) => {
                let mut search: Vec<Arc<dyn Provider>> = vec![Arc::new(RateLimitedProvider::new(
                    TavilyProvider::new(tavily.clone()),
                    self.requests_per_second,
                ))];
                search.extend(generation.iter().cloned());
                ProviderRouter::new(default).with_route(
                    BackendClass::WebSearch,
                    Arc::new(FallbackChain::new(search, timeout)),
                )
            }
            None => ProviderRouter::new(default),
        }
    }
}

/// One judge per generation backend.
///
/// Each judge calls its backend through a single-entry chain so it still gets
/// a timeout, but never borrows another judge's backend.
fn judges_from(generation: &[Arc<dyn Provider>], timeout: Duration) -> Vec<Arc<dyn Judge>> {
    generation
        .iter()
        .map(|backend| {
            let id = format!("judge-{}", backend.name());
            let chain: Arc<dyn Provider> =
                Arc::new(FallbackChain::new(vec![Arc::clone(backend)], timeout));
            Arc::new(LlmJudge::new(id, chain)) as Arc<dyn Judge>
        })
        .collect()
}

fn env_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use crate::traits::judge::JudgeRequest;
    use crate::traits::provider::SubmitOptions;
    use crate::types::request::Criteria;
    use nonzero_ext::nonzero;
    use std::time::Instant;

    fn settings(tavily: bool, fallback: bool) -> ProviderSettings {
        ProviderSettings {
            openai: BackendCredentials::new("sk-test", "gpt-4o", OPENAI_BASE_URL),
            tavily: tavily.then(|| BackendCredentials::new("tvly-test", "", TAVILY_BASE_URL)),
            fallback: fallback
                .then(|| BackendCredentials::new("sk-other", "llama-3", "https://llm.internal/v1")),
            requests_per_second: nonzero!(5u32),
        }
    }

    #[test]
    fn test_router_without_tavily() {
        let (router, _) = settings(false, false).build(Duration::from_secs(60));
        assert_eq!(router.for_class(BackendClass::WebSearch).name(), "openai");
    }

    #[test]
    fn test_router_with_tavily_and_fallback() {
        let (router, _) = settings(true, true).build(Duration::from_secs(60));
        assert_eq!(
            router.for_class(BackendClass::WebSearch).name(),
            "tavily>openai>fallback"
        );
        assert_eq!(
            router.for_class(BackendClass::Directory).name(),
            "openai>fallback"
        );
    }

    #[test]
    fn test_one_judge_per_generation_backend() {
        let (_, judges) = settings(true, true).build(Duration::from_secs(60));
        let ids: Vec<_> = judges.iter().map(|j| j.id().to_string()).collect();
        assert_eq!(ids, vec!["judge-openai", "judge-fallback"]);

        let (_, judges) = settings(false, false).build(Duration::from_secs(60));
        assert_eq!(judges.len(), 1);
    }

    #[tokio::test]
    async fn test_router_and_judges_share_one_limiter() {
        let backend = Arc::new(RateLimitedProvider::with_burst(
            MockProvider::new("openai")
                .with_default_response(r#"{"valid": true, "rationale": "ok"}"#),
            nonzero!(10u32),
            nonzero!(1u32),
        ));
        let generation: Vec<Arc<dyn Provider>> = vec![backend.clone()];
        let timeout = Duration::from_secs(5);
        let router = settings(false, false).router_from(&generation, timeout);
        let judges = judges_from(&generation, timeout);

        let criteria = Criteria {
            business: "gravure ink manufacturer".into(),
            geography: "Malaysia".into(),
            countries: vec!["Malaysia".into()],
            term_variants: vec![],
            exclusion: String::new(),
        };
        let request = JudgeRequest {
            name: "Acme Gravure Ink Sdn Bhd",
            website: "https://acmegravure.com.my/",
            claimed_location: "Klang, Malaysia",
            evidence: None,
            criteria: &criteria,
        };

        let start = Instant::now();
        router
            .for_class(BackendClass::Directory)
            .submit("q", &SubmitOptions::json())
            .await
            .unwrap();
        judges[0].judge(&request).await.unwrap();

        // Burst of one at 10/s: the judge call waits on the router's token.
        assert!(start.elapsed() >= Duration::from_millis(80));
        assert_eq!(backend.inner().call_count(), 2);
    }

    #[test]
    fn test_debug_redacts_keys() {
        let debug = format!("{:?}", settings(true, true));
        assert!(!debug.contains("sk-test"));
        assert!(!debug.contains("tvly-test"));
    }
}
