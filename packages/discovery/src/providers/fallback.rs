//! Ordered fallback over several backends.

use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::{ProviderError, ProviderResult};
use crate::traits::provider::{Provider, SubmitOptions};

/// Tries each backend in order with the same prompt.
///
/// A backend fails over on timeout, API error, transport error or an empty
/// answer. Each call gets its own timeout. When every backend failed the
/// chain returns [`ProviderError::Exhausted`] with each failure in order.
pub struct FallbackChain {
    name: String,
    backends: Vec<Arc<dyn Provider>>,
    timeout: Duration,
}

impl FallbackChain {
    pub fn new(backends: Vec<Arc<dyn Provider>>, timeout: Duration) -> Self {
        let name = backends
            .iter()
            .map(|b| b.name())
            .collect::<Vec<_>>()
            .join(">");
        Self {
            name,
            backends,
            timeout,
        }
    }

    /// Name used in logs (default: backend names joined with `>`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn len(&self) -> usize {
        self.backends.len()
    }

    pub fn is_empty(&self) -> bool {
        self.backends.is_empty()
    }

    async fn try_backend(
        &self,
        backend: &dyn Provider,
        prompt: &str,
        options: &SubmitOptions,
    ) -> ProviderResult<String> {
        match tokio::time::timeout(self.timeout, backend.submit(prompt, options)).await {
            Ok(Ok(text)) if text.trim().is_empty() => Err(ProviderError::EmptyResponse {
                provider: backend.name().to_string(),
            }),
            Ok(result) => result,
            Err(_) => Err(ProviderError::Timeout {
                provider: backend.name().to_string(),
                after: self.timeout,
            }),
        }
    }
}

#[async_trait]
impl Provider for FallbackChain {
    fn name(&self) -> &str {
        &self.name
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String> {
        let mut tried = Vec::new();

        for (idx, backend) in self.backends.iter().enumerate() {
            match self.try_backend(backend.as_ref(), prompt, options).await {
                Ok(text) => {
                    if idx > 0 {
                        debug!(chain = %self.name, provider = backend.name(), attempt = idx + 1, "Fallback backend answered");
                    }
                    return Ok(text);
                }
                Err(e) if e.is_recoverable() => {
                    warn!(chain = %self.name, provider = backend.name(), error = %e, "Backend failed, falling back");
                    tried.push(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::Exhausted { tried })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[tokio::test]
    async fn test_primary_answers() {
        let primary = Arc::new(MockProvider::new("primary").with_default_response("answer"));
        let secondary = Arc::new(MockProvider::new("secondary").with_default_response("other"));
        let chain = FallbackChain::new(
            vec![primary.clone() as Arc<dyn Provider>, secondary.clone()],
            Duration::from_secs(5),
        );

        assert_eq!(chain.submit("q", &SubmitOptions::text()).await.unwrap(), "answer");
        assert_eq!(secondary.call_count(), 0);
        assert_eq!(chain.name(), "primary>secondary");
    }

    #[tokio::test]
    async fn test_falls_back_on_error_and_empty() {
        let failing = Arc::new(MockProvider::new("failing").failing());
        let empty = Arc::new(MockProvider::new("empty").with_default_response("   "));
        let good = Arc::new(MockProvider::new("good").with_default_response("answer"));
        let chain = FallbackChain::new(
            vec![failing.clone() as Arc<dyn Provider>, empty.clone(), good.clone()],
            Duration::from_secs(5),
        );

        assert_eq!(chain.submit("q", &SubmitOptions::text()).await.unwrap(), "answer");
        assert_eq!(failing.calls()[0].prompt, "q");
        assert_eq!(empty.calls()[0].prompt, "q");
        assert_eq!(good.calls()[0].prompt, "q");
    }

    #[tokio::test]
    async fn test_timeout_falls_back() {
        let slow: Arc<dyn Provider> = Arc::new(
            MockProvider::new("slow")
                .with_default_response("late")
                .with_delay(Duration::from_millis(200)),
        );
        let fast: Arc<dyn Provider> = Arc::new(MockProvider::new("fast").with_default_response("on time"));
        let chain = FallbackChain::new(vec![slow, fast], Duration::from_millis(20));

        assert_eq!(chain.submit("q", &SubmitOptions::text()).await.unwrap(), "on time");
    }

    #[tokio::test]
    async fn test_exhausted_carries_every_failure() {
        let chain = FallbackChain::new(
            vec![
                Arc::new(MockProvider::new("a").failing()) as Arc<dyn Provider>,
                Arc::new(MockProvider::new("b").with_default_response("")),
            ],
            Duration::from_secs(5),
        );

        match chain.submit("q", &SubmitOptions::text()).await {
            Err(ProviderError::Exhausted { tried }) => {
                assert_eq!(tried.len(), 2);
                assert!(matches!(tried[1], ProviderError::EmptyResponse { .. }));
            }
            other => panic!("expected Exhausted, got {other:?}"),
        }
    }

    #[test]
    fn test_empty_chain_is_exhausted() {
        let chain = FallbackChain::new(vec![], Duration::from_secs(1));
        assert!(chain.is_empty());
        let result = tokio_test::block_on(chain.submit("q", &SubmitOptions::text()));
        assert!(matches!(result, Err(ProviderError::Exhausted { tried }) if tried.is_empty()));
    }
}
