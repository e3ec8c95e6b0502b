//! Rate-limited provider wrapper.
//!
//! Wraps any Provider with a governor quota so a burst of fan-out tasks does
//! not trip the backend's own rate limiting.

use async_trait::async_trait;
use governor::{Quota, RateLimiter};
use std::num::NonZeroU32;
use std::sync::Arc;

use crate::error::ProviderResult;
use crate::traits::provider::{Provider, SubmitOptions};

type DefaultRateLimiter = RateLimiter<
    governor::state::NotKeyed,
    governor::state::InMemoryState,
    governor::clock::DefaultClock,
>;

/// A provider wrapper that waits for a permit before every call.
pub struct RateLimitedProvider<P: Provider> {
    inner: P,
    limiter: Arc<DefaultRateLimiter>,
}

impl<P: Provider> RateLimitedProvider<P> {
    /// Allow `requests_per_second` sustained calls.
    pub fn new(provider: P, requests_per_second: NonZeroU32) -> Self {
        Self::with_quota(provider, Quota::per_second(requests_per_second))
    }

    /// Create with a custom quota.
    pub fn with_quota(provider: P, quota: Quota) -> Self {
        Self {
            inner: provider,
            limiter: Arc::new(RateLimiter::direct(quota)),
        }
    }

    /// Sustained rate plus a burst allowance.
    pub fn with_burst(provider: P, requests_per_second: NonZeroU32, burst: NonZeroU32) -> Self {
        Self::with_quota(
            provider,
            Quota::per_second(requests_per_second).allow_burst(burst),
        )
    }

    pub fn inner(&self) -> &P {
        &self.inner
    }
}

#[async_trait]
impl<P: Provider> Provider for RateLimitedProvider<P> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String> {
        self.limiter.until_ready().await;
        self.inner.submit(prompt, options).await
    }
}
