//! Provider backends and the adapters around them.
//!
//! - [`OpenAiProvider`] and [`TavilyProvider`] talk to real services
//! - [`FallbackChain`] tries backends in order with a per-call timeout
//! - [`RateLimitedProvider`] wraps any backend with a quota
//! - [`ProviderRouter`] picks a provider per backend class

pub mod fallback;
pub mod openai;
pub mod rate_limited;
pub mod router;
pub mod settings;
pub mod tavily;

pub use fallback::FallbackChain;
pub use openai::OpenAiProvider;
pub use rate_limited::RateLimitedProvider;
pub use router::ProviderRouter;
pub use settings::ProviderSettings;
pub use tavily::TavilyProvider;
