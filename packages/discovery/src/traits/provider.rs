//! Provider trait for text-generation and search backends.
//!
//! Every backend (chat completion, web search, a fallback chain of both) sits
//! behind this single contract, so nothing downstream carries backend-specific
//! logic.

use async_trait::async_trait;
use std::sync::Arc;

use crate::error::ProviderResult;

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SubmitOptions {
    /// Ask the backend for a JSON object response.
    pub json_mode: bool,

    /// System instruction, for backends that support one.
    pub system: Option<String>,
}

impl SubmitOptions {
    /// Plain text options.
    pub fn text() -> Self {
        Self::default()
    }

    /// JSON-mode options.
    pub fn json() -> Self {
        Self {
            json_mode: true,
            system: None,
        }
    }

    /// Set the system instruction.
    pub fn with_system(mut self, system: impl Into<String>) -> Self {
        self.system = Some(system.into());
        self
    }
}

/// A text-generation or search backend.
///
/// Implementations return the raw answer text. Empty answers should be
/// reported as [`ProviderError::EmptyResponse`](crate::error::ProviderError)
/// so the fallback chain can move on.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Short backend name used in logs and errors.
    fn name(&self) -> &str;

    /// Submit a prompt and wait for the answer.
    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String>;
}

#[async_trait]
impl<P: Provider + ?Sized> Provider for Arc<P> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn submit(&self, prompt: &str, options: &SubmitOptions) -> ProviderResult<String> {
        (**self).submit(prompt, options).await
    }
}
