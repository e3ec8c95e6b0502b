//! Backend credentials with secure memory.
//!
//! API keys live in `secrecy::SecretString` so they never show up in logs,
//! debug output, or error messages.

use secrecy::{ExposeSecret, SecretString};
use std::env;
use std::fmt;

use crate::error::{ProviderError, ProviderResult};

/// Credentials for one OpenAI-compatible or search backend.
#[derive(Clone)]
pub struct BackendCredentials {
    /// API key (secret)
    api_key: SecretString,

    /// Model identifier; empty for search backends.
    pub model: String,

    /// API base URL, without a trailing slash.
    pub base_url: String,
}

impl BackendCredentials {
    pub fn new(
        api_key: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            model: model.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Read the key from `key_var`. A missing or blank key is a config error.
    pub fn from_env(
        key_var: &str,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> ProviderResult<Self> {
        match env::var(key_var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key.trim(), model, base_url)),
            _ => Err(ProviderError::Config(format!("{key_var} not set"))),
        }
    }

    /// Like [`from_env`](Self::from_env), but `None` when the key is unset.
    pub fn optional_from_env(
        key_var: &str,
        model: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Option<Self> {
        Self::from_env(key_var, model, base_url).ok()
    }

    /// Expose the key for an outgoing request header.
    pub fn expose_key(&self) -> &str {
        self.api_key.expose_secret()
    }

    /// `Bearer <key>` header value.
    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.expose_key())
    }
}

impl fmt::Debug for BackendCredentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BackendCredentials")
            .field("api_key", &"[REDACTED]")
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_not_in_debug() {
        let creds = BackendCredentials::new("sk-super-secret-key", "gpt-4o", "https://api.openai.com/v1/");
        let debug = format!("{:?}", creds);
        assert!(!debug.contains("sk-super"));
        assert!(debug.contains("[REDACTED]"));
        assert!(debug.contains("gpt-4o"));
    }

    #[test]
    fn test_base_url_trimmed() {
        let creds = BackendCredentials::new("k", "m", "https://api.example.com/v1/");
        assert_eq!(creds.base_url, "https://api.example.com/v1");
    }

    #[test]
    fn test_bearer_exposes_key() {
        let creds = BackendCredentials::new("sk-test", "m", "https://x");
        assert_eq!(creds.bearer(), "Bearer sk-test");
    }

    #[test]
    fn test_missing_env_key_is_config_error() {
        let err = BackendCredentials::from_env("DISCOVERY_TEST_UNSET_KEY_5F2A", "m", "https://x")
            .unwrap_err();
        assert!(matches!(err, ProviderError::Config(_)));
        assert!(
            BackendCredentials::optional_from_env("DISCOVERY_TEST_UNSET_KEY_5F2A", "m", "https://x")
                .is_none()
        );
    }
}
