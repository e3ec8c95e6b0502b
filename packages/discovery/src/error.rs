//! Typed errors for the discovery library.
//!
//! Uses `thiserror` for library errors (not `anyhow`) to provide
//! strongly-typed, composable error handling. Almost every error here is
//! recovered inside the pipeline and turned into a benign outcome; only
//! [`DiscoveryError`] ever reaches the caller.

use std::time::Duration;

use thiserror::Error;

/// Errors raised by a provider backend or the fallback chain.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// The backend did not answer within its timeout.
    #[error("{provider} timed out after {after:?}")]
    Timeout { provider: String, after: Duration },

    /// Non-2xx status or an explicit error payload in the response body.
    #[error("{provider} API error (status {status:?}): {message}")]
    Api {
        provider: String,
        status: Option<u16>,
        message: String,
    },

    /// The backend answered but produced no usable text.
    #[error("{provider} returned an empty response")]
    EmptyResponse { provider: String },

    /// Transport-level failure (DNS, TLS, connection reset, body decode).
    #[error("{provider} network error: {message}")]
    Network { provider: String, message: String },

    /// Missing key, bad base URL, or similar setup problem.
    #[error("provider config error: {0}")]
    Config(String),

    /// Every backend in a fallback chain failed.
    #[error("all {} providers failed", .tried.len())]
    Exhausted { tried: Vec<ProviderError> },
}

impl ProviderError {
    /// Whether the fallback chain should try the next backend.
    ///
    /// Configuration errors are local to one backend, so they fall through too.
    pub fn is_recoverable(&self) -> bool {
        !matches!(self, ProviderError::Exhausted { .. })
    }
}

/// Errors turning a backend answer into candidate tuples.
#[derive(Debug, Error)]
pub enum ExtractError {
    /// The structured-output call returned something that is not the tuple list.
    #[error("could not parse extraction response: {0}")]
    Parse(String),

    /// The structured-output call itself failed.
    #[error("extraction call failed: {0}")]
    Provider(#[from] ProviderError),
}

/// Errors for a single evidence fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Security validation failed
    #[error("security error: {0}")]
    Security(#[from] SecurityError),

    /// HTTP request failed
    #[error("HTTP error: {0}")]
    Http(String),

    /// Connection timeout
    #[error("timeout fetching: {url}")]
    Timeout { url: String },

    /// Invalid URL format
    #[error("invalid URL: {url}")]
    InvalidUrl { url: String },
}

/// Security-related errors, primarily for SSRF protection.
#[derive(Debug, Error)]
pub enum SecurityError {
    /// URL scheme not allowed (e.g., file://, ftp://)
    #[error("disallowed URL scheme: {0}")]
    DisallowedScheme(String),

    /// Host is blocked (e.g., localhost, internal IPs)
    #[error("blocked host: {0}")]
    BlockedHost(String),

    /// IP in blocked CIDR range (e.g., 10.0.0.0/8)
    #[error("blocked IP range: {0}")]
    BlockedCidr(String),

    /// URL has no host
    #[error("URL has no host")]
    NoHost,

    /// DNS resolution failed
    #[error("DNS resolution failed: {0}")]
    DnsResolution(String),

    /// URL parsing failed
    #[error("URL parse error: {0}")]
    UrlParse(#[from] url::ParseError),
}

/// Errors from a single judge call.
#[derive(Debug, Error)]
pub enum JudgeError {
    /// The judge's backend failed.
    #[error("judge {judge} provider error: {source}")]
    Provider {
        judge: String,
        #[source]
        source: ProviderError,
    },

    /// The judge answered with something that is not a verdict.
    #[error("judge {judge} returned an unparseable verdict: {message}")]
    Parse { judge: String, message: String },
}

/// Errors that reach the caller of the discovery pipeline.
#[derive(Debug, Error)]
pub enum DiscoveryError {
    /// Configuration error
    #[error("config error: {0}")]
    Config(String),

    /// The request cannot be planned (empty business phrase, no geography).
    #[error("invalid request: {reason}")]
    InvalidRequest { reason: String },

    /// A pipeline invariant was violated inside a round.
    #[error("invariant violated: {0}")]
    Invariant(String),

    /// Provider setup failed
    #[error("provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The reporting collaborator refused the result.
    #[error("report delivery failed: {0}")]
    Delivery(String),
}

/// Result type alias for discovery operations.
pub type Result<T> = std::result::Result<T, DiscoveryError>;

/// Result type alias for provider calls.
pub type ProviderResult<T> = std::result::Result<T, ProviderError>;

/// Result type alias for extraction parsing.
pub type ExtractResult<T> = std::result::Result<T, ExtractError>;

/// Result type alias for fetch attempts.
pub type FetchResult<T> = std::result::Result<T, FetchError>;

/// Result type alias for security operations.
pub type SecurityResult<T> = std::result::Result<T, SecurityError>;

/// Result type alias for judge calls.
pub type JudgeResult<T> = std::result::Result<T, JudgeError>;
