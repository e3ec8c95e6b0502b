//! Fuzzy Entity Discovery Library
//!
//! Finds companies that match a free-text business description in a set of
//! countries, then checks each one against its own website before reporting.
//!
//! # Design Philosophy
//!
//! **"Ask many, trust few"**
//!
//! - Fan out across several backends and phrasings to maximize recall
//! - Collapse every way of spelling the same company into one identity
//! - Judge each identity once, on website evidence, by independent judges
//! - Report disagreement instead of hiding it
//!
//! # Usage
//!
//! ```rust,ignore
//! use discovery::{Discovery, DiscoveryRequest};
//!
//! let discovery = Discovery::from_env()?;
//!
//! let request = DiscoveryRequest::new("gravure ink manufacturer", "Southeast Asia")
//!     .with_exclusion("large multinationals");
//! let report = discovery.run(&request).await;
//!
//! println!("{} validated, {} flagged", report.validated.len(), report.flagged.len());
//! ```
//!
//! # Modules
//!
//! - [`traits`] - Seams for backends, judges, HTTP access and report delivery
//! - [`types`] - Requests, candidates, configuration and reports
//! - [`pipeline`] - Planning, extraction, dedup, evidence and consensus
//! - [`providers`] - OpenAI and Tavily backends, fallback chains, rate limiting
//! - [`fetchers`] - SSRF-checked HTTP page client
//! - [`security`] - Credential handling and SSRF protection
//! - [`testing`] - Mock implementations for testing

pub mod error;
pub mod fetchers;
pub mod pipeline;
pub mod providers;
pub mod security;
pub mod testing;
pub mod traits;
pub mod types;

// Re-export core types at crate root
pub use error::{
    DiscoveryError, ExtractError, FetchError, JudgeError, ProviderError, Result, SecurityError,
};
pub use traits::{
    judge::{Judge, JudgeRequest, JudgeVerdict},
    page_client::{PageClient, PageResponse},
    provider::{Provider, SubmitOptions},
    sink::ReportSink,
};
pub use types::{
    candidate::{Candidate, Evidence, FlagReason, Tier, Verdict},
    config::DiscoveryConfig,
    report::{DiscoveryReport, ReportEntry, RoundStats},
    request::{Criteria, DiscoveryRequest},
    task::{BackendClass, Task},
};

// Re-export the pipeline entry point and its stages
pub use pipeline::{
    // Entry point
    Discovery,
    // Identity
    deduplicate, domain_root, normalized_name, normalized_website, Deduplicator,
    // Evidence
    EvidenceFetcher, FetchOutcome, FetchStatus,
    // Consensus
    decide_tier, ConsensusValidator, LlmJudge,
};

// Re-export providers
pub use providers::{
    FallbackChain, OpenAiProvider, ProviderRouter, ProviderSettings, RateLimitedProvider,
    TavilyProvider,
};

pub use fetchers::HttpPageClient;
pub use security::{BackendCredentials, UrlValidator};

// Re-export testing utilities
pub use testing::{MemorySink, MockJudge, MockPageClient, MockProvider};
