//! Discovery pipeline - the core of the library.
//!
//! The pipeline orchestrates, per round:
//! - Query planning across backend classes and countries
//! - Provider fan-out and structured candidate extraction
//! - Pre-filtering of aggregator domains
//! - Identity dedup against every earlier round
//! - Website evidence gathering with a URL variant ladder
//! - Multi-judge consensus and tier assignment

pub mod aggregate;
pub mod consensus;
pub mod controller;
pub mod dedup;
pub mod evidence;
pub mod expand;
pub mod extract;
pub mod judge;
pub mod json;
pub mod normalize;
pub mod planner;
pub mod prefilter;
pub mod prompts;

pub use aggregate::TierAccumulator;
pub use consensus::{decide_tier, ConsensusOutcome, ConsensusValidator};
pub use controller::Discovery;
pub use dedup::{deduplicate, DedupOutcome, Deduplicator, IdentityIndex};
pub use evidence::{url_variants, EvidenceFetcher, FetchAttempt, FetchOutcome, FetchStatus};
pub use expand::{expand_geography, TermExpander};
pub use extract::{parse_candidates, CandidateExtractor, ExtractedCompany};
pub use judge::LlmJudge;
pub use json::parse_json_response;
pub use normalize::{domain_root, normalized_name, normalized_website};
pub use planner::QueryPlanner;
pub use prefilter::{is_non_entity_domain, prefilter};
pub use prompts::{build_task, exclusion_rules, format_extract_prompt, format_judge_prompt};
