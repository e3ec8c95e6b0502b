//! Configuration for the discovery pipeline.

use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;
use std::time::Duration;

use crate::error::{DiscoveryError, Result};

/// Configuration for the discovery pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Number of generate→dedupe→validate rounds.
    ///
    /// Requests may override this. Default: 3.
    pub round_budget: usize,

    /// Maximum in-flight network calls per batch.
    ///
    /// Applies to provider fan-out, evidence fetching and extraction calls.
    /// Default: 5.
    pub concurrency: usize,

    /// Upper bound on tasks planned per round. Default: 24.
    pub max_tasks_per_round: usize,

    /// How many already-found names are fed back into later rounds.
    ///
    /// The most recently discovered names win. Default: 40.
    pub max_already_found: usize,

    /// Upper bound on synonymous business phrasings. Default: 4.
    pub max_term_variants: usize,

    /// Timeout per provider call, in seconds. Default: 60.
    pub provider_timeout_secs: u64,

    /// Timeout per website fetch attempt, in seconds. Default: 15.
    pub fetch_timeout_secs: u64,

    /// Sanitized text shorter than this is "insufficient". Default: 200.
    pub min_evidence_chars: usize,

    /// Evidence is truncated to this many characters. Default: 8000.
    pub max_evidence_chars: usize,

    /// Stop once this many consecutive rounds found nothing new.
    ///
    /// `None` always runs the full budget. Default: None.
    pub stop_after_empty_rounds: Option<usize>,

    /// Judge unreachable websites by name instead of discarding them.
    ///
    /// Default: false.
    pub judge_unreachable_by_name: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            round_budget: 3,
            concurrency: 5,
            max_tasks_per_round: 24,
            max_already_found: 40,
            max_term_variants: 4,
            provider_timeout_secs: 60,
            fetch_timeout_secs: 15,
            min_evidence_chars: 200,
            max_evidence_chars: 8000,
            stop_after_empty_rounds: None,
            judge_unreachable_by_name: false,
        }
    }
}

impl DiscoveryConfig {
    /// Create a new config with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Load configuration from environment variables.
    ///
    /// Reads `.env` if present, then any `DISCOVERY_*` overrides. Unset
    /// variables keep their defaults.
    pub fn from_env() -> Result<Self> {
        let _ = dotenvy::dotenv();

        let defaults = Self::default();
        let config = Self {
            round_budget: env_or("DISCOVERY_ROUND_BUDGET", defaults.round_budget)?,
            concurrency: env_or("DISCOVERY_CONCURRENCY", defaults.concurrency)?,
            max_tasks_per_round: env_or(
                "DISCOVERY_MAX_TASKS_PER_ROUND",
                defaults.max_tasks_per_round,
            )?,
            max_already_found: env_or("DISCOVERY_MAX_ALREADY_FOUND", defaults.max_already_found)?,
            max_term_variants: env_or("DISCOVERY_MAX_TERM_VARIANTS", defaults.max_term_variants)?,
            provider_timeout_secs: env_or(
                "DISCOVERY_PROVIDER_TIMEOUT_SECS",
                defaults.provider_timeout_secs,
            )?,
            fetch_timeout_secs: env_or(
                "DISCOVERY_FETCH_TIMEOUT_SECS",
                defaults.fetch_timeout_secs,
            )?,
            min_evidence_chars: env_or(
                "DISCOVERY_MIN_EVIDENCE_CHARS",
                defaults.min_evidence_chars,
            )?,
            max_evidence_chars: env_or(
                "DISCOVERY_MAX_EVIDENCE_CHARS",
                defaults.max_evidence_chars,
            )?,
            stop_after_empty_rounds: match env::var("DISCOVERY_STOP_AFTER_EMPTY_ROUNDS") {
                Ok(raw) => Some(parse_var("DISCOVERY_STOP_AFTER_EMPTY_ROUNDS", &raw)?),
                Err(_) => None,
            },
            judge_unreachable_by_name: env_or(
                "DISCOVERY_JUDGE_UNREACHABLE_BY_NAME",
                defaults.judge_unreachable_by_name,
            )?,
        };

        config.validate()?;
        Ok(config)
    }

    /// Reject values the pipeline cannot run with.
    pub fn validate(&self) -> Result<()> {
        if self.round_budget == 0 {
            return Err(DiscoveryError::Config("round_budget must be > 0".into()));
        }
        if self.concurrency == 0 {
            return Err(DiscoveryError::Config("concurrency must be > 0".into()));
        }
        if self.max_tasks_per_round == 0 {
            return Err(DiscoveryError::Config(
                "max_tasks_per_round must be > 0".into(),
            ));
        }
        if self.max_evidence_chars < self.min_evidence_chars {
            return Err(DiscoveryError::Config(
                "max_evidence_chars must be >= min_evidence_chars".into(),
            ));
        }
        Ok(())
    }

    /// Set the round budget.
    pub fn with_round_budget(mut self, rounds: usize) -> Self {
        self.round_budget = rounds;
        self
    }

    /// Set the per-batch concurrency cap.
    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency;
        self
    }

    /// Set the per-round task cap.
    pub fn with_max_tasks_per_round(mut self, max: usize) -> Self {
        self.max_tasks_per_round = max;
        self
    }

    /// Set the already-found cap.
    pub fn with_max_already_found(mut self, max: usize) -> Self {
        self.max_already_found = max;
        self
    }

    /// Set the minimum evidence length.
    pub fn with_min_evidence_chars(mut self, min: usize) -> Self {
        self.min_evidence_chars = min;
        self
    }

    /// Stop after `rounds` consecutive rounds without new identities.
    pub fn with_early_stop(mut self, rounds: usize) -> Self {
        self.stop_after_empty_rounds = Some(rounds);
        self
    }

    /// Judge unreachable websites by name only.
    pub fn with_judge_unreachable_by_name(mut self, enabled: bool) -> Self {
        self.judge_unreachable_by_name = enabled;
        self
    }

    pub fn provider_timeout(&self) -> Duration {
        Duration::from_secs(self.provider_timeout_secs)
    }

    pub fn fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.fetch_timeout_secs)
    }
}

fn env_or<T: FromStr>(key: &str, default: T) -> Result<T> {
    match env::var(key) {
        Ok(raw) => parse_var(key, &raw),
        Err(_) => Ok(default),
    }
}

fn parse_var<T: FromStr>(key: &str, raw: &str) -> Result<T> {
    raw.trim()
        .parse()
        .map_err(|_| DiscoveryError::Config(format!("{key} has an invalid value: {raw}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_valid() {
        assert!(DiscoveryConfig::default().validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_zero_budget() {
        let config = DiscoveryConfig::new().with_round_budget(0);
        assert!(config.validate().is_err());

        let config = DiscoveryConfig::new().with_concurrency(0);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_inverted_evidence_bounds() {
        let config = DiscoveryConfig::new().with_min_evidence_chars(10_000);
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_parse_var_reports_key() {
        let err = parse_var::<usize>("DISCOVERY_CONCURRENCY", "lots").unwrap_err();
        assert!(err.to_string().contains("DISCOVERY_CONCURRENCY"));
        assert_eq!(parse_var::<usize>("X", " 7 ").unwrap(), 7);
    }

    #[test]
    fn test_timeouts() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.provider_timeout(), Duration::from_secs(60));
        assert_eq!(config.fetch_timeout(), Duration::from_secs(15));
    }
}
