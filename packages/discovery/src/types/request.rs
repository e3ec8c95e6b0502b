//! Discovery request and the criteria every judge sees.

use serde::{Deserialize, Serialize};

use crate::error::{DiscoveryError, Result};

/// A discovery request as handed over by the intake layer.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveryRequest {
    /// Business-type phrase, e.g. "gravure ink manufacturer".
    pub business_phrase: String,

    /// Single country, region name, or comma-separated list.
    pub country: String,

    /// Free-text exclusion criteria, passed verbatim to every task and judge.
    #[serde(default)]
    pub exclusion: String,

    /// Overrides the configured number of rounds.
    #[serde(default)]
    pub round_budget: Option<usize>,
}

impl DiscoveryRequest {
    /// Create a new request.
    pub fn new(business_phrase: impl Into<String>, country: impl Into<String>) -> Self {
        Self {
            business_phrase: business_phrase.into(),
            country: country.into(),
            exclusion: String::new(),
            round_budget: None,
        }
    }

    /// Set the exclusion text.
    pub fn with_exclusion(mut self, exclusion: impl Into<String>) -> Self {
        self.exclusion = exclusion.into();
        self
    }

    /// Set the round budget.
    pub fn with_round_budget(mut self, rounds: usize) -> Self {
        self.round_budget = Some(rounds);
        self
    }

    /// Reject requests that cannot be planned.
    pub fn validate(&self) -> Result<()> {
        if self.business_phrase.trim().is_empty() {
            return Err(DiscoveryError::InvalidRequest {
                reason: "business phrase is empty".into(),
            });
        }
        if self.country.trim().is_empty() {
            return Err(DiscoveryError::InvalidRequest {
                reason: "country is empty".into(),
            });
        }
        if self.round_budget == Some(0) {
            return Err(DiscoveryError::InvalidRequest {
                reason: "round budget must be at least 1".into(),
            });
        }
        Ok(())
    }
}

/// Criteria shared by the planner and every judge.
///
/// Built once per run after region expansion; immutable afterwards so that all
/// tasks and judges see identical text.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Criteria {
    /// Business phrase as given by the caller.
    pub business: String,

    /// Geography as given by the caller.
    pub geography: String,

    /// Expanded country list.
    pub countries: Vec<String>,

    /// Synonymous phrasings of the business phrase.
    pub term_variants: Vec<String>,

    /// Exclusion text, verbatim.
    pub exclusion: String,
}

impl Criteria {
    /// Countries joined for prompts ("Malaysia, Thailand").
    pub fn country_list(&self) -> String {
        self.countries.join(", ")
    }

    /// Whether the caller supplied any exclusion text.
    pub fn has_exclusion(&self) -> bool {
        !self.exclusion.trim().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_validation() {
        assert!(DiscoveryRequest::new("ink maker", "Malaysia").validate().is_ok());
        assert!(DiscoveryRequest::new("  ", "Malaysia").validate().is_err());
        assert!(DiscoveryRequest::new("ink maker", "").validate().is_err());
        assert!(DiscoveryRequest::new("ink maker", "Malaysia")
            .with_round_budget(0)
            .validate()
            .is_err());
    }

    #[test]
    fn test_request_deserializes_camel_case() {
        let json = r#"{"businessPhrase":"ink","country":"Thailand","exclusion":"MNCs","roundBudget":2}"#;
        let request: DiscoveryRequest = serde_json::from_str(json).unwrap();
        assert_eq!(request.business_phrase, "ink");
        assert_eq!(request.round_budget, Some(2));

        let minimal: DiscoveryRequest =
            serde_json::from_str(r#"{"businessPhrase":"ink","country":"Thailand"}"#).unwrap();
        assert!(minimal.exclusion.is_empty());
        assert_eq!(minimal.round_budget, None);
    }
}
