//! Candidate entities and their lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{DiscoveryError, Result};
use crate::pipeline::normalize::{domain_root, normalized_name, normalized_website};
use crate::types::task::Task;

/// Classification of a candidate.
///
/// `Pending` is the only non-terminal tier; every transition goes from
/// `Pending` to exactly one terminal tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Tier {
    Pending,
    Validated,
    Flagged,
    Rejected,
    Discarded,
}

impl Tier {
    pub fn is_terminal(&self) -> bool {
        !matches!(self, Tier::Pending)
    }
}

impl fmt::Display for Tier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Tier::Pending => "pending",
            Tier::Validated => "validated",
            Tier::Flagged => "flagged",
            Tier::Rejected => "rejected",
            Tier::Discarded => "discarded",
        };
        f.write_str(s)
    }
}

/// Why a candidate ended up in the human-review queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FlagReason {
    /// Judges did not agree.
    JudgeDisagreement,

    /// The website blocked the fetcher (bot wall, WAF, CAPTCHA).
    SecurityBlocked,
}

/// One judge's binary verdict.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Verdict {
    pub judge_id: String,
    pub valid: bool,
    pub rationale: String,
}

impl Verdict {
    pub fn new(judge_id: impl Into<String>, valid: bool, rationale: impl Into<String>) -> Self {
        Self {
            judge_id: judge_id.into(),
            valid,
            rationale: rationale.into(),
        }
    }
}

/// Sanitized website text attached to a candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Evidence {
    /// Sanitized page text (already truncated).
    pub content: String,

    /// URL that actually produced the text (after ladder and redirects).
    pub source_url: String,

    pub fetched_at: DateTime<Utc>,
}

impl Evidence {
    pub fn new(content: impl Into<String>, source_url: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            source_url: source_url.into(),
            fetched_at: Utc::now(),
        }
    }
}

/// A discovered entity moving through the pipeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Candidate {
    /// Raw name as extracted
    pub name: String,
    pub normalized_name: String,

    /// Raw website as extracted (always carries a URI scheme)
    pub website: String,
    pub normalized_website: String,
    pub domain_root: String,

    /// Best-effort "City, Country"
    pub location: String,

    /// Location supplied by a judge; never overwrites `location`.
    pub corrected_location: Option<String>,

    pub round_discovered: usize,

    /// Run-wide first-seen order, used to break ties within a round.
    pub sequence: u64,

    pub source_task: Task,

    evidence: Option<Evidence>,
    verdicts: Vec<Verdict>,
    tier: Tier,
    flag_reason: Option<FlagReason>,
    note: Option<String>,
}

impl Candidate {
    /// Create a pending candidate and derive its dedup keys.
    pub fn new(
        name: impl Into<String>,
        website: impl Into<String>,
        location: impl Into<String>,
        source_task: Task,
        sequence: u64,
    ) -> Self {
        let name = name.into();
        let website = website.into();
        Self {
            normalized_name: normalized_name(&name),
            normalized_website: normalized_website(&website),
            domain_root: domain_root(&website),
            name,
            website,
            location: location.into(),
            corrected_location: None,
            round_discovered: source_task.round(),
            sequence,
            source_task,
            evidence: None,
            verdicts: Vec::new(),
            tier: Tier::Pending,
            flag_reason: None,
            note: None,
        }
    }

    pub fn tier(&self) -> Tier {
        self.tier
    }

    pub fn flag_reason(&self) -> Option<FlagReason> {
        self.flag_reason
    }

    pub fn evidence(&self) -> Option<&Evidence> {
        self.evidence.as_ref()
    }

    pub fn verdicts(&self) -> &[Verdict] {
        &self.verdicts
    }

    /// Fetch or consensus note (e.g. "HTTP 403 from https://...").
    pub fn note(&self) -> Option<&str> {
        self.note.as_deref()
    }

    /// Evidence attached and no terminal tier yet.
    pub fn is_evidence_ready(&self) -> bool {
        self.evidence.is_some() && self.tier == Tier::Pending
    }

    /// Ordering key for "earliest discovered wins".
    pub fn discovery_order(&self) -> (usize, u64) {
        (self.round_discovered, self.sequence)
    }

    /// Attach fetched evidence. Evidence is set at most once.
    pub fn attach_evidence(&mut self, evidence: Evidence) -> Result<()> {
        if self.evidence.is_some() {
            return Err(DiscoveryError::Invariant(format!(
                "evidence already attached to {}",
                self.domain_root
            )));
        }
        if self.tier.is_terminal() {
            return Err(DiscoveryError::Invariant(format!(
                "cannot attach evidence to {} candidate {}",
                self.tier, self.domain_root
            )));
        }
        self.evidence = Some(evidence);
        Ok(())
    }

    /// Record judge verdicts. Only allowed while pending.
    pub fn record_verdicts(&mut self, verdicts: Vec<Verdict>) -> Result<()> {
        if self.tier.is_terminal() {
            return Err(DiscoveryError::Invariant(format!(
                "cannot record verdicts on {} candidate {}",
                self.tier, self.domain_root
            )));
        }
        self.verdicts.extend(verdicts);
        Ok(())
    }

    /// Move to a terminal tier. Tiers only move forward.
    pub fn settle(&mut self, tier: Tier, flag_reason: Option<FlagReason>) -> Result<()> {
        if self.tier.is_terminal() {
            return Err(DiscoveryError::Invariant(format!(
                "{} is already {}, cannot become {}",
                self.domain_root, self.tier, tier
            )));
        }
        if !tier.is_terminal() {
            return Err(DiscoveryError::Invariant(format!(
                "{} cannot settle into pending",
                self.domain_root
            )));
        }
        self.tier = tier;
        self.flag_reason = match tier {
            Tier::Flagged => flag_reason.or(Some(FlagReason::JudgeDisagreement)),
            _ => None,
        };
        Ok(())
    }

    /// Set a note explaining the outcome.
    pub fn set_note(&mut self, note: impl Into<String>) {
        self.note = Some(note.into());
    }

    /// Apply a judge-supplied location. Additive: the claimed location stays.
    pub fn correct_location(&mut self, location: impl Into<String>) {
        let location = location.into();
        let location = location.trim();
        if location.is_empty() || location.eq_ignore_ascii_case(self.location.trim()) {
            return;
        }
        if self.corrected_location.is_none() {
            self.corrected_location = Some(location.to_string());
        }
    }

    /// Rationale for reporting: the note if any, otherwise verdict rationales.
    pub fn rationale(&self) -> Option<String> {
        if let Some(note) = &self.note {
            return Some(note.clone());
        }
        let joined = self
            .verdicts
            .iter()
            .filter(|v| !v.rationale.is_empty())
            .map(|v| format!("[{}] {}", v.judge_id, v.rationale))
            .collect::<Vec<_>>()
            .join(" | ");
        (!joined.is_empty()).then_some(joined)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::task::BackendClass;

    fn candidate() -> Candidate {
        Candidate::new(
            "Acme Gravure Ink Sdn Bhd",
            "http://www.acmegravure.com.my/home",
            "Shah Alam, Malaysia",
            Task::new("find ink makers", BackendClass::WebSearch, 1),
            0,
        )
    }

    #[test]
    fn test_new_derives_keys() {
        let c = candidate();
        assert_eq!(c.normalized_website, "acmegravure.com.my");
        assert_eq!(c.domain_root, "acmegravure.com.my");
        assert_eq!(c.normalized_name, "acme gravure ink");
        assert_eq!(c.round_discovered, 1);
        assert_eq!(c.tier(), Tier::Pending);
    }

    #[test]
    fn test_tier_only_moves_forward() {
        let mut c = candidate();
        c.settle(Tier::Validated, None).unwrap();
        assert!(c.settle(Tier::Rejected, None).is_err());
        assert!(c.settle(Tier::Validated, None).is_err());
        assert_eq!(c.tier(), Tier::Validated);
    }

    #[test]
    fn test_cannot_settle_into_pending() {
        let mut c = candidate();
        assert!(c.settle(Tier::Pending, None).is_err());
    }

    #[test]
    fn test_evidence_set_once() {
        let mut c = candidate();
        c.attach_evidence(Evidence::new("text", "http://acmegravure.com.my"))
            .unwrap();
        assert!(c.is_evidence_ready());
        assert!(c
            .attach_evidence(Evidence::new("other", "http://acmegravure.com.my"))
            .is_err());
        assert_eq!(c.evidence().unwrap().content, "text");
    }

    #[test]
    fn test_flagged_defaults_to_disagreement() {
        let mut c = candidate();
        c.settle(Tier::Flagged, None).unwrap();
        assert_eq!(c.flag_reason(), Some(FlagReason::JudgeDisagreement));

        let mut c = candidate();
        c.settle(Tier::Flagged, Some(FlagReason::SecurityBlocked))
            .unwrap();
        assert_eq!(c.flag_reason(), Some(FlagReason::SecurityBlocked));

        let mut c = candidate();
        c.settle(Tier::Rejected, Some(FlagReason::SecurityBlocked))
            .unwrap();
        assert_eq!(c.flag_reason(), None);
    }

    #[test]
    fn test_location_correction_is_additive() {
        let mut c = candidate();
        c.correct_location("Klang, Malaysia");
        c.correct_location("Ipoh, Malaysia");
        assert_eq!(c.location, "Shah Alam, Malaysia");
        assert_eq!(c.corrected_location.as_deref(), Some("Klang, Malaysia"));
    }

    #[test]
    fn test_rationale_joins_verdicts() {
        let mut c = candidate();
        c.record_verdicts(vec![
            Verdict::new("judge-1", true, "makes gravure ink"),
            Verdict::new("judge-2", true, ""),
        ])
        .unwrap();
        assert_eq!(c.rationale().as_deref(), Some("[judge-1] makes gravure ink"));
    }
}
