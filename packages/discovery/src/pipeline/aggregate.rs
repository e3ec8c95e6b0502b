//! Cross-round accumulation and the final report.

use chrono::{DateTime, Utc};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DiscoveryError, Result};
use crate::pipeline::dedup::deduplicate;
use crate::types::candidate::{Candidate, Tier};
use crate::types::report::{DiscoveryReport, ReportEntry, RoundStats};

/// Owns every terminal candidate and the discovered-name list across rounds.
#[derive(Debug, Default)]
pub struct TierAccumulator {
    validated: Vec<Candidate>,
    flagged: Vec<Candidate>,
    rejected: Vec<Candidate>,
    discarded: usize,
    discovered_names: Vec<String>,
    rounds: Vec<RoundStats>,
}

impl TierAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Remember newly admitted identities, in discovery order.
    pub fn note_discovered<'a>(&mut self, candidates: impl IntoIterator<Item = &'a Candidate>) {
        self.discovered_names
            .extend(candidates.into_iter().map(|c| c.name.clone()));
    }

    /// Every identity admitted so far, oldest first.
    pub fn discovered_names(&self) -> &[String] {
        &self.discovered_names
    }

    /// File a settled candidate under its tier.
    pub fn record(&mut self, candidate: Candidate) -> Result<()> {
        match candidate.tier() {
            Tier::Validated => self.validated.push(candidate),
            Tier::Flagged => self.flagged.push(candidate),
            Tier::Rejected => self.rejected.push(candidate),
            Tier::Discarded => self.discarded += 1,
            Tier::Pending => {
                return Err(DiscoveryError::Invariant(format!(
                    "{} reached the aggregator without a tier",
                    candidate.domain_root
                )))
            }
        }
        Ok(())
    }

    pub fn push_round(&mut self, stats: RoundStats) {
        self.rounds.push(stats);
    }

    pub fn rounds_completed(&self) -> usize {
        self.rounds.len()
    }

    pub fn counts(&self) -> (usize, usize, usize, usize) {
        (
            self.validated.len(),
            self.flagged.len(),
            self.rejected.len(),
            self.discarded,
        )
    }

    /// Final dedup across the three tiers combined, then the report.
    ///
    /// Collisions keep the earliest-discovered candidate whatever its tier.
    pub fn finalize(
        self,
        run_id: Uuid,
        started_at: DateTime<Utc>,
        round_budget: usize,
        note: Option<String>,
    ) -> DiscoveryReport {
        let total = self.validated.len() + self.flagged.len() + self.rejected.len();
        let combined: Vec<Candidate> = self
            .validated
            .into_iter()
            .chain(self.flagged)
            .chain(self.rejected)
            .collect();
        let survivors = deduplicate(combined);
        if survivors.len() < total {
            debug!(dropped = total - survivors.len(), "Final dedup dropped cross-tier duplicates");
        }

        let mut validated = Vec::new();
        let mut flagged = Vec::new();
        let mut rejected = Vec::new();
        for candidate in &survivors {
            let entry = ReportEntry::from(candidate);
            match candidate.tier() {
                Tier::Validated => validated.push(entry),
                Tier::Flagged => flagged.push(entry),
                _ => rejected.push(entry),
            }
        }

        let report = DiscoveryReport {
            run_id,
            started_at,
            finished_at: Utc::now(),
            validated,
            flagged,
            rejected,
            discarded_count: self.discarded,
            round_budget,
            rounds_completed: self.rounds.len(),
            rounds: self.rounds,
            note,
        };

        info!(
            run_id = %report.run_id,
            validated = report.validated.len(),
            flagged = report.flagged.len(),
            rejected = report.rejected.len(),
            discarded = report.discarded_count,
            rounds = report.rounds_completed,
            "Discovery report ready"
        );
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::candidate::FlagReason;
    use crate::types::task::{BackendClass, Task};

    fn settled(name: &str, website: &str, round: usize, seq: u64, tier: Tier) -> Candidate {
        let mut c = Candidate::new(
            name,
            website,
            "",
            Task::new("t", BackendClass::WebSearch, round),
            seq,
        );
        c.settle(tier, None).unwrap();
        c
    }

    #[test]
    fn test_record_rejects_pending() {
        let mut acc = TierAccumulator::new();
        let pending = Candidate::new("A", "https://a.com", "", Task::new("t", BackendClass::WebSearch, 1), 0);
        assert!(acc.record(pending).is_err());
    }

    #[test]
    fn test_finalize_splits_tiers() {
        let mut acc = TierAccumulator::new();
        acc.record(settled("A", "https://a.com", 1, 0, Tier::Validated)).unwrap();
        acc.record(settled("B", "https://b.com", 1, 1, Tier::Flagged)).unwrap();
        acc.record(settled("C", "https://c.com", 1, 2, Tier::Rejected)).unwrap();
        acc.record(settled("D", "https://d.com", 1, 3, Tier::Discarded)).unwrap();
        acc.push_round(RoundStats { round: 1, ..Default::default() });

        let report = acc.finalize(Uuid::new_v4(), Utc::now(), 3, None);
        assert_eq!(report.validated.len(), 1);
        assert_eq!(report.flagged.len(), 1);
        assert_eq!(report.flagged[0].flag_reason, Some(FlagReason::JudgeDisagreement));
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.discarded_count, 1);
        assert_eq!(report.rounds_completed, 1);
        assert!(!report.completed_budget());
    }

    #[test]
    fn test_finalize_cross_tier_dedup_keeps_earliest() {
        let mut acc = TierAccumulator::new();
        acc.record(settled("Acme Ltd", "https://acme.com", 2, 9, Tier::Validated)).unwrap();
        acc.record(settled("Acme", "https://www.acme.com/en", 1, 4, Tier::Rejected)).unwrap();

        let report = acc.finalize(Uuid::new_v4(), Utc::now(), 2, None);
        assert!(report.validated.is_empty());
        assert_eq!(report.rejected.len(), 1);
        assert_eq!(report.rejected[0].round_discovered, 1);
    }

    #[test]
    fn test_discovered_names_in_order() {
        let mut acc = TierAccumulator::new();
        let a = settled("A", "https://a.com", 1, 0, Tier::Validated);
        let b = settled("B", "https://b.com", 1, 1, Tier::Rejected);
        acc.note_discovered([&a, &b]);
        assert_eq!(acc.discovered_names(), ["A", "B"]);
    }
}
