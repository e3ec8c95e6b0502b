//! Consensus validation across independent judges.
//!
//! Tier rules over the judges that answered:
//! - all valid: `Validated`
//! - no valid votes: `Rejected`
//! - more valid than invalid, or an even split: `Flagged`
//! - valid votes in the minority: `Rejected`
//!
//! A judge that errors abstains. When nobody answered, a single-judge panel
//! accepts with a benefit-of-doubt note and a larger panel rejects.

use futures::future::join_all;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::Result;
use crate::traits::judge::{Judge, JudgeRequest};
use crate::types::candidate::{Candidate, Tier, Verdict};
use crate::types::request::Criteria;

/// Note attached when a lone judge could not answer.
pub const BENEFIT_OF_DOUBT: &str = "accepted, benefit of doubt: judge unavailable";

/// Combined result for one candidate.
#[derive(Debug, Clone)]
pub struct ConsensusOutcome {
    pub tier: Tier,

    /// Verdicts of the judges that answered, in panel order.
    pub verdicts: Vec<Verdict>,

    /// First location correction offered by any judge.
    pub corrected_location: Option<String>,

    /// Judges that errored.
    pub abstentions: usize,

    pub benefit_of_doubt: bool,
}

impl ConsensusOutcome {
    /// Record the outcome on the candidate and settle its tier.
    pub fn apply_to(self, candidate: &mut Candidate) -> Result<()> {
        candidate.record_verdicts(self.verdicts)?;
        if let Some(location) = self.corrected_location {
            candidate.correct_location(location);
        }
        if self.benefit_of_doubt {
            candidate.set_note(BENEFIT_OF_DOUBT);
        }
        candidate.settle(self.tier, None)
    }
}

/// Tier for a set of votes; `None` is an abstention.
pub fn decide_tier(votes: &[Option<bool>]) -> Tier {
    let valid = votes.iter().filter(|v| **v == Some(true)).count();
    let invalid = votes.iter().filter(|v| **v == Some(false)).count();

    if valid + invalid == 0 {
        return if votes.len() == 1 {
            Tier::Validated
        } else {
            Tier::Rejected
        };
    }

    if invalid == 0 {
        Tier::Validated
    } else if valid == 0 || valid < invalid {
        Tier::Rejected
    } else {
        Tier::Flagged
    }
}

/// Runs a candidate past every judge in parallel.
#[derive(Clone)]
pub struct ConsensusValidator {
    judges: Vec<Arc<dyn Judge>>,
}

impl ConsensusValidator {
    pub fn new(judges: Vec<Arc<dyn Judge>>) -> Self {
        Self { judges }
    }

    pub fn judge_count(&self) -> usize {
        self.judges.len()
    }

    /// Judge one candidate. `evidence: None` means judge by name only.
    pub async fn validate(
        &self,
        candidate: &Candidate,
        evidence: Option<&str>,
        criteria: &Criteria,
    ) -> ConsensusOutcome {
        let request = JudgeRequest {
            name: &candidate.name,
            website: &candidate.website,
            claimed_location: &candidate.location,
            evidence,
            criteria,
        };

        let results = join_all(self.judges.iter().map(|judge| judge.judge(&request))).await;

        let mut votes = Vec::with_capacity(results.len());
        let mut verdicts = Vec::new();
        let mut corrected_location = None;
        let mut abstentions = 0;

        for (judge, result) in self.judges.iter().zip(results) {
            match result {
                Ok(verdict) => {
                    votes.push(Some(verdict.valid));
                    if corrected_location.is_none() {
                        corrected_location = verdict.corrected_location.clone();
                    }
                    verdicts.push(Verdict::new(judge.id(), verdict.valid, verdict.rationale));
                }
                Err(e) => {
                    warn!(judge = judge.id(), candidate = %candidate.name, error = %e, "Judge abstained");
                    votes.push(None);
                    abstentions += 1;
                }
            }
        }

        let tier = decide_tier(&votes);
        let benefit_of_doubt = verdicts.is_empty() && tier == Tier::Validated;
        debug!(
            candidate = %candidate.name,
            tier = %tier,
            abstentions,
            "Consensus reached"
        );

        ConsensusOutcome {
            tier,
            verdicts,
            corrected_location,
            abstentions,
            benefit_of_doubt,
        }
    }
}
