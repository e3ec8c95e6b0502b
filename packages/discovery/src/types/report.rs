//! Result types handed to the reporting collaborator.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::candidate::{Candidate, FlagReason};

/// One entry in a result list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReportEntry {
    pub name: String,
    pub website: String,
    pub location: String,

    /// Location supplied by a judge, when it differs from the claimed one.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub corrected_location: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub rationale: Option<String>,

    /// Set for flagged entries only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub flag_reason: Option<FlagReason>,

    pub round_discovered: usize,
}

impl From<&Candidate> for ReportEntry {
    fn from(candidate: &Candidate) -> Self {
        Self {
            name: candidate.name.clone(),
            website: candidate.website.clone(),
            location: candidate.location.clone(),
            corrected_location: candidate.corrected_location.clone(),
            rationale: candidate.rationale(),
            flag_reason: candidate.flag_reason(),
            round_discovered: candidate.round_discovered,
        }
    }
}

/// Per-round counters, for logs and the report.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoundStats {
    pub round: usize,
    pub tasks: usize,
    pub failed_tasks: usize,
    pub extracted: usize,
    pub prefiltered: usize,
    pub duplicates: usize,
    pub new_identities: usize,
    pub validated: usize,
    pub flagged: usize,
    pub rejected: usize,
    pub discarded: usize,
}

/// The final result of one discovery run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryReport {
    pub run_id: Uuid,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    pub validated: Vec<ReportEntry>,
    pub flagged: Vec<ReportEntry>,
    pub rejected: Vec<ReportEntry>,

    /// Candidates dropped because their website was unreachable.
    pub discarded_count: usize,

    pub round_budget: usize,
    pub rounds_completed: usize,
    pub rounds: Vec<RoundStats>,

    /// Explains an incomplete run or an early stop.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl DiscoveryReport {
    /// Whether every planned round ran.
    pub fn completed_budget(&self) -> bool {
        self.rounds_completed >= self.round_budget
    }

    /// Total number of entries across the three lists.
    pub fn total(&self) -> usize {
        self.validated.len() + self.flagged.len() + self.rejected.len()
    }

    /// Flagged entries that were blocked by the website rather than the judges.
    pub fn security_blocked(&self) -> impl Iterator<Item = &ReportEntry> {
        self.flagged
            .iter()
            .filter(|e| e.flag_reason == Some(FlagReason::SecurityBlocked))
    }
}
