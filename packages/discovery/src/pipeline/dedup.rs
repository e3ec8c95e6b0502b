//! Deduplication over normalized identity keys.
//!
//! Two candidates collide when any key matches: `normalized_website`,
//! `domain_root`, or a non-empty `normalized_name`. The earliest discovered
//! occurrence (round, then first-seen order) survives.

use std::collections::HashSet;

use crate::types::candidate::Candidate;

/// Set of identity keys seen so far.
#[derive(Debug, Clone, Default)]
pub struct IdentityIndex {
    websites: HashSet<String>,
    roots: HashSet<String>,
    names: HashSet<String>,
    identities: usize,
}

impl IdentityIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Whether any of the candidate's keys is already known.
    pub fn contains(&self, candidate: &Candidate) -> bool {
        (!candidate.normalized_website.is_empty()
            && self.websites.contains(&candidate.normalized_website))
            || (!candidate.domain_root.is_empty() && self.roots.contains(&candidate.domain_root))
            || (!candidate.normalized_name.is_empty()
                && self.names.contains(&candidate.normalized_name))
    }

    /// Record all of the candidate's keys.
    pub fn insert(&mut self, candidate: &Candidate) {
        if !candidate.normalized_website.is_empty() {
            self.websites.insert(candidate.normalized_website.clone());
        }
        if !candidate.domain_root.is_empty() {
            self.roots.insert(candidate.domain_root.clone());
        }
        if !candidate.normalized_name.is_empty() {
            self.names.insert(candidate.normalized_name.clone());
        }
        self.identities += 1;
    }

    /// Number of identities recorded.
    pub fn len(&self) -> usize {
        self.identities
    }

    pub fn is_empty(&self) -> bool {
        self.identities == 0
    }
}

/// Result of one dedup pass.
#[derive(Debug, Default)]
pub struct DedupOutcome {
    /// Survivors, in discovery order.
    pub unique: Vec<Candidate>,

    /// Candidates that collided with an earlier identity.
    pub duplicates: Vec<Candidate>,
}

/// Stateful deduplicator; remembers every identity it has admitted.
#[derive(Debug, Clone, Default)]
pub struct Deduplicator {
    index: IdentityIndex,
}

impl Deduplicator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Admit new candidates, dropping any that collide with each other or with
    /// anything admitted before.
    pub fn admit(&mut self, mut candidates: Vec<Candidate>) -> DedupOutcome {
        candidates.sort_by_key(|c| c.discovery_order());

        let mut outcome = DedupOutcome::default();
        for candidate in candidates {
            if self.index.contains(&candidate) {
                outcome.duplicates.push(candidate);
            } else {
                self.index.insert(&candidate);
                outcome.unique.push(candidate);
            }
        }
        outcome
    }

    /// Whether a candidate would be dropped by [`admit`](Self::admit).
    pub fn is_known(&self, candidate: &Candidate) -> bool {
        self.index.contains(candidate)
    }

    pub fn index(&self) -> &IdentityIndex {
        &self.index
    }
}

/// One-shot dedup of a candidate set.
pub fn deduplicate(candidates: Vec<Candidate>) -> Vec<Candidate> {
    Deduplicator::new().admit(candidates).unique
}
