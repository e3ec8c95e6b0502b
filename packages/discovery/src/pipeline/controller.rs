//! Discovery - main entry point and iteration controller.
//!
//! Each round is a strict barrier:
//!
//! ```text
//! plan → provider fan-out → extract → pre-filter → dedup vs. all prior rounds
//!      → evidence → consensus → accumulate
//! ```
//!
//! Round N+1 is planned only after round N has been accumulated. Identities
//! seen in an earlier round are skipped entirely: no re-fetch, no re-judge.

use chrono::Utc;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{DiscoveryError, Result};
use crate::fetchers::HttpPageClient;
use crate::pipeline::aggregate::TierAccumulator;
use crate::pipeline::consensus::ConsensusValidator;
use crate::pipeline::dedup::Deduplicator;
use crate::pipeline::evidence::{EvidenceFetcher, FetchStatus};
use crate::pipeline::expand::TermExpander;
use crate::pipeline::extract::{into_candidates, CandidateExtractor};
use crate::pipeline::planner::QueryPlanner;
use crate::pipeline::prefilter::prefilter;
use crate::providers::{ProviderRouter, ProviderSettings};
use crate::traits::judge::Judge;
use crate::traits::page_client::PageClient;
use crate::traits::provider::SubmitOptions;
use crate::traits::sink::ReportSink;
use crate::types::candidate::{Candidate, Evidence, FlagReason, Tier};
use crate::types::config::DiscoveryConfig;
use crate::types::report::{DiscoveryReport, RoundStats};
use crate::types::request::{Criteria, DiscoveryRequest};

/// The discovery pipeline.
///
/// # Example
///
/// ```rust,ignore
/// let discovery = Discovery::from_env()?;
///
/// let request = DiscoveryRequest::new("gravure ink manufacturer", "Malaysia,Thailand")
///     .with_exclusion("large multinationals");
/// let report = discovery.run(&request).await;
///
/// for entry in &report.validated {
///     println!("{} {}", entry.name, entry.website);
/// }
/// ```
pub struct Discovery {
    router: ProviderRouter,
    expander: TermExpander,
    extractor: CandidateExtractor,
    fetcher: EvidenceFetcher,
    validator: ConsensusValidator,
    config: DiscoveryConfig,
}

impl Discovery {
    /// Create a pipeline with the default configuration.
    pub fn new(
        router: ProviderRouter,
        page_client: Arc<dyn PageClient>,
        judges: Vec<Arc<dyn Judge>>,
    ) -> Result<Self> {
        Self::with_config(router, page_client, judges, DiscoveryConfig::default())
    }

    /// Create with custom configuration.
    pub fn with_config(
        router: ProviderRouter,
        page_client: Arc<dyn PageClient>,
        judges: Vec<Arc<dyn Judge>>,
        config: DiscoveryConfig,
    ) -> Result<Self> {
        config.validate()?;
        if judges.is_empty() {
            return Err(DiscoveryError::Config(
                "at least one judge is required".into(),
            ));
        }

        Ok(Self {
            expander: TermExpander::new(router.default_provider(), config.max_term_variants),
            extractor: CandidateExtractor::new(router.default_provider()),
            fetcher: EvidenceFetcher::from_config(page_client, &config),
            validator: ConsensusValidator::new(judges),
            router,
            config,
        })
    }

    /// Build everything from environment variables.
    ///
    /// See [`DiscoveryConfig::from_env`] and [`ProviderSettings::from_env`].
    pub fn from_env() -> Result<Self> {
        let config = DiscoveryConfig::from_env()?;
        let settings = ProviderSettings::from_env()?;

        let (router, judges) = settings.build(config.provider_timeout());
        let page_client = HttpPageClient::new(config.fetch_timeout())
            .map_err(|e| DiscoveryError::Config(format!("HTTP client: {e}")))?;

        Self::with_config(router, Arc::new(page_client), judges, config)
    }

    /// Get a reference to the configuration.
    pub fn config(&self) -> &DiscoveryConfig {
        &self.config
    }

    /// Run discovery and hand the report to a sink.
    ///
    /// A failed delivery is logged and noted on the returned report, so the
    /// finished results are never lost.
    pub async fn run_and_deliver(
        &self,
        request: &DiscoveryRequest,
        sink: &dyn ReportSink,
    ) -> DiscoveryReport {
        let mut report = self.run(request).await;
        if let Err(e) = sink.deliver(&report).await {
            warn!(run_id = %report.run_id, error = %e, "Report delivery failed");
            let failure = e.to_string();
            report.note = Some(match report.note.take() {
                Some(note) => format!("{note}; {failure}"),
                None => failure,
            });
        }
        report
    }

    /// Run every round and return the aggregated report.
    ///
    /// Never fails: an invalid request or a broken round barrier produces a
    /// (possibly partial) report with a note explaining what happened.
    pub async fn run(&self, request: &DiscoveryRequest) -> DiscoveryReport {
        let run_id = Uuid::now_v7();
        let started_at = Utc::now();
        let budget = request.round_budget.unwrap_or(self.config.round_budget);
        let mut accumulator = TierAccumulator::new();

        if let Err(e) = request.validate() {
            warn!(run_id = %run_id, error = %e, "Rejecting discovery request");
            return accumulator.finalize(run_id, started_at, budget, Some(e.to_string()));
        }

        info!(
            run_id = %run_id,
            business = %request.business_phrase,
            geography = %request.country,
            rounds = budget,
            "Discovery run starting"
        );

        let criteria = self.expander.expand(request).await;
        if criteria.countries.is_empty() {
            let note = format!("no countries found in geography {:?}", request.country);
            return accumulator.finalize(run_id, started_at, budget, Some(note));
        }
        debug!(
            countries = ?criteria.countries,
            variants = ?criteria.term_variants,
            "Criteria expanded"
        );

        let planner = QueryPlanner::new(
            self.config.max_tasks_per_round,
            self.config.max_already_found,
        );
        let mut dedup = Deduplicator::new();
        let mut sequence = 0u64;
        let mut empty_streak = 0usize;
        let mut note = None;

        for round in 1..=budget {
            let result = self
                .run_round(
                    round,
                    &criteria,
                    &planner,
                    &mut dedup,
                    &mut accumulator,
                    &mut sequence,
                )
                .await;

            let stats = match result {
                Ok(stats) => stats,
                Err(e) => {
                    warn!(run_id = %run_id, round, error = %e, "Round failed, delivering partial results");
                    note = Some(format!(
                        "run did not complete its round budget: round {round} of {budget} failed: {e}"
                    ));
                    break;
                }
            };

            let found_nothing = stats.new_identities == 0;
            accumulator.push_round(stats);

            empty_streak = if found_nothing { empty_streak + 1 } else { 0 };
            if let Some(limit) = self.config.stop_after_empty_rounds {
                if limit > 0 && empty_streak >= limit && round < budget {
                    info!(run_id = %run_id, round, empty_streak, "Stopping early, no new companies");
                    note = Some(format!(
                        "stopped after round {round} of {budget}: {empty_streak} consecutive rounds found no new companies"
                    ));
                    break;
                }
            }
        }

        accumulator.finalize(run_id, started_at, budget, note)
    }

    async fn run_round(
        &self,
        round: usize,
        criteria: &Criteria,
        planner: &QueryPlanner,
        dedup: &mut Deduplicator,
        accumulator: &mut TierAccumulator,
        sequence: &mut u64,
    ) -> Result<RoundStats> {
        let concurrency = self.config.concurrency;
        let tasks = planner.plan_round(criteria, round, accumulator.discovered_names());
        let mut stats = RoundStats {
            round,
            tasks: tasks.len(),
            ..Default::default()
        };
        info!(round, tasks = tasks.len(), "Round starting");

        // Provider fan-out. `buffered` keeps task order, which fixes
        // first-seen order for dedup.
        let answers: Vec<_> = stream::iter(tasks)
            .map(|task| async move {
                let provider = self.router.for_class(task.backend());
                let result = provider.submit(task.text(), &SubmitOptions::text()).await;
                (task, result)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut answered = Vec::with_capacity(answers.len());
        for (task, result) in answers {
            match result {
                Ok(answer) => answered.push((task, answer)),
                Err(e) => {
                    warn!(round, backend = %task.backend(), error = %e, "Task failed, no candidates");
                    stats.failed_tasks += 1;
                }
            }
        }

        let extracted: Vec<_> = stream::iter(answered)
            .map(|(task, answer)| async move {
                let companies = self.extractor.extract(&answer).await;
                (task, companies)
            })
            .buffered(concurrency)
            .collect()
            .await;

        let mut candidates = Vec::new();
        for (task, companies) in extracted {
            candidates.extend(into_candidates(companies, &task, sequence));
        }
        stats.extracted = candidates.len();

        let (kept, dropped) = prefilter(candidates);
        stats.prefiltered = dropped.len();
        for candidate in &dropped {
            debug!(name = %candidate.name, domain = %candidate.domain_root, "Pre-filtered non-entity domain");
        }

        let admitted = dedup.admit(kept);
        stats.duplicates = admitted.duplicates.len();
        stats.new_identities = admitted.unique.len();
        accumulator.note_discovered(&admitted.unique);
        debug!(
            round,
            new = stats.new_identities,
            duplicates = stats.duplicates,
            "Dedup complete"
        );

        let settled: Vec<Result<Candidate>> = stream::iter(admitted.unique)
            .map(|candidate| self.settle_candidate(candidate, criteria))
            .buffered(concurrency)
            .collect()
            .await;

        record_settled(settled, accumulator, &mut stats);

        info!(
            round,
            tasks = stats.tasks,
            failed_tasks = stats.failed_tasks,
            extracted = stats.extracted,
            new = stats.new_identities,
            validated = stats.validated,
            flagged = stats.flagged,
            rejected = stats.rejected,
            discarded = stats.discarded,
            "Round complete"
        );
        Ok(stats)
    }

    /// Evidence, then consensus, for one new identity.
    async fn settle_candidate(
        &self,
        mut candidate: Candidate,
        criteria: &Criteria,
    ) -> Result<Candidate> {
        let fetched = self.fetcher.fetch(&candidate.website).await;

        match fetched.status {
            FetchStatus::Ok => {
                let content = fetched.content.unwrap_or_default();
                let source = fetched
                    .final_url
                    .unwrap_or_else(|| candidate.website.clone());
                candidate.attach_evidence(Evidence::new(content, source))?;
            }
            FetchStatus::SecurityBlocked => {
                let reason = fetched.reason.unwrap_or_else(|| "blocked".into());
                candidate.set_note(format!("website security-blocked: {reason}"));
                candidate.settle(Tier::Flagged, Some(FlagReason::SecurityBlocked))?;
                return Ok(candidate);
            }
            FetchStatus::Insufficient | FetchStatus::Inaccessible => {
                if !self.config.judge_unreachable_by_name {
                    let reason = fetched.reason.unwrap_or_else(|| "unreachable".into());
                    candidate.set_note(format!("website inaccessible: {reason}"));
                    candidate.settle(Tier::Discarded, None)?;
                    return Ok(candidate);
                }
                debug!(name = %candidate.name, "Website unreachable, judging by name");
            }
        }

        let evidence = candidate.evidence().map(|e| e.content.as_str());
        let outcome = self.validator.validate(&candidate, evidence, criteria).await;
        outcome.apply_to(&mut candidate)?;
        Ok(candidate)
    }
}

/// File settled candidates and count them by tier.
///
/// A candidate that broke a lifecycle invariant is logged and skipped; its
/// siblings in the round are still recorded.
fn record_settled(
    settled: Vec<Result<Candidate>>,
    accumulator: &mut TierAccumulator,
    stats: &mut RoundStats,
) {
    for result in settled {
        let candidate = match result {
            Ok(candidate) => candidate,
            Err(e) => {
                warn!(round = stats.round, error = %e, "Skipping candidate after invariant error");
                continue;
            }
        };
        let tier = candidate.tier();
        let domain = candidate.domain_root.clone();
        if let Err(e) = accumulator.record(candidate) {
            warn!(round = stats.round, domain = %domain, error = %e, "Skipping unrecordable candidate");
            continue;
        }
        match tier {
            Tier::Validated => stats.validated += 1,
            Tier::Flagged => stats.flagged += 1,
            Tier::Rejected => stats.rejected += 1,
            Tier::Discarded => stats.discarded += 1,
            Tier::Pending => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::task::{BackendClass, Task};

    fn candidate(name: &str, website: &str, seq: u64, tier: Option<Tier>) -> Candidate {
        let mut c = Candidate::new(
            name,
            website,
            "Klang, Malaysia",
            Task::new("t", BackendClass::WebSearch, 1),
            seq,
        );
        if let Some(tier) = tier {
            c.settle(tier, None).unwrap();
        }
        c
    }

    #[test]
    fn test_record_settled_skips_only_broken_candidates() {
        let mut accumulator = TierAccumulator::new();
        let mut stats = RoundStats {
            round: 1,
            ..Default::default()
        };

        record_settled(
            vec![
                Ok(candidate("Acme", "https://acme.com", 0, Some(Tier::Validated))),
                Err(DiscoveryError::Invariant("beta.com is already rejected".into())),
                Ok(candidate("Gamma", "https://gamma.co.th", 2, None)),
                Ok(candidate("Delta", "https://delta.com.my", 3, Some(Tier::Flagged))),
                Ok(candidate("Eta", "https://eta.com.sg", 4, Some(Tier::Rejected))),
            ],
            &mut accumulator,
            &mut stats,
        );

        assert_eq!(accumulator.counts(), (1, 1, 1, 0));
        assert_eq!(stats.validated, 1);
        assert_eq!(stats.flagged, 1);
        assert_eq!(stats.rejected, 1);
        assert_eq!(stats.discarded, 0);
    }
}
