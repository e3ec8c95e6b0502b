//! Query planning - one round's worth of differently-angled tasks.

use crate::pipeline::prompts::{
    build_task, fill_phrasing, BROAD_PHRASINGS, COUNTRY_PHRASINGS, VARIANT_PHRASINGS,
};
use crate::types::request::Criteria;
use crate::types::task::{BackendClass, Task};

/// Plans tasks per round.
///
/// Every round gets:
/// - broad phrasings over the whole country list, for web search and
///   knowledge-grounded backends
/// - one directory-style phrasing per country
/// - one knowledge-grounded phrasing per term variant
///
/// Templates rotate with the round number so later rounds ask differently.
#[derive(Debug, Clone)]
pub struct QueryPlanner {
    max_tasks: usize,
    max_already_found: usize,
}

impl QueryPlanner {
    pub fn new(max_tasks: usize, max_already_found: usize) -> Self {
        Self {
            max_tasks,
            max_already_found,
        }
    }

    /// Plan the tasks for `round` (1-based).
    ///
    /// `already_found` is in discovery order; only the most recent
    /// `max_already_found` names are fed back.
    pub fn plan_round(
        &self,
        criteria: &Criteria,
        round: usize,
        already_found: &[String],
    ) -> Vec<Task> {
        let recent = recent_names(already_found, self.max_already_found);
        let mut tasks = Vec::new();

        let mut push = |phrasing: String, backend: BackendClass| {
            tasks.push(Task::new(
                build_task(&phrasing, criteria, round, recent),
                backend,
                round,
            ));
        };

        for (idx, backend) in [BackendClass::WebSearch, BackendClass::KnowledgeGrounded]
            .into_iter()
            .enumerate()
        {
            for offset in 0..2 {
                let template = rotate(BROAD_PHRASINGS, round + idx * 2 + offset);
                push(fill_phrasing(template, criteria, "", ""), backend);
            }
        }

        for (idx, country) in criteria.countries.iter().enumerate() {
            let template = rotate(COUNTRY_PHRASINGS, round + idx);
            push(
                fill_phrasing(template, criteria, country, ""),
                BackendClass::Directory,
            );
        }

        for (idx, term) in criteria.term_variants.iter().enumerate() {
            let template = rotate(VARIANT_PHRASINGS, round + idx);
            push(
                fill_phrasing(template, criteria, "", term),
                BackendClass::KnowledgeGrounded,
            );
        }

        tasks.truncate(self.max_tasks);
        tasks
    }
}

fn rotate<'a>(templates: &[&'a str], n: usize) -> &'a str {
    templates[n % templates.len()]
}

fn recent_names(names: &[String], cap: usize) -> &[String] {
    &names[names.len().saturating_sub(cap)..]
}

#[cfg(test)]
mod tests {
    use super::*;

    fn criteria() -> Criteria {
        Criteria {
            business: "gravure ink manufacturer".into(),
            geography: "Malaysia,Thailand".into(),
            countries: vec!["Malaysia".into(), "Thailand".into()],
            term_variants: vec!["rotogravure ink maker".into()],
            exclusion: "large multinationals".into(),
        }
    }

    #[test]
    fn test_plan_covers_all_backend_classes() {
        let tasks = QueryPlanner::new(24, 40).plan_round(&criteria(), 1, &[]);
        // 4 broad + 2 countries + 1 variant
        assert_eq!(tasks.len(), 7);
        assert!(tasks.iter().any(|t| t.backend() == BackendClass::WebSearch));
        assert!(tasks.iter().any(|t| t.backend() == BackendClass::Directory));
        assert!(tasks
            .iter()
            .any(|t| t.backend() == BackendClass::KnowledgeGrounded && t.text().contains("rotogravure")));
        assert!(tasks.iter().all(|t| t.round() == 1));
    }

    #[test]
    fn test_every_task_carries_exclusion() {
        let tasks = QueryPlanner::new(24, 40).plan_round(&criteria(), 2, &["Acme".into()]);
        assert!(tasks
            .iter()
            .all(|t| t.text().contains("Exclude: large multinationals")));
        assert!(tasks.iter().all(|t| t.text().contains("Already found: Acme")));
    }

    #[test]
    fn test_plan_is_bounded() {
        let tasks = QueryPlanner::new(3, 40).plan_round(&criteria(), 1, &[]);
        assert_eq!(tasks.len(), 3);
    }

    #[test]
    fn test_already_found_keeps_most_recent() {
        let found: Vec<String> = (0..10).map(|i| format!("Company {i}")).collect();
        let tasks = QueryPlanner::new(24, 3).plan_round(&criteria(), 2, &found);
        let text = tasks[0].text();
        assert!(text.contains("Already found: Company 7, Company 8, Company 9."));
        assert!(!text.contains("Company 6"));
    }

    #[test]
    fn test_wording_varies_by_round() {
        let planner = QueryPlanner::new(24, 40);
        let first = planner.plan_round(&criteria(), 1, &[]);
        let second = planner.plan_round(&criteria(), 2, &[]);
        assert_ne!(first[0].text(), second[0].text());
    }
}
