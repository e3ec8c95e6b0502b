//! Region and term expansion.
//!
//! Geography strings become an explicit country list via a fixed region
//! table. Business phrases gain a small bounded set of synonymous phrasings
//! from a provider; that call is allowed to fail.

use std::sync::Arc;
use tracing::{debug, warn};

use crate::pipeline::json::parse_json_response;
use crate::pipeline::prompts::format_term_variants_prompt;
use crate::traits::provider::{Provider, SubmitOptions};
use crate::types::request::{Criteria, DiscoveryRequest};

/// Region aliases and the countries they cover.
const REGIONS: &[(&[&str], &[&str])] = &[
    (
        &["southeast asia", "south east asia", "asean", "sea"],
        &[
            "Malaysia",
            "Thailand",
            "Indonesia",
            "Vietnam",
            "Philippines",
            "Singapore",
            "Myanmar",
            "Cambodia",
            "Laos",
            "Brunei",
        ],
    ),
    (
        &["east asia"],
        &["China", "Japan", "South Korea", "Taiwan", "Hong Kong", "Mongolia"],
    ),
    (
        &["south asia"],
        &["India", "Pakistan", "Bangladesh", "Sri Lanka", "Nepal"],
    ),
    (
        &["gcc", "gulf"],
        &[
            "Saudi Arabia",
            "United Arab Emirates",
            "Qatar",
            "Kuwait",
            "Oman",
            "Bahrain",
        ],
    ),
    (
        &["middle east", "mena"],
        &[
            "Saudi Arabia",
            "United Arab Emirates",
            "Qatar",
            "Kuwait",
            "Oman",
            "Bahrain",
            "Israel",
            "Jordan",
            "Egypt",
            "Turkey",
        ],
    ),
    (
        &["europe", "eu", "european union"],
        &[
            "Germany",
            "France",
            "Italy",
            "Spain",
            "Netherlands",
            "Belgium",
            "Poland",
            "Austria",
            "Sweden",
            "Denmark",
            "Czech Republic",
            "Portugal",
            "Ireland",
            "Finland",
        ],
    ),
    (
        &["nordics", "nordic", "scandinavia"],
        &["Sweden", "Norway", "Denmark", "Finland", "Iceland"],
    ),
    (&["benelux"], &["Belgium", "Netherlands", "Luxembourg"]),
    (&["dach"], &["Germany", "Austria", "Switzerland"]),
    (
        &["north america"],
        &["United States", "Canada", "Mexico"],
    ),
    (
        &["latin america", "latam", "south america"],
        &[
            "Brazil",
            "Mexico",
            "Argentina",
            "Chile",
            "Colombia",
            "Peru",
        ],
    ),
    (
        &["oceania", "anz", "australasia"],
        &["Australia", "New Zealand"],
    ),
    (
        &["apac", "asia pacific", "asia-pacific"],
        &[
            "Australia",
            "China",
            "Japan",
            "South Korea",
            "India",
            "Singapore",
            "Malaysia",
            "Thailand",
            "Indonesia",
            "Vietnam",
            "Philippines",
            "New Zealand",
        ],
    ),
];

/// Expand a geography string into a country list.
///
/// - a known region name maps to its fixed country list
/// - comma-separated input is split verbatim (entries trimmed)
/// - anything else passes through as a single country
///
/// ```
/// use discovery::pipeline::expand::expand_geography;
///
/// assert_eq!(expand_geography("Malaysia,Thailand"), vec!["Malaysia", "Thailand"]);
/// assert_eq!(expand_geography("Benelux"), vec!["Belgium", "Netherlands", "Luxembourg"]);
/// ```
pub fn expand_geography(geography: &str) -> Vec<String> {
    let geography = geography.trim();

    if geography.contains(',') {
        let mut countries: Vec<String> = Vec::new();
        for part in geography.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            if !countries.iter().any(|c| c.eq_ignore_ascii_case(part)) {
                countries.push(part.to_string());
            }
        }
        return countries;
    }

    if let Some(countries) = lookup_region(geography) {
        return countries.iter().map(|c| c.to_string()).collect();
    }

    if geography.is_empty() {
        Vec::new()
    } else {
        vec![geography.to_string()]
    }
}

fn lookup_region(term: &str) -> Option<&'static [&'static str]> {
    let key = term.to_lowercase();
    let key = key.trim();
    REGIONS
        .iter()
        .find(|(aliases, _)| aliases.contains(&key))
        .map(|(_, countries)| *countries)
}

/// Parse a term-variant answer: a JSON array of strings.
///
/// Drops blanks, duplicates (case-insensitive) and the original phrase, then
/// caps the list at `max`.
pub fn parse_term_variants(response: &str, phrase: &str, max: usize) -> Option<Vec<String>> {
    let raw: Vec<String> = parse_json_response(response).ok()?;

    let mut variants: Vec<String> = Vec::new();
    for term in raw {
        let term = term.trim();
        if term.is_empty()
            || term.eq_ignore_ascii_case(phrase.trim())
            || variants.iter().any(|v| v.eq_ignore_ascii_case(term))
        {
            continue;
        }
        variants.push(term.to_string());
        if variants.len() == max {
            break;
        }
    }
    Some(variants)
}

/// Builds [`Criteria`] from a request.
pub struct TermExpander {
    provider: Arc<dyn Provider>,
    max_variants: usize,
}

impl TermExpander {
    pub fn new(provider: Arc<dyn Provider>, max_variants: usize) -> Self {
        Self {
            provider,
            max_variants,
        }
    }

    /// Synonymous phrasings for a business phrase. Never fails.
    pub async fn expand_terms(&self, phrase: &str) -> Vec<String> {
        if self.max_variants == 0 {
            return Vec::new();
        }

        let prompt = format_term_variants_prompt(phrase, self.max_variants);
        let response = match self.provider.submit(&prompt, &SubmitOptions::text()).await {
            Ok(r) => r,
            Err(e) => {
                warn!(error = %e, phrase, "Term variant generation failed");
                return Vec::new();
            }
        };

        match parse_term_variants(&response, phrase, self.max_variants) {
            Some(variants) => {
                debug!(phrase, count = variants.len(), "Generated term variants");
                variants
            }
            None => {
                warn!(phrase, "Term variant answer was not a JSON array");
                Vec::new()
            }
        }
    }

    /// Expand geography and terms for one request.
    pub async fn expand(&self, request: &DiscoveryRequest) -> Criteria {
        let countries = expand_geography(&request.country);
        let term_variants = self.expand_terms(request.business_phrase.trim()).await;

        Criteria {
            business: request.business_phrase.trim().to_string(),
            geography: request.country.clone(),
            countries,
            term_variants,
            exclusion: request.exclusion.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;

    #[test]
    fn test_region_lookup_is_case_insensitive() {
        let countries = expand_geography("Southeast Asia");
        assert!(countries.contains(&"Malaysia".to_string()));
        assert!(countries.contains(&"Vietnam".to_string()));
        assert_eq!(expand_geography("DACH"), vec!["Germany", "Austria", "Switzerland"]);
    }

    #[test]
    fn test_comma_list_split_verbatim() {
        assert_eq!(
            expand_geography(" Malaysia , Thailand,,malaysia "),
            vec!["Malaysia", "Thailand"]
        );
        // Region names inside a comma list are not expanded.
        assert_eq!(expand_geography("Benelux, France"), vec!["Benelux", "France"]);
    }

    #[test]
    fn test_unknown_term_passes_through() {
        assert_eq!(expand_geography("Vietnam"), vec!["Vietnam"]);
        assert!(expand_geography("   ").is_empty());
    }

    #[test]
    fn test_parse_term_variants_dedupes_and_caps() {
        let response = r#"["Rotogravure ink maker", "gravure ink manufacturer", "rotogravure INK maker", "", "Gravure printing ink producer", "Intaglio ink maker"]"#;
        let variants = parse_term_variants(response, "gravure ink manufacturer", 2).unwrap();
        assert_eq!(
            variants,
            vec!["Rotogravure ink maker", "Gravure printing ink producer"]
        );
    }

    #[test]
    fn test_parse_term_variants_rejects_non_array() {
        assert!(parse_term_variants(r#"{"terms": []}"#, "x", 4).is_none());
    }

    #[tokio::test]
    async fn test_expand_survives_provider_failure() {
        let provider = Arc::new(MockProvider::new("openai").failing());
        let expander = TermExpander::new(provider, 4);

        let request = DiscoveryRequest::new("gravure ink manufacturer", "Malaysia,Thailand")
            .with_exclusion("large multinationals");
        let criteria = expander.expand(&request).await;

        assert_eq!(criteria.countries, vec!["Malaysia", "Thailand"]);
        assert!(criteria.term_variants.is_empty());
        assert_eq!(criteria.exclusion, "large multinationals");
    }

    #[tokio::test]
    async fn test_expand_uses_provider_variants() {
        let provider = Arc::new(
            MockProvider::new("openai")
                .with_default_response(r#"["rotogravure ink maker", "packaging ink manufacturer"]"#),
        );
        let expander = TermExpander::new(provider, 4);
        let criteria = expander
            .expand(&DiscoveryRequest::new("gravure ink manufacturer", "Thailand"))
            .await;
        assert_eq!(criteria.term_variants.len(), 2);
    }
}
