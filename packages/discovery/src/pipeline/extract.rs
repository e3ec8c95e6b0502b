//! Candidate extraction - free-text backend answers into company tuples.
//!
//! Extraction is a second, JSON-mode provider call. Any failure yields zero
//! candidates for that answer; it never fails the round.

use schemars::JsonSchema;
use serde::{Deserialize, Deserializer, Serialize};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::error::{ExtractError, ExtractResult};
use crate::pipeline::json::parse_json_response;
use crate::pipeline::normalize::has_uri_scheme;
use crate::pipeline::prompts::{format_extract_prompt, EXTRACT_SYSTEM};
use crate::traits::provider::{Provider, SubmitOptions};
use crate::types::candidate::Candidate;
use crate::types::task::Task;

/// One company tuple as returned by the extraction call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedCompany {
    /// Official company name.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "String")]
    pub name: String,

    /// The company's own website, with scheme.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "String")]
    pub website: String,

    /// "City, Country" when known.
    #[serde(default, deserialize_with = "null_as_empty")]
    #[schemars(with = "String")]
    pub location: String,
}

/// Models answer `null` for unknown fields as often as they omit them.
fn null_as_empty<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<String>::deserialize(deserializer)?.unwrap_or_default())
}

/// Top-level object requested in JSON mode.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ExtractionPayload {
    pub companies: Vec<ExtractedCompany>,
}

/// The JSON schema embedded in the extraction prompt.
pub fn extraction_schema() -> String {
    let schema = schemars::schema_for!(ExtractionPayload);
    serde_json::to_string_pretty(&schema).unwrap_or_default()
}

/// Parse an extraction answer.
///
/// Accepts the requested `{"companies": [...]}` object or a bare array.
pub fn parse_candidates(response: &str) -> ExtractResult<Vec<ExtractedCompany>> {
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Shape {
        Payload(ExtractionPayload),
        Bare(Vec<ExtractedCompany>),
    }

    match parse_json_response::<Shape>(response) {
        Ok(Shape::Payload(payload)) => Ok(payload.companies),
        Ok(Shape::Bare(companies)) => Ok(companies),
        Err(e) => Err(ExtractError::Parse(e.to_string())),
    }
}

/// Turn tuples into candidates, assigning first-seen sequence numbers.
///
/// Tuples without a name, or whose website lacks a URI scheme, are dropped.
pub fn into_candidates(
    companies: Vec<ExtractedCompany>,
    task: &Task,
    next_sequence: &mut u64,
) -> Vec<Candidate> {
    companies
        .into_iter()
        .filter(|c| {
            let eligible = !c.name.trim().is_empty() && has_uri_scheme(&c.website);
            if !eligible {
                debug!(name = %c.name, website = %c.website, "Dropping tuple without usable website");
            }
            eligible
        })
        .map(|c| {
            let sequence = *next_sequence;
            *next_sequence += 1;
            Candidate::new(
                c.name.trim(),
                c.website.trim(),
                c.location.trim(),
                task.clone(),
                sequence,
            )
        })
        .collect()
}

/// Extracts company tuples from backend answers.
pub struct CandidateExtractor {
    provider: Arc<dyn Provider>,
}

impl CandidateExtractor {
    pub fn new(provider: Arc<dyn Provider>) -> Self {
        Self { provider }
    }

    /// Structured-output call over one answer.
    pub async fn try_extract(&self, answer: &str) -> ExtractResult<Vec<ExtractedCompany>> {
        let options = SubmitOptions::json().with_system(EXTRACT_SYSTEM);
        let response = self
            .provider
            .submit(&format_extract_prompt(answer), &options)
            .await?;
        parse_candidates(&response)
    }

    /// Like [`try_extract`](Self::try_extract), but failures become an empty list.
    pub async fn extract(&self, answer: &str) -> Vec<ExtractedCompany> {
        if answer.trim().is_empty() {
            return Vec::new();
        }
        match self.try_extract(answer).await {
            Ok(companies) => companies,
            Err(e) => {
                warn!(error = %e, "Extraction failed, yielding no candidates");
                Vec::new()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockProvider;
    use crate::types::task::BackendClass;

    #[test]
    fn test_parse_object_and_bare_array() {
        let object = r#"{"companies":[{"name":"Acme","website":"https://acme.com","location":"Ipoh, Malaysia"}]}"#;
        let parsed = parse_candidates(object).unwrap();
        assert_eq!(parsed.len(), 1);
        assert_eq!(parsed[0].location, "Ipoh, Malaysia");

        let bare = "```json\n[{\"name\":\"Beta\",\"website\":\"https://beta.co.th\"}]\n```";
        let parsed = parse_candidates(bare).unwrap();
        assert_eq!(parsed[0].name, "Beta");
        assert_eq!(parsed[0].location, "");
    }

    #[test]
    fn test_null_fields_drop_only_their_tuple() {
        let response = r#"{"companies":[
            {"name":"Acme","website":"https://acme.com","location":"Ipoh, Malaysia"},
            {"name":"Beta","website":null,"location":null},
            {"name":null,"website":"https://gamma.co.th","location":"Bangkok, Thailand"}
        ]}"#;
        let parsed = parse_candidates(response).unwrap();
        assert_eq!(parsed.len(), 3);
        assert_eq!(parsed[1].website, "");
        assert_eq!(parsed[2].name, "");

        let task = Task::new("t", BackendClass::WebSearch, 1);
        let mut seq = 0;
        let candidates = into_candidates(parsed, &task, &mut seq);
        assert_eq!(candidates.len(), 1);
        assert_eq!(candidates[0].name, "Acme");
    }

    #[test]
    fn test_parse_error_is_typed() {
        assert!(matches!(
            parse_candidates("sorry, I can't help"),
            Err(ExtractError::Parse(_))
        ));
    }

    #[test]
    fn test_into_candidates_drops_schemeless_websites() {
        let task = Task::new("t", BackendClass::WebSearch, 2);
        let mut seq = 10;
        let candidates = into_candidates(
            vec![
                ExtractedCompany {
                    name: "Acme".into(),
                    website: "https://acme.com".into(),
                    location: "".into(),
                },
                ExtractedCompany {
                    name: "NoScheme".into(),
                    website: "www.noscheme.com".into(),
                    location: "".into(),
                },
                ExtractedCompany {
                    name: "Beta".into(),
                    website: "http://beta.com".into(),
                    location: "".into(),
                },
            ],
            &task,
            &mut seq,
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0].sequence, 10);
        assert_eq!(candidates[1].sequence, 11);
        assert_eq!(candidates[1].round_discovered, 2);
        assert_eq!(seq, 12);
    }

    #[tokio::test]
    async fn test_extract_failure_yields_empty() {
        let provider = Arc::new(MockProvider::new("extractor").failing());
        let extractor = CandidateExtractor::new(provider.clone());
        assert!(extractor.extract("Acme makes ink").await.is_empty());
        assert_eq!(provider.call_count(), 1);
    }

    #[tokio::test]
    async fn test_extract_uses_json_mode() {
        let provider = Arc::new(MockProvider::new("extractor").with_default_response(
            r#"{"companies":[{"name":"Acme","website":"https://acme.com","location":""}]}"#,
        ));
        let extractor = CandidateExtractor::new(provider.clone());
        let companies = extractor.extract("Acme makes ink").await;
        assert_eq!(companies.len(), 1);
        assert!(provider.calls()[0].json_mode);
    }
}
