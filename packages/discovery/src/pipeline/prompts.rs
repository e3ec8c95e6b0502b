//! Prompts for the discovery pipeline.
//!
//! Every builder here is pure: same inputs, same text. Placeholders use
//! `{name}` syntax and are filled with `str::replace`.

use crate::pipeline::extract::extraction_schema;
use crate::traits::judge::JudgeRequest;
use crate::types::request::Criteria;

/// Broad enumeration phrasings over the whole country list.
pub const BROAD_PHRASINGS: &[&str] = &[
    "List {business} companies in {countries}.",
    "Find {business} companies operating in {countries}, including small and medium-sized firms.",
    "Which independent {business} businesses exist in {countries}?",
    "Search for lesser-known {business} firms in {countries}, including family-owned and local companies.",
];

/// Directory-style phrasings, one country at a time.
pub const COUNTRY_PHRASINGS: &[&str] = &[
    "List {business} companies in {country}.",
    "Enumerate {business} companies found in business directories, trade association member lists and industrial estates in {country}.",
    "Which {business} companies have a factory or head office in {country}?",
];

/// Phrasings for synonymous business terms.
pub const VARIANT_PHRASINGS: &[&str] = &[
    "List companies in {countries} that are {term}.",
    "Find {term} businesses located in {countries}.",
];

/// Output instructions appended to every task.
const TASK_OUTPUT: &str = "For each company give its official name, its own website URL (starting with https:// or http://), and its location as \"City, Country\".
Only include companies located in: {countries}.";

/// Prompt for generating synonymous business phrasings.
pub const TERM_VARIANTS_PROMPT: &str = r#"Give up to {max} alternative phrasings a buyer would use when searching for this kind of business: "{phrase}".

Rules:
- Synonyms and industry terms for the same activity only.
- Never broaden a sub-category to its parent (for "gravure ink manufacturer" do not answer "ink manufacturer" or "chemical company").
- Output a JSON array of strings and nothing else."#;

/// System instruction for the extraction call.
pub const EXTRACT_SYSTEM: &str =
    "You convert research notes into structured company records. You never invent companies.";

/// Prompt for turning a free-text answer into company tuples.
pub const EXTRACT_PROMPT: &str = r#"Extract every company mentioned in the text below.

Return a JSON object matching this schema:
{schema}

Rules:
- "website" must be the company's own website, including the https:// or http:// prefix. Use an empty string if the text gives none.
- "location" is "City, Country" when known, otherwise just the country.
- Do not include directories, marketplaces or news sites as companies.

Text:
{answer}"#;

/// System instruction for judges.
pub const JUDGE_SYSTEM: &str =
    "You validate company research leads against a brief. Answer with a single JSON object.";

/// Prompt for one judge verdict.
pub const JUDGE_PROMPT: &str = r#"Decide whether this company matches the research brief.

Company: {name}
Website: {website}
Claimed location: {location}

Brief:
- Business: {business}
- Allowed countries: {countries}
- Exclusion criteria: {exclusion}

Rules:
1. Location: the company must be located in one of the allowed countries. If the evidence shows a different city or country than claimed, put the real one in "corrected_location".
2. Business match: be lenient. Accept the company if it plausibly does this business or a closely related specialty; reject only clear mismatches.
3. Exclusions (any positive signal means "valid": false):
{exclusion_rules}

Website text:
{evidence}

Respond with JSON only:
{"valid": true or false, "rationale": "one or two sentences", "corrected_location": "City, Country" or null}"#;

/// Shown to judges when no website text could be fetched.
pub const NO_EVIDENCE: &str = "No website text available; judge by name only.";

// Whole words only; prefixes would let "stockists" read as "stock".
const MULTINATIONAL_SIGNALS: &[&str] = &[
    "multinational",
    "multinationals",
    "mnc",
    "mncs",
    "large",
    "global",
    "conglomerate",
    "conglomerates",
    "foreign",
];
const LISTED_SIGNALS: &[&str] = &["listed", "public", "publicly", "stock", "exchange", "ipo"];
const DISTRIBUTOR_SIGNALS: &[&str] = &[
    "distributor",
    "distributors",
    "reseller",
    "resellers",
    "trading",
    "trader",
    "traders",
    "dealer",
    "dealers",
    "importer",
    "importers",
    "agent",
    "agents",
];
const NEGATORS: &[&str] = &["non", "not", "no", "un", "private"];

/// Fill a phrasing template.
///
/// `{country}` and `{term}` are only present in per-country and per-variant
/// phrasings; the other placeholders are always filled.
pub fn fill_phrasing(template: &str, criteria: &Criteria, country: &str, term: &str) -> String {
    template
        .replace("{business}", &criteria.business)
        .replace("{countries}", &criteria.country_list())
        .replace("{country}", country)
        .replace("{term}", term)
}

/// Build the full text of one task.
///
/// The exclusion text is always carried verbatim. From round 2 on, the
/// already-found names are appended with an instruction not to repeat them.
pub fn build_task(
    phrasing: &str,
    criteria: &Criteria,
    round: usize,
    already_found: &[String],
) -> String {
    let mut text = String::with_capacity(phrasing.len() + 256);
    text.push_str(phrasing);
    text.push_str("\n\n");
    text.push_str(&TASK_OUTPUT.replace("{countries}", &criteria.country_list()));

    if criteria.has_exclusion() {
        text.push_str("\nExclude: ");
        text.push_str(&criteria.exclusion);
    }

    if round >= 2 && !already_found.is_empty() {
        text.push_str("\n\nAlready found: ");
        text.push_str(&already_found.join(", "));
        text.push_str(". Find more companies; do not repeat any of these.");
    }

    text
}

/// Format the term-variant prompt.
pub fn format_term_variants_prompt(phrase: &str, max: usize) -> String {
    TERM_VARIANTS_PROMPT
        .replace("{max}", &max.to_string())
        .replace("{phrase}", phrase)
}

/// Format the extraction prompt with the tuple schema embedded.
pub fn format_extract_prompt(answer: &str) -> String {
    EXTRACT_PROMPT
        .replace("{schema}", &extraction_schema())
        .replace("{answer}", answer)
}

/// Format a judge prompt. Evidence is substituted last so page text is never
/// scanned for placeholders.
pub fn format_judge_prompt(request: &JudgeRequest<'_>) -> String {
    let criteria = request.criteria;
    let exclusion = if criteria.has_exclusion() {
        criteria.exclusion.as_str()
    } else {
        "none"
    };
    let rules = exclusion_rules(&criteria.exclusion)
        .iter()
        .map(|rule| format!("   - {rule}"))
        .collect::<Vec<_>>()
        .join("\n");

    JUDGE_PROMPT
        .replace("{name}", request.name)
        .replace("{website}", request.website)
        .replace("{location}", request.claimed_location)
        .replace("{business}", &criteria.business)
        .replace("{countries}", &criteria.country_list())
        .replace("{exclusion_rules}", &rules)
        .replace("{exclusion}", exclusion)
        .replace("{evidence}", request.evidence.unwrap_or(NO_EVIDENCE))
}

/// Derive concrete exclusion rules from free-text exclusion criteria.
///
/// Recognized signal words map to fixed rules. Negated signals, or text with
/// no recognized signal, fall back to one rule that quotes the caller's text.
pub fn exclusion_rules(exclusion: &str) -> Vec<String> {
    let exclusion = exclusion.trim();
    if exclusion.is_empty() {
        return vec!["No exclusion criteria were given; do not reject on exclusion grounds.".into()];
    }

    let lower = exclusion.to_lowercase();
    let words: Vec<&str> = lower
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    // A negator up to two words back ("non-listed", "not publicly listed")
    // suppresses the signal's fixed rule.
    let mut negated = false;
    let mut mentions = |signals: &[&str]| {
        let mut hit = false;
        for (i, word) in words.iter().enumerate() {
            if !signals.contains(word) {
                continue;
            }
            let window = &words[i.saturating_sub(2)..i];
            if window.iter().any(|w| NEGATORS.contains(w)) {
                negated = true;
            } else {
                hit = true;
            }
        }
        hit
    };

    let mut rules = Vec::new();
    if mentions(MULTINATIONAL_SIGNALS) {
        rules.push(
            "Reject subsidiaries, branches or affiliates of multinational or large global groups (foreign parent company, global brand, offices in many countries)."
                .to_string(),
        );
    }
    if mentions(LISTED_SIGNALS) {
        rules.push(
            "Reject companies listed on a stock exchange and subsidiaries of listed groups (ticker symbols, investor relations pages, annual reports)."
                .to_string(),
        );
    }
    if mentions(DISTRIBUTOR_SIGNALS) {
        rules.push(
            "Reject pure distributors, traders and resellers that do not make the product themselves."
                .to_string(),
        );
    }
    if negated || rules.is_empty() {
        rules.push(format!("Reject the company if it matches: {exclusion}"));
    }
    rules
}
