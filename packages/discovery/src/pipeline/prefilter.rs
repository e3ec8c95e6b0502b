//! Pre-filter: drop candidates whose website is a platform, not the entity.
//!
//! Runs before any network fetch.

use crate::types::candidate::Candidate;

/// Domain roots that never belong to a discovered company.
const NON_ENTITY_DOMAINS: &[&str] = &[
    // Wikis and reference
    "wikipedia.org",
    "wikidata.org",
    "wikimedia.org",
    "britannica.com",
    // Social networks
    "facebook.com",
    "fb.com",
    "instagram.com",
    "linkedin.com",
    "twitter.com",
    "x.com",
    "tiktok.com",
    "pinterest.com",
    "reddit.com",
    "threads.net",
    // Video platforms
    "youtube.com",
    "youtu.be",
    "vimeo.com",
    // Directories and aggregators
    "crunchbase.com",
    "bloomberg.com",
    "zoominfo.com",
    "dnb.com",
    "opencorporates.com",
    "yellowpages.com",
    "yelp.com",
    "kompass.com",
    "alibaba.com",
    "indiamart.com",
    "made-in-china.com",
    "tradeindia.com",
    "europages.com",
    "glassdoor.com",
    "indeed.com",
    "google.com",
    "maps.google.com",
    "goo.gl",
    "medium.com",
    "github.com",
];

/// Whether a domain root belongs to a non-entity platform.
///
/// Subdomains match their parent (`en.wikipedia.org`, `m.facebook.com`).
pub fn is_non_entity_domain(domain_root: &str) -> bool {
    let host = domain_root.trim_end_matches('.');
    NON_ENTITY_DOMAINS.iter().any(|blocked| {
        host == *blocked
            || host
                .strip_suffix(blocked)
                .is_some_and(|prefix| prefix.ends_with('.'))
    })
}

/// Split candidates into (kept, rejected).
pub fn prefilter(candidates: Vec<Candidate>) -> (Vec<Candidate>, Vec<Candidate>) {
    candidates
        .into_iter()
        .partition(|c| !c.domain_root.is_empty() && !is_non_entity_domain(&c.domain_root))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::task::{BackendClass, Task};

    fn candidate(website: &str) -> Candidate {
        Candidate::new(
            "Acme",
            website,
            "",
            Task::new("t", BackendClass::WebSearch, 1),
            0,
        )
    }

    #[test]
    fn test_blocks_platforms() {
        assert!(is_non_entity_domain("facebook.com"));
        assert!(is_non_entity_domain("en.wikipedia.org"));
        assert!(is_non_entity_domain("m.facebook.com"));
        assert!(!is_non_entity_domain("acme.com"));
        assert!(!is_non_entity_domain("notfacebook.com"));
    }

    #[test]
    fn test_prefilter_partitions() {
        let (kept, rejected) = prefilter(vec![
            candidate("https://www.linkedin.com/company/acme"),
            candidate("https://acme.com.my"),
            candidate("https://youtube.com/@acme"),
        ]);
        assert_eq!(kept.len(), 1);
        assert_eq!(kept[0].domain_root, "acme.com.my");
        assert_eq!(rejected.len(), 2);
    }

    #[test]
    fn test_prefilter_drops_empty_domain() {
        let (kept, rejected) = prefilter(vec![candidate("https://")]);
        assert!(kept.is_empty());
        assert_eq!(rejected.len(), 1);
    }
}
