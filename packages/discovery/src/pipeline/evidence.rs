//! Evidence fetching - the candidate's own website, sanitized.
//!
//! The fetcher walks a ladder of URL variants until one yields enough text.
//! A bot wall anywhere on the ladder stops the walk: the site exists but will
//! not talk to us, which is a different outcome from a dead site.

use indexmap::IndexSet;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, LazyLock};
use std::time::Duration;
use tracing::{debug, info};
use url::Url;

use crate::error::FetchError;
use crate::traits::page_client::PageClient;
use crate::types::config::DiscoveryConfig;

/// Paths probed on each host variant after the original URL.
const COMMON_PATHS: &[&str] = &["/", "/en", "/home", "/about", "/index.html", "/index.php"];

/// Text fragments of bot walls, WAF interstitials and CAPTCHA pages.
const BLOCK_SIGNATURES: &[&str] = &[
    "captcha",
    "cloudflare",
    "access denied",
    "attention required",
    "are you a robot",
    "verify you are human",
    "checking your browser",
    "just a moment",
    "ddos protection",
    "request blocked",
    "security check",
    "incapsula",
    "sucuri",
    "enable javascript and cookies",
];

static SCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<script[^>]*>.*?</script>").expect("valid regex"));
static STYLE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<style[^>]*>.*?</style>").expect("valid regex"));
static NOSCRIPT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?is)<noscript[^>]*>.*?</noscript>").expect("valid regex"));
static COMMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?s)<!--.*?-->").expect("valid regex"));
static BLOCK_TAG: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)</?(p|div|br|li|h[1-6]|tr|section|article|header|footer)\b[^>]*>")
        .expect("valid regex")
});
static TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));
static NUMERIC_ENTITY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"&#(x?)([0-9a-fA-F]+);").expect("valid regex"));
static INLINE_SPACE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ \t\r\f\v]+").expect("valid regex"));
static BLANK_LINES: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n\s*\n+").expect("valid regex"));

/// Classification of a fetch, or of one ladder attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FetchStatus {
    /// Sanitized text is long enough to judge.
    Ok,

    /// HTTP 403/406, or a short page carrying a bot-wall signature.
    SecurityBlocked,

    /// Reachable, but too little text.
    Insufficient,

    /// Every attempt errored or was insufficient.
    Inaccessible,
}

/// One step of the ladder.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchAttempt {
    pub url: String,
    pub status: FetchStatus,
    pub reason: Option<String>,
}

/// Result of walking the ladder for one website.
#[derive(Debug, Clone)]
pub struct FetchOutcome {
    pub status: FetchStatus,

    /// Sanitized, truncated text. Set only for [`FetchStatus::Ok`].
    pub content: Option<String>,

    pub reason: Option<String>,

    /// URL the content came from, after redirects.
    pub final_url: Option<String>,

    /// Every attempt made, in order.
    pub attempts: Vec<FetchAttempt>,
}

impl FetchOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }
}

/// Fetches evidence for candidates.
pub struct EvidenceFetcher {
    client: Arc<dyn PageClient>,
    min_chars: usize,
    max_chars: usize,
    attempt_timeout: Duration,
}

impl EvidenceFetcher {
    /// Create a fetcher with default thresholds.
    pub fn new(client: Arc<dyn PageClient>) -> Self {
        let defaults = DiscoveryConfig::default();
        Self::from_config(client, &defaults)
    }

    /// Create a fetcher using the config's thresholds and timeout.
    pub fn from_config(client: Arc<dyn PageClient>, config: &DiscoveryConfig) -> Self {
        Self {
            client,
            min_chars: config.min_evidence_chars,
            max_chars: config.max_evidence_chars,
            attempt_timeout: config.fetch_timeout(),
        }
    }

    /// Set the minimum evidence length.
    pub fn with_min_chars(mut self, min_chars: usize) -> Self {
        self.min_chars = min_chars;
        self
    }

    /// Set the per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.attempt_timeout = timeout;
        self
    }

    /// Walk the URL ladder for `url`.
    pub async fn fetch(&self, url: &str) -> FetchOutcome {
        let mut attempts = Vec::new();

        for variant in url_variants(url) {
            let attempt = self.attempt(&variant).await;
            match attempt {
                Attempted::Ok { content, final_url } => {
                    info!(url = %url, source = %final_url, chars = content.chars().count(), "Evidence fetched");
                    attempts.push(FetchAttempt {
                        url: variant,
                        status: FetchStatus::Ok,
                        reason: None,
                    });
                    return FetchOutcome {
                        status: FetchStatus::Ok,
                        content: Some(content),
                        reason: None,
                        final_url: Some(final_url),
                        attempts,
                    };
                }
                Attempted::Blocked { reason, final_url } => {
                    info!(url = %url, attempt = %variant, reason = %reason, "Website security-blocked");
                    attempts.push(FetchAttempt {
                        url: variant,
                        status: FetchStatus::SecurityBlocked,
                        reason: Some(reason.clone()),
                    });
                    return FetchOutcome {
                        status: FetchStatus::SecurityBlocked,
                        content: None,
                        reason: Some(reason),
                        final_url: Some(final_url),
                        attempts,
                    };
                }
                Attempted::Failed { status, reason } => {
                    debug!(attempt = %variant, status = ?status, reason = %reason, "Evidence attempt failed");
                    attempts.push(FetchAttempt {
                        url: variant,
                        status,
                        reason: Some(reason),
                    });
                }
            }
        }

        let reason = attempts
            .last()
            .and_then(|a| a.reason.clone())
            .unwrap_or_else(|| format!("no fetchable URL variants for {url}"));
        info!(url = %url, attempts = attempts.len(), reason = %reason, "Website inaccessible");

        FetchOutcome {
            status: FetchStatus::Inaccessible,
            content: None,
            reason: Some(reason),
            final_url: None,
            attempts,
        }
    }

    async fn attempt(&self, url: &str) -> Attempted {
        let response = match tokio::time::timeout(self.attempt_timeout, self.client.get(url)).await
        {
            Ok(Ok(response)) => response,
            Ok(Err(e)) => {
                return Attempted::Failed {
                    status: FetchStatus::Inaccessible,
                    reason: describe_error(&e),
                }
            }
            Err(_) => {
                return Attempted::Failed {
                    status: FetchStatus::Inaccessible,
                    reason: format!("timed out after {:?}", self.attempt_timeout),
                }
            }
        };

        if matches!(response.status, 403 | 406) {
            return Attempted::Blocked {
                reason: format!("HTTP {}", response.status),
                final_url: response.final_url,
            };
        }

        let text = sanitize_html(&response.body);
        let chars = text.chars().count();

        if chars < self.min_chars {
            if let Some(signature) = block_signature(&text) {
                return Attempted::Blocked {
                    reason: format!("bot wall detected ({signature})"),
                    final_url: response.final_url,
                };
            }
        }

        if !response.is_success() {
            return Attempted::Failed {
                status: FetchStatus::Inaccessible,
                reason: format!("HTTP {}", response.status),
            };
        }

        if chars < self.min_chars {
            return Attempted::Failed {
                status: FetchStatus::Insufficient,
                reason: format!("insufficient content ({chars} chars)"),
            };
        }

        Attempted::Ok {
            content: truncate_chars(&text, self.max_chars),
            final_url: response.final_url,
        }
    }
}

enum Attempted {
    Ok { content: String, final_url: String },
    Blocked { reason: String, final_url: String },
    Failed { status: FetchStatus, reason: String },
}

fn describe_error(error: &FetchError) -> String {
    match error {
        FetchError::Timeout { .. } => "timed out".to_string(),
        other => other.to_string(),
    }
}

/// The ordered, deduplicated ladder of URLs to try for a website.
///
/// 1. the original URL
/// 2. the same path with `www.` toggled
/// 3. common paths on the original host, then on the toggled host
/// 4. if the original was plain HTTP, HTTPS versions of all of the above
///
/// ```
/// use discovery::pipeline::evidence::url_variants;
///
/// let ladder = url_variants("https://acme.com/about-us");
/// assert_eq!(ladder[0], "https://acme.com/about-us");
/// assert_eq!(ladder[1], "https://www.acme.com/about-us");
/// assert_eq!(ladder[2], "https://acme.com/");
/// ```
pub fn url_variants(url: &str) -> Vec<String> {
    let Ok(original) = Url::parse(url.trim()) else {
        return vec![url.trim().to_string()];
    };

    let mut hosts = vec![original.clone()];
    if let Some(toggled) = toggle_www(&original) {
        hosts.push(toggled);
    }

    let mut ladder: IndexSet<String> = IndexSet::new();
    for host in &hosts {
        ladder.insert(host.to_string());
    }
    for host in &hosts {
        for path in COMMON_PATHS {
            let mut variant = host.clone();
            variant.set_path(path);
            variant.set_query(None);
            variant.set_fragment(None);
            ladder.insert(variant.to_string());
        }
    }

    if original.scheme() == "http" {
        let upgraded: Vec<String> = ladder
            .iter()
            .filter_map(|u| Url::parse(u).ok())
            .filter_map(|mut u| {
                if u.port() == Some(80) {
                    u.set_port(None).ok()?;
                }
                u.set_scheme("https").ok()?;
                Some(u.to_string())
            })
            .collect();
        ladder.extend(upgraded);
    }

    ladder.into_iter().collect()
}

fn toggle_www(url: &Url) -> Option<Url> {
    let domain = url.domain()?;
    let toggled = match domain.strip_prefix("www.") {
        Some(bare) => bare.to_string(),
        None => format!("www.{domain}"),
    };
    let mut variant = url.clone();
    variant.set_host(Some(&toggled)).ok()?;
    Some(variant)
}

/// Strip scripts, styles, comments and tags; decode entities; collapse
/// whitespace. Block-level tags become line breaks.
pub fn sanitize_html(html: &str) -> String {
    let text = SCRIPT.replace_all(html, " ");
    let text = STYLE.replace_all(&text, " ");
    let text = NOSCRIPT.replace_all(&text, " ");
    let text = COMMENT.replace_all(&text, " ");
    let text = BLOCK_TAG.replace_all(&text, "\n");
    let text = TAG.replace_all(&text, " ");
    let text = decode_entities(&text);
    let text = INLINE_SPACE.replace_all(&text, " ");
    let text = BLANK_LINES.replace_all(&text, "\n");

    text.lines()
        .map(str::trim)
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY.replace_all(text, |caps: &regex::Captures<'_>| {
        let radix = if caps[1].is_empty() { 10 } else { 16 };
        u32::from_str_radix(&caps[2], radix)
            .ok()
            .and_then(char::from_u32)
            .map(String::from)
            .unwrap_or_default()
    });
    text.replace("&nbsp;", " ")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&copy;", "©")
        .replace("&amp;", "&")
}

/// The first bot-wall signature found in `text`, if any.
pub fn block_signature(text: &str) -> Option<&'static str> {
    let lower = text.to_lowercase();
    BLOCK_SIGNATURES.iter().copied().find(|s| lower.contains(s))
}

fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((idx, _)) => text[..idx].to_string(),
        None => text.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockPageClient;

    fn long_page(body: &str) -> String {
        format!(
            "<html><head><title>Acme</title><script>var x = 1;</script></head><body><p>{}</p></body></html>",
            body.repeat(20)
        )
    }

    #[test]
    fn test_ladder_order_for_http() {
        let ladder = url_variants("http://www.acmegravure.com.my/home");
        assert_eq!(ladder[0], "http://www.acmegravure.com.my/home");
        assert_eq!(ladder[1], "http://acmegravure.com.my/home");
        assert_eq!(ladder[2], "http://www.acmegravure.com.my/");
        assert!(ladder.contains(&"https://www.acmegravure.com.my/home".to_string()));
        assert!(ladder.contains(&"https://acmegravure.com.my/index.php".to_string()));

        let first_https = ladder.iter().position(|u| u.starts_with("https://")).unwrap();
        assert!(ladder[..first_https].iter().all(|u| u.starts_with("http://")));
    }

    #[test]
    fn test_ladder_is_deduplicated() {
        let ladder = url_variants("https://acme.com/");
        let unique: IndexSet<_> = ladder.iter().collect();
        assert_eq!(unique.len(), ladder.len());
        // original + toggled + 6 paths on each host, minus the two "/" repeats
        assert_eq!(ladder.len(), 12);
        assert!(ladder.iter().all(|u| u.starts_with("https://")));
    }

    #[test]
    fn test_ladder_for_unparseable_url() {
        assert_eq!(url_variants("not a url"), vec!["not a url"]);
    }

    #[test]
    fn test_sanitize_strips_scripts_and_tags() {
        let html = r#"<html><head><style>p{color:red}</style></head>
            <body><!-- hidden --><h1>Acme&nbsp;Inks</h1><script>alert(1)</script>
            <p>Gravure &amp; flexo inks&#33;</p></body></html>"#;
        let text = sanitize_html(html);
        assert_eq!(text, "Acme Inks\nGravure & flexo inks!");
    }

    #[test]
    fn test_block_signature() {
        assert_eq!(
            block_signature("Attention Required! | Cloudflare"),
            Some("cloudflare")
        );
        assert_eq!(block_signature("We make gravure inks"), None);
    }

    #[test]
    fn test_truncate_chars_respects_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("hi", 10), "hi");
    }

    #[tokio::test]
    async fn test_fetch_ok_on_first_attempt() {
        let client = Arc::new(MockPageClient::new().with_page(
            "https://acme.com/",
            200,
            long_page("Acme manufactures gravure printing inks in Malaysia. "),
        ));
        let fetcher = EvidenceFetcher::new(client.clone());

        let outcome = fetcher.fetch("https://acme.com").await;
        assert_eq!(outcome.status, FetchStatus::Ok);
        assert!(outcome.content.unwrap().contains("gravure printing inks"));
        assert_eq!(outcome.attempts.len(), 1);
        assert_eq!(client.fetched(), vec!["https://acme.com/"]);
    }

    #[tokio::test]
    async fn test_fetch_falls_back_to_www() {
        let client = Arc::new(MockPageClient::new().with_page(
            "https://www.acme.com/products",
            200,
            long_page("Gravure inks. "),
        ));
        let fetcher = EvidenceFetcher::new(client);

        let outcome = fetcher.fetch("https://acme.com/products").await;
        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts.len(), 2);
        assert_eq!(outcome.attempts[0].status, FetchStatus::Inaccessible);
    }

    #[tokio::test]
    async fn test_403_is_security_blocked_immediately() {
        let client = Arc::new(MockPageClient::new().with_page(
            "https://acme.com/",
            403,
            "Forbidden",
        ));
        let fetcher = EvidenceFetcher::new(client.clone());

        let outcome = fetcher.fetch("https://acme.com/").await;
        assert_eq!(outcome.status, FetchStatus::SecurityBlocked);
        assert_eq!(outcome.reason.as_deref(), Some("HTTP 403"));
        assert_eq!(client.fetched().len(), 1);
    }

    #[tokio::test]
    async fn test_waf_page_is_security_blocked() {
        let client = Arc::new(MockPageClient::new().with_page(
            "https://acme.com/",
            200,
            "<html><title>Just a moment...</title><body>Checking your browser before accessing acme.com</body></html>",
        ));
        let fetcher = EvidenceFetcher::new(client);

        let outcome = fetcher.fetch("https://acme.com/").await;
        assert_eq!(outcome.status, FetchStatus::SecurityBlocked);
    }

    #[tokio::test]
    async fn test_short_pages_everywhere_is_inaccessible() {
        let client = Arc::new(
            MockPageClient::new().with_fallback_page(200, "<html><body>Coming soon</body></html>"),
        );
        let fetcher = EvidenceFetcher::new(client.clone());

        let outcome = fetcher.fetch("http://acme.com/").await;
        assert_eq!(outcome.status, FetchStatus::Inaccessible);
        assert!(outcome
            .attempts
            .iter()
            .all(|a| a.status == FetchStatus::Insufficient));
        assert_eq!(client.fetched().len(), url_variants("http://acme.com/").len());
    }

    #[tokio::test]
    async fn test_https_upgrade_reached_last() {
        let client = Arc::new(MockPageClient::new().with_page(
            "https://acme.com/",
            200,
            long_page("Gravure inks. "),
        ));
        let fetcher = EvidenceFetcher::new(client);

        let outcome = fetcher.fetch("http://acme.com/").await;
        assert!(outcome.is_ok());
        assert!(outcome.attempts.len() > 2);
        assert_eq!(outcome.attempts.last().unwrap().url, "https://acme.com/");
    }
}
