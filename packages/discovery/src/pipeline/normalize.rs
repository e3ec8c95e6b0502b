//! Identity-key normalization for deduplication.
//!
//! Three keys identify a candidate: `normalized_website`, `domain_root`, and
//! `normalized_name`. The rules here are exact; dedup behaviour and tests
//! depend on them byte for byte.

use regex::Regex;
use std::sync::LazyLock;

/// Matches a URI scheme prefix such as `https://`.
static URI_SCHEME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Za-z][A-Za-z0-9+.\-]*://").expect("valid regex"));

/// Country-code or locale path segments (`my`, `en-us`, `th_th`).
static LOCALE_SEGMENT: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-z]{2}([_-][a-z]{2})?$").expect("valid regex"));

/// Path segments that never distinguish one company site from another.
const BOILERPLATE_SEGMENTS: &[&str] = &[
    "home",
    "homepage",
    "index",
    "default",
    "main",
    "welcome",
    "about",
    "about-us",
    "aboutus",
    "about_us",
    "company",
    "contact",
    "contact-us",
    "contactus",
];

/// Longest first: `.shtml` must be tried before `.html`.
const FILE_EXTENSIONS: &[&str] = &[
    ".shtml", ".xhtml", ".html", ".htm", ".aspx", ".asp", ".php", ".jsp", ".cfm",
];

/// Legal-entity suffixes, stripped from the end. Multi-token forms first.
const LEGAL_SUFFIXES: &[&[&str]] = &[
    &["public", "company", "limited"],
    &["company", "limited"],
    &["private", "limited"],
    &["sdn", "bhd"],
    &["pte", "ltd"],
    &["pvt", "ltd"],
    &["pty", "ltd"],
    &["co", "ltd"],
    &["s", "a"],
    &["b", "v"],
    &["n", "v"],
    &["limited"],
    &["ltd"],
    &["incorporated"],
    &["inc"],
    &["corporation"],
    &["corp"],
    &["llc"],
    &["llp"],
    &["plc"],
    &["pcl"],
    &["gmbh"],
    &["ag"],
    &["sa"],
    &["bv"],
    &["nv"],
    &["srl"],
    &["spa"],
    &["tbk"],
    &["berhad"],
    &["bhd"],
    &["sdn"],
    &["pte"],
    &["pvt"],
    &["pty"],
    &["jsc"],
    &["kk"],
    &["co"],
];

/// Legal-form prefixes used in a few jurisdictions (Indonesia, Vietnam).
const LEGAL_PREFIXES: &[&[&str]] = &[&["cong", "ty"], &["pt"], &["cv"], &["ud"]];

/// Whether `url` starts with a URI scheme (`http://`, `https://`, ...).
pub fn has_uri_scheme(url: &str) -> bool {
    URI_SCHEME.is_match(url.trim())
}

/// Normalize a website for dedup.
///
/// Lowercase, strip scheme, strip leading `www.`, strip trailing slashes,
/// boilerplate path suffixes and file extensions.
///
/// ```
/// use discovery::pipeline::normalize::normalized_website;
///
/// assert_eq!(normalized_website("https://www.Acme.com/About/"), "acme.com");
/// assert_eq!(normalized_website("http://acme.com"), "acme.com");
/// ```
pub fn normalized_website(url: &str) -> String {
    let mut s = url.trim().to_lowercase();

    if let Some(m) = URI_SCHEME.find(&s) {
        s = s[m.end()..].to_string();
    }
    if let Some(idx) = s.find(['?', '#']) {
        s.truncate(idx);
    }
    if let Some(rest) = s.strip_prefix("www.") {
        s = rest.to_string();
    }

    let (host, path) = match s.find('/') {
        Some(idx) => (&s[..idx], &s[idx..]),
        None => (s.as_str(), ""),
    };
    let host = host
        .strip_suffix(":80")
        .or_else(|| host.strip_suffix(":443"))
        .unwrap_or(host)
        .trim_end_matches('.');

    format!("{}{}", host, strip_path_boilerplate(path))
}

/// Host part of [`normalized_website`].
///
/// ```
/// use discovery::pipeline::normalize::domain_root;
///
/// assert_eq!(domain_root("https://www.acme.com.my/products/inks.html"), "acme.com.my");
/// ```
pub fn domain_root(url: &str) -> String {
    let normalized = normalized_website(url);
    match normalized.find('/') {
        Some(idx) => normalized[..idx].to_string(),
        None => normalized,
    }
}

/// Normalize a company name for dedup.
///
/// Lowercase, strip punctuation, strip legal-entity suffixes (and PT/CV-style
/// prefixes), collapse whitespace. A name is never stripped down to nothing.
///
/// ```
/// use discovery::pipeline::normalize::normalized_name;
///
/// assert_eq!(
///     normalized_name("Acme Manufacturing Sdn Bhd"),
///     normalized_name("ACME MANUFACTURING"),
/// );
/// ```
pub fn normalized_name(name: &str) -> String {
    let lower = name.to_lowercase();
    let mut cleaned = String::with_capacity(lower.len());
    for c in lower.chars() {
        match c {
            '\'' | '\u{2019}' | '`' => {}
            '&' => cleaned.push_str(" and "),
            c if c.is_alphanumeric() => cleaned.push(c),
            _ => cleaned.push(' '),
        }
    }

    let mut tokens: Vec<&str> = cleaned.split_whitespace().collect();

    'suffixes: loop {
        for suffix in LEGAL_SUFFIXES {
            if tokens.len() > suffix.len() && tokens.ends_with(suffix) {
                tokens.truncate(tokens.len() - suffix.len());
                continue 'suffixes;
            }
        }
        break;
    }

    'prefixes: loop {
        for prefix in LEGAL_PREFIXES {
            if tokens.len() > prefix.len() && tokens.starts_with(prefix) {
                tokens.drain(..prefix.len());
                continue 'prefixes;
            }
        }
        break;
    }

    tokens.join(" ")
}

fn strip_path_boilerplate(path: &str) -> String {
    let mut path = path.to_string();
    loop {
        let before = path.len();

        while path.ends_with('/') {
            path.pop();
        }
        if let Some(ext) = FILE_EXTENSIONS.iter().find(|ext| last_segment(&path).ends_with(*ext)) {
            path.truncate(path.len() - ext.len());
        }
        if let Some(idx) = path.rfind('/') {
            let segment = &path[idx + 1..];
            if BOILERPLATE_SEGMENTS.contains(&segment) || LOCALE_SEGMENT.is_match(segment) {
                path.truncate(idx);
            }
        }

        if path.len() == before {
            return path;
        }
    }
}

fn last_segment(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[idx + 1..],
        None => path,
    }
}
