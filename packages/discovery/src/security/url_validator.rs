//! URL validation for SSRF protection.
//!
//! Candidate websites come from model output, so every evidence probe is
//! validated before a request leaves the process.

use std::collections::HashSet;
use std::net::IpAddr;

use crate::error::{SecurityError, SecurityResult};

const DEFAULT_BLOCKED_HOSTS: &[&str] = &[
    "localhost",
    "127.0.0.1",
    "::1",
    "[::1]",
    "0.0.0.0",
    "metadata.google.internal",
    "metadata.gke.internal",
    "instance-data",
];

const DEFAULT_BLOCKED_CIDRS: &[&str] = &[
    "0.0.0.0/8",
    "10.0.0.0/8",
    "100.64.0.0/10",
    "127.0.0.0/8",
    "169.254.0.0/16",
    "172.16.0.0/12",
    "192.168.0.0/16",
    "::1/128",
    "fc00::/7",
    "fe80::/10",
];

/// Validates evidence URLs.
///
/// Rejects:
/// - non-HTTP(S) schemes
/// - internal hostnames (localhost, cloud metadata)
/// - literal IPs and DNS answers inside private, loopback or link-local ranges
#[derive(Debug, Clone)]
pub struct UrlValidator {
    allowed_schemes: HashSet<String>,
    blocked_hosts: HashSet<String>,
    blocked_cidrs: Vec<ipnet::IpNet>,

    /// Hosts that bypass every other check. Used by tests against local servers.
    allowed_hosts: HashSet<String>,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl UrlValidator {
    pub fn new() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            blocked_hosts: DEFAULT_BLOCKED_HOSTS.iter().map(|h| h.to_string()).collect(),
            blocked_cidrs: DEFAULT_BLOCKED_CIDRS
                .iter()
                .filter_map(|cidr| cidr.parse().ok())
                .collect(),
            allowed_hosts: HashSet::new(),
        }
    }

    /// Add an allowed host (bypasses validation).
    pub fn allow_host(mut self, host: impl Into<String>) -> Self {
        self.allowed_hosts.insert(host.into());
        self
    }

    /// Block an additional host.
    pub fn block_host(mut self, host: impl Into<String>) -> Self {
        self.blocked_hosts.insert(host.into());
        self
    }

    /// Block an additional CIDR range.
    pub fn block_cidr(mut self, cidr: ipnet::IpNet) -> Self {
        self.blocked_cidrs.push(cidr);
        self
    }

    /// Static checks: scheme, host, literal IP ranges.
    pub fn validate(&self, url: &str) -> SecurityResult<()> {
        let parsed = url::Url::parse(url)?;

        if !self.allowed_schemes.contains(parsed.scheme()) {
            return Err(SecurityError::DisallowedScheme(parsed.scheme().to_string()));
        }

        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;
        if self.allowed_hosts.contains(host) {
            return Ok(());
        }
        if self.blocked_hosts.contains(host) {
            return Err(SecurityError::BlockedHost(host.to_string()));
        }

        let literal = host.trim_start_matches('[').trim_end_matches(']');
        if let Ok(ip) = literal.parse::<IpAddr>() {
            self.check_ip(&ip)?;
        }

        Ok(())
    }

    /// [`validate`](Self::validate) plus a DNS lookup, so a public hostname
    /// that resolves to an internal address is rejected too.
    pub async fn validate_with_dns(&self, url: &str) -> SecurityResult<()> {
        self.validate(url)?;

        let parsed = url::Url::parse(url)?;
        let host = parsed.host_str().ok_or(SecurityError::NoHost)?;

        if self.allowed_hosts.contains(host) {
            return Ok(());
        }
        if host
            .trim_start_matches('[')
            .trim_end_matches(']')
            .parse::<IpAddr>()
            .is_ok()
        {
            return Ok(());
        }

        let port = parsed.port_or_known_default().unwrap_or(80);
        let addrs = tokio::net::lookup_host((host, port))
            .await
            .map_err(|e| SecurityError::DnsResolution(format!("{host}: {e}")))?;

        for addr in addrs {
            self.check_ip(&addr.ip()).map_err(|_| {
                SecurityError::BlockedCidr(format!("{} resolved to {}", host, addr.ip()))
            })?;
        }

        Ok(())
    }

    fn check_ip(&self, ip: &IpAddr) -> SecurityResult<()> {
        match self.blocked_cidrs.iter().find(|cidr| cidr.contains(ip)) {
            Some(_) => Err(SecurityError::BlockedCidr(ip.to_string())),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_public_http() {
        let validator = UrlValidator::new();
        assert!(validator.validate("https://acmegravure.com.my/").is_ok());
        assert!(validator.validate("http://8.8.8.8/").is_ok());
    }

    #[test]
    fn test_rejects_schemes_and_internal_hosts() {
        let validator = UrlValidator::new();
        assert!(matches!(
            validator.validate("file:///etc/passwd"),
            Err(SecurityError::DisallowedScheme(_))
        ));
        assert!(matches!(
            validator.validate("http://localhost:8080/"),
            Err(SecurityError::BlockedHost(_))
        ));
        assert!(matches!(
            validator.validate("http://169.254.169.254/latest/meta-data"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(matches!(
            validator.validate("http://10.1.2.3/"),
            Err(SecurityError::BlockedCidr(_))
        ));
        assert!(validator.validate("http://[fe80::1]/").is_err());
    }

    #[test]
    fn test_parse_failure() {
        assert!(matches!(
            UrlValidator::new().validate("not a url"),
            Err(SecurityError::UrlParse(_))
        ));
    }

    #[test]
    fn test_allow_host_bypasses_checks() {
        let validator = UrlValidator::new().allow_host("localhost");
        assert!(validator.validate("http://localhost:3000/").is_ok());
    }

    #[test]
    fn test_block_host() {
        let validator = UrlValidator::new().block_host("evil.example");
        assert!(validator.validate("https://evil.example/").is_err());
    }

    #[tokio::test]
    async fn test_dns_check_skips_literal_ips() {
        let validator = UrlValidator::new();
        assert!(validator.validate_with_dns("http://8.8.8.8/").await.is_ok());
        assert!(validator.validate_with_dns("http://127.0.0.1/").await.is_err());
    }
}
