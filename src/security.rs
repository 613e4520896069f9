use crate::error::PreviewError;
use std::collections::HashSet;
use std::net::IpAddr;
use url::Url;

/// Turns an extracted token into an absolute URL.
///
/// Text often carries links without a scheme (`www.example.com/a`); those are
/// assumed to be `http`.
pub fn normalize_target(raw: &str) -> Result<Url, PreviewError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(PreviewError::InvalidUrl("empty URL".to_string()));
    }
    if raw.contains("://") {
        Ok(Url::parse(raw)?)
    } else {
        Ok(Url::parse(&format!("http://{raw}"))?)
    }
}

/// Which targets the HTTP fetcher is willing to contact.
#[derive(Debug, Clone)]
pub struct UrlValidationConfig {
    /// Defaults to `http` and `https`.
    pub allowed_schemes: HashSet<String>,
    pub block_private_ips: bool,
    pub block_localhost: bool,
    pub blocked_domains: HashSet<String>,
    /// When non-empty, only these domains (and their subdomains) pass.
    pub allowed_domains: HashSet<String>,
}

impl Default for UrlValidationConfig {
    fn default() -> Self {
        Self {
            allowed_schemes: ["http", "https"].into_iter().map(String::from).collect(),
            block_private_ips: true,
            block_localhost: true,
            blocked_domains: HashSet::new(),
            allowed_domains: HashSet::new(),
        }
    }
}

impl UrlValidationConfig {
    /// Permits everything reachable over http(s), including local addresses.
    pub fn permissive() -> Self {
        Self {
            block_private_ips: false,
            block_localhost: false,
            ..Self::default()
        }
    }

    pub fn with_blocked_domain(mut self, domain: impl Into<String>) -> Self {
        self.blocked_domains.insert(domain.into());
        self
    }

    pub fn with_allowed_domain(mut self, domain: impl Into<String>) -> Self {
        self.allowed_domains.insert(domain.into());
        self
    }
}

#[derive(Debug, Clone)]
pub struct UrlValidator {
    config: UrlValidationConfig,
}

impl Default for UrlValidator {
    fn default() -> Self {
        Self::with_default_config()
    }
}

impl UrlValidator {
    pub fn new(config: UrlValidationConfig) -> Self {
        Self { config }
    }

    pub fn with_default_config() -> Self {
        Self::new(UrlValidationConfig::default())
    }

    /// Normalizes `raw` and checks it against the policy.
    pub fn validate(&self, raw: &str) -> Result<Url, PreviewError> {
        let url = normalize_target(raw)?;

        if !self.config.allowed_schemes.contains(url.scheme()) {
            return Err(PreviewError::InvalidUrlScheme(url.scheme().to_string()));
        }

        let host = url
            .host_str()
            .ok_or_else(|| PreviewError::InvalidUrl(format!("{raw} has no host")))?;

        if !self.config.allowed_domains.is_empty() {
            if !matches_domain(&self.config.allowed_domains, host) {
                return Err(PreviewError::DomainNotAllowed(host.to_string()));
            }
        } else if matches_domain(&self.config.blocked_domains, host) {
            return Err(PreviewError::DomainBlocked(host.to_string()));
        }

        if self.config.block_localhost && is_localhost(host) {
            return Err(PreviewError::LocalhostBlocked);
        }

        if self.config.block_private_ips {
            let bare = host.trim_start_matches('[').trim_end_matches(']');
            if let Ok(ip) = bare.parse::<IpAddr>() {
                if is_private_ip(&ip) {
                    return Err(PreviewError::PrivateIpBlocked(ip.to_string()));
                }
            }
        }

        Ok(url)
    }
}

fn matches_domain(domains: &HashSet<String>, host: &str) -> bool {
    domains
        .iter()
        .any(|domain| host == domain || host.ends_with(&format!(".{domain}")))
}

fn is_localhost(host: &str) -> bool {
    matches!(host, "localhost" | "127.0.0.1" | "::1" | "[::1]") || host.ends_with(".localhost")
}

fn is_private_ip(ip: &IpAddr) -> bool {
    match ip {
        IpAddr::V4(v4) => {
            let octets = v4.octets();
            v4.is_private()
                || v4.is_loopback()
                || v4.is_link_local()
                || v4.is_unspecified()
                || v4.is_broadcast()
                || v4.is_multicast()
                // 100.64.0.0/10, carrier-grade NAT
                || (octets[0] == 100 && (octets[1] & 0b1100_0000) == 0b0100_0000)
                // 240.0.0.0/4
                || octets[0] >= 240
        }
        IpAddr::V6(v6) => {
            let first = v6.segments()[0];
            v6.is_loopback()
                || v6.is_unspecified()
                // fe80::/10
                || (first & 0xffc0) == 0xfe80
                // fc00::/7
                || (first & 0xfe00) == 0xfc00
        }
    }
}
