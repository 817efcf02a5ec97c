//! Safe-URL gate
//!
//! Blocks requests that would let the crawler probe private or loopback
//! networks: non-HTTP(S) schemes, private/reserved IP literals, and
//! hostnames whose DNS records resolve into a blocked range (the
//! DNS-rebinding guard).

use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use trust_dns_resolver::config::{ResolverConfig, ResolverOpts};
use trust_dns_resolver::TokioAsyncResolver;
use url::{Host, Url};

/// Outcome of a safety check
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SafetyVerdict {
    /// Whether the URL may be fetched
    pub safe: bool,

    /// Why the URL was blocked, when it was
    pub reason: Option<String>,
}

impl SafetyVerdict {
    fn allowed() -> Self {
        Self {
            safe: true,
            reason: None,
        }
    }

    fn blocked(reason: impl Into<String>) -> Self {
        Self {
            safe: false,
            reason: Some(reason.into()),
        }
    }
}

/// SSRF filter with a DNS-rebinding guard
///
/// IP literals are checked directly against the blocklist. Hostnames are
/// resolved first, and the URL is rejected if any resolved address falls in
/// a blocked range. DNS failure is non-fatal: the fetcher will fail
/// naturally on an unresolvable host.
pub struct SafetyGate {
    resolver: Option<TokioAsyncResolver>,
    allow_private: bool,
}

impl SafetyGate {
    /// Creates a gate with a system-default DNS resolver
    pub fn new() -> Self {
        let resolver =
            match TokioAsyncResolver::tokio(ResolverConfig::default(), ResolverOpts::default()) {
                Ok(r) => Some(r),
                Err(e) => {
                    tracing::warn!("DNS resolver unavailable, rebinding guard disabled: {}", e);
                    None
                }
            };
        Self {
            resolver,
            allow_private: false,
        }
    }

    /// Creates a gate that never resolves hostnames (IP-literal checks only)
    ///
    /// Used in tests and in environments without DNS.
    pub fn without_resolver() -> Self {
        Self {
            resolver: None,
            allow_private: false,
        }
    }

    /// Creates a gate that only enforces the scheme check
    ///
    /// For deliberately crawling private address space: integration tests
    /// against a local mock server, or intranet deployments.
    pub fn allowing_private_targets() -> Self {
        Self {
            resolver: None,
            allow_private: true,
        }
    }

    /// Checks whether a URL is safe to fetch
    pub async fn is_safe(&self, url: &Url) -> SafetyVerdict {
        let scheme = url.scheme();
        if scheme != "http" && scheme != "https" {
            return SafetyVerdict::blocked(format!("Unsupported scheme '{}'", scheme));
        }

        if self.allow_private {
            return SafetyVerdict::allowed();
        }

        let host = match url.host() {
            Some(h) => h,
            None => return SafetyVerdict::blocked("URL has no host"),
        };

        match host {
            Host::Ipv4(addr) => match blocked_range(IpAddr::V4(addr)) {
                Some(range) => {
                    SafetyVerdict::blocked(format!("Private IP address blocked ({})", range))
                }
                None => SafetyVerdict::allowed(),
            },
            Host::Ipv6(addr) => match blocked_range(IpAddr::V6(addr)) {
                Some(range) => {
                    SafetyVerdict::blocked(format!("Private IP address blocked ({})", range))
                }
                None => SafetyVerdict::allowed(),
            },
            Host::Domain(name) => self.check_resolved(name).await,
        }
    }

    /// Resolves a hostname and rejects it if any address is blocked
    async fn check_resolved(&self, name: &str) -> SafetyVerdict {
        let resolver = match &self.resolver {
            Some(r) => r,
            None => return SafetyVerdict::allowed(),
        };

        match resolver.lookup_ip(name).await {
            Ok(lookup) => {
                for addr in lookup.iter() {
                    if let Some(range) = blocked_range(addr) {
                        return SafetyVerdict::blocked(format!(
                            "Host '{}' resolves to blocked address {} ({})",
                            name, addr, range
                        ));
                    }
                }
                SafetyVerdict::allowed()
            }
            Err(e) => {
                tracing::debug!("DNS lookup failed for {}: {}", name, e);
                SafetyVerdict::allowed()
            }
        }
    }
}

impl Default for SafetyGate {
    fn default() -> Self {
        Self::new()
    }
}

/// Returns the name of the blocked range an address falls into, if any
pub fn blocked_range(addr: IpAddr) -> Option<&'static str> {
    match addr {
        IpAddr::V4(v4) => blocked_v4_range(v4),
        IpAddr::V6(v6) => blocked_v6_range(v6),
    }
}

fn blocked_v4_range(addr: Ipv4Addr) -> Option<&'static str> {
    let octets = addr.octets();
    if addr.is_loopback() {
        Some("loopback")
    } else if addr.is_private() {
        Some("rfc1918")
    } else if addr.is_link_local() {
        Some("link-local")
    } else if octets[0] == 0 {
        Some("this-network")
    } else {
        None
    }
}

fn blocked_v6_range(addr: Ipv6Addr) -> Option<&'static str> {
    let segments = addr.segments();
    if addr.is_loopback() {
        Some("loopback")
    } else if segments[0] & 0xffc0 == 0xfe80 {
        Some("link-local")
    } else if segments[0] & 0xfe00 == 0xfc00 {
        Some("unique-local")
    } else if let Some(mapped) = addr.to_ipv4_mapped() {
        blocked_v4_range(mapped)
    } else {
        None
    }
}
