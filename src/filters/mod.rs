//! Do-Not-Contact and terms-of-service suppression
//!
//! Both lists are runtime-mutable, process-wide services. DNC is a strict
//! equal-or-dot-suffix match and skips the site entirely; TOS is an
//! advisory substring match that only records a warning.

use std::collections::{HashMap, HashSet};
use std::sync::RwLock;

/// Domains the operator commits never to crawl
#[derive(Default)]
pub struct DncList {
    domains: RwLock<HashSet<String>>,
}

impl DncList {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a domain (lowercased) to the list
    pub fn add(&self, domain: &str) {
        self.domains
            .write()
            .unwrap()
            .insert(domain.trim().to_lowercase());
    }

    /// Removes a domain from the list
    pub fn remove(&self, domain: &str) {
        self.domains
            .write()
            .unwrap()
            .remove(&domain.trim().to_lowercase());
    }

    /// Checks whether a host is suppressed
    ///
    /// A host matches iff it equals a listed domain or is a subdomain of
    /// one; `acme.se` on the list blocks `www.acme.se` but not
    /// `notacme.se`.
    pub fn contains(&self, host: &str) -> bool {
        let host = host.to_lowercase();
        let domains = self.domains.read().unwrap();
        domains
            .iter()
            .any(|d| host == *d || host.ends_with(&format!(".{}", d)))
    }

    pub fn len(&self) -> usize {
        self.domains.read().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Platforms whose terms of service restrict automated collection
pub struct TosRegistry {
    entries: RwLock<HashMap<String, String>>,
}

impl TosRegistry {
    /// Creates the registry with the built-in platform entries
    pub fn new() -> Self {
        let mut entries = HashMap::new();
        for (domain, reason) in [
            ("linkedin.com", "LinkedIn ToS forbids automated collection"),
            ("facebook.com", "Facebook ToS forbids automated collection"),
            (
                "instagram.com",
                "Instagram ToS forbids automated collection",
            ),
            ("twitter.com", "Twitter/X ToS forbids automated collection"),
            ("x.com", "Twitter/X ToS forbids automated collection"),
        ] {
            entries.insert(domain.to_string(), reason.to_string());
        }
        Self {
            entries: RwLock::new(entries),
        }
    }

    /// Adds or replaces an entry
    pub fn add(&self, domain: &str, reason: &str) {
        self.entries
            .write()
            .unwrap()
            .insert(domain.trim().to_lowercase(), reason.to_string());
    }

    /// Removes an entry
    pub fn remove(&self, domain: &str) {
        self.entries
            .write()
            .unwrap()
            .remove(&domain.trim().to_lowercase());
    }

    /// Returns the warning for a host, if any entry is a substring of it
    pub fn warning_for(&self, host: &str) -> Option<String> {
        let host = host.to_lowercase();
        let entries = self.entries.read().unwrap();
        entries
            .iter()
            .find(|(domain, _)| host.contains(domain.as_str()))
            .map(|(_, reason)| reason.clone())
    }
}

impl Default for TosRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dnc_exact_match() {
        let dnc = DncList::new();
        dnc.add("acme.se");
        assert!(dnc.contains("acme.se"));
        assert!(dnc.contains("ACME.SE"));
    }

    #[test]
    fn test_dnc_subdomain_match() {
        let dnc = DncList::new();
        dnc.add("acme.se");
        assert!(dnc.contains("www.acme.se"));
        assert!(dnc.contains("shop.acme.se"));
    }

    #[test]
    fn test_dnc_rejects_partial_suffix() {
        let dnc = DncList::new();
        dnc.add("acme.se");
        assert!(!dnc.contains("notacme.se"));
        assert!(!dnc.contains("acme.se.evil.com"));
    }

    #[test]
    fn test_dnc_remove() {
        let dnc = DncList::new();
        dnc.add("acme.se");
        dnc.remove("acme.se");
        assert!(!dnc.contains("acme.se"));
    }

    #[test]
    fn test_tos_substring_match() {
        let tos = TosRegistry::new();
        assert!(tos.warning_for("linkedin.com").is_some());
        assert!(tos.warning_for("se.linkedin.com").is_some());
        assert!(tos.warning_for("acme.se").is_none());
    }

    #[test]
    fn test_tos_seeded_platforms() {
        let tos = TosRegistry::new();
        for host in [
            "linkedin.com",
            "facebook.com",
            "instagram.com",
            "twitter.com",
            "x.com",
        ] {
            assert!(tos.warning_for(host).is_some(), "missing entry for {}", host);
        }
    }

    #[test]
    fn test_tos_add_and_remove() {
        let tos = TosRegistry::new();
        tos.add("example.org", "test entry");
        assert_eq!(tos.warning_for("example.org").as_deref(), Some("test entry"));
        tos.remove("example.org");
        assert!(tos.warning_for("example.org").is_none());
    }
}
