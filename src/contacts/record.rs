//! Contact record emission
//!
//! Turns one site's aggregated result into the records handed back to the
//! job layer: one record per unique email, carrying the site's first phone
//! and contact page when available.

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::contacts::EmailType;
use crate::crawler::SiteResult;
use crate::extract::{DiscoverySource, Socials};

static CONTACT_PAGE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)kontakt|contact").unwrap());

/// One enriched contact, the crawler's unit of output
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactRecord {
    pub source_url: String,
    pub domain: String,
    pub email: String,
    pub email_type: EmailType,
    pub confidence: f64,
    pub discovery_path: DiscoverySource,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub contact_page: Option<String>,

    #[serde(skip_serializing_if = "Socials::is_empty", default)]
    pub social: Socials,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_evidence: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
}

/// Builds the contact records for one crawled site
///
/// Every aggregated email becomes one record. The phone is the first of
/// the site's (ordered) phone set; the contact page is the first visited
/// page whose URL looks like a contact page, falling back to the first
/// discovered contact link.
pub fn build_records(site: &SiteResult) -> Vec<ContactRecord> {
    let phone = site.phones.iter().next().cloned();
    let contact_page = site
        .source_pages
        .iter()
        .find(|page| CONTACT_PAGE_RE.is_match(page))
        .cloned()
        .or_else(|| site.contact_links.first().cloned());
    let source_url = site
        .source_pages
        .first()
        .cloned()
        .unwrap_or_else(|| site.website.clone());
    let timestamp = Utc::now().to_rfc3339();

    site.emails
        .iter()
        .map(|(email, record)| ContactRecord {
            source_url: source_url.clone(),
            domain: site.domain.clone(),
            email: email.clone(),
            email_type: record.email_type,
            confidence: record.confidence,
            discovery_path: record.discovery_path,
            phone: phone.clone(),
            contact_page: contact_page.clone(),
            social: site.socials.clone(),
            raw_evidence: Some(format!(
                "sources: {}",
                record
                    .sources
                    .iter()
                    .map(|s| s.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            )),
            timestamp: Some(timestamp.clone()),
        })
        .collect()
}
