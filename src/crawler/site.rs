//! Per-site crawl state machine
//!
//! One site crawl walks a fixed candidate page list in order, pushing each
//! URL through the full gate chain: response cache, safe-URL filter,
//! robots.txt, rate limiter, fetcher, captcha detector, extractor. Page
//! failures are recorded and never abort the site; the site result is
//! owned exclusively by its crawl task.

use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use url::Url;

use crate::contacts::email::{self, EmailType};
use crate::contacts::mask;
use crate::crawler::captcha;
use crate::crawler::fetcher::fetch_html;
use crate::crawler::CrawlContext;
use crate::extract::{extract_page, DiscoverySource, PageExtraction, Socials};
use crate::job::SiteSpec;

/// Candidate contact paths tried after the root page, in order
pub const CANDIDATE_PATHS: [&str; 6] = [
    "/kontakt",
    "/kontakta-oss",
    "/om",
    "/om-oss",
    "/about",
    "/contact",
];

/// One recorded failure, site- or page-scoped
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SiteError {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    pub reason: String,
}

/// Aggregated classification for one unique email on a site
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmailRecord {
    pub email_type: EmailType,
    pub confidence: f64,
    pub sources: Vec<DiscoverySource>,
    pub discovery_path: DiscoverySource,

    /// Whether the domain publishes MX records; only set when the MX check
    /// is enabled, and never affects classification
    #[serde(skip_serializing_if = "Option::is_none", default)]
    pub mx_valid: Option<bool>,
}

/// Everything learned about one site during its crawl
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SiteResult {
    pub company_name: String,
    pub website: String,
    pub domain: String,
    pub emails: BTreeMap<String, EmailRecord>,
    pub phones: BTreeSet<String>,
    pub socials: Socials,
    pub source_pages: Vec<String>,
    pub errors: Vec<SiteError>,
    /// Same-host contact links seen during extraction (capped per page)
    pub contact_links: Vec<String>,
}

impl SiteResult {
    fn new(site: &SiteSpec) -> Self {
        Self {
            company_name: site.company_name.clone(),
            website: site.root_url.clone(),
            domain: site.host.clone(),
            emails: BTreeMap::new(),
            phones: BTreeSet::new(),
            socials: Socials::default(),
            source_pages: Vec::new(),
            errors: Vec::new(),
            contact_links: Vec::new(),
        }
    }

    /// Merges one page's extraction into the running aggregate
    ///
    /// New emails are classified and scored once, on first sighting;
    /// repeat sightings only append their source. Social fields keep the
    /// first non-empty value. Metric counters see only genuinely new
    /// contacts.
    pub fn merge_page(&mut self, page_url: &str, extraction: &PageExtraction, ctx: &CrawlContext) {
        if !self.source_pages.iter().any(|p| p == page_url) {
            self.source_pages.push(page_url.to_string());
        }

        if !extraction.result.emails.is_empty() || !extraction.result.phones.is_empty() {
            tracing::debug!(
                "Extracted from {}: emails [{}], phones [{}]",
                page_url,
                mask::mask_emails(extraction.result.emails.iter().map(|e| &e.email)).join(", "),
                mask::mask_phones(extraction.result.phones.iter()).join(", ")
            );
        }

        let mut new_emails = 0u64;
        for evidence in &extraction.result.emails {
            if let Some(existing) = self.emails.get_mut(&evidence.email) {
                if !existing.sources.contains(&evidence.source) {
                    existing.sources.push(evidence.source);
                }
            } else {
                let email_type = email::classify(&evidence.email, &self.domain);
                let score = email::score(&evidence.email, email_type, &self.domain);
                self.emails.insert(
                    evidence.email.clone(),
                    EmailRecord {
                        email_type,
                        confidence: f64::from(score) / 100.0,
                        sources: vec![evidence.source],
                        discovery_path: evidence.source,
                        mx_valid: None,
                    },
                );
                new_emails += 1;
            }
        }

        let mut new_phones = 0u64;
        for phone in &extraction.result.phones {
            if self.phones.insert(phone.clone()) {
                new_phones += 1;
            }
        }

        let socials_before = self.socials.count();
        self.socials.adopt_missing(&extraction.result.socials);
        let new_socials = (self.socials.count() - socials_before) as u64;

        for link in &extraction.contact_links {
            if !self.contact_links.iter().any(|l| l == link) {
                self.contact_links.push(link.clone());
            }
        }

        ctx.metrics.add_contacts_found("email", new_emails);
        ctx.metrics.add_contacts_found("phone", new_phones);
        ctx.metrics.add_contacts_found("social", new_socials);
    }
}

/// Crawls one site through the shared context
pub struct SiteCrawler<'a> {
    ctx: &'a CrawlContext,
}

impl<'a> SiteCrawler<'a> {
    pub fn new(ctx: &'a CrawlContext) -> Self {
        Self { ctx }
    }

    /// Runs the full per-site state machine
    pub async fn crawl_site(&self, site: &SiteSpec, max_pages: u32) -> SiteResult {
        let mut result = SiteResult::new(site);

        if self.ctx.dnc.contains(&site.host) {
            tracing::info!("Skipping {}: on Do-Not-Contact list", site.host);
            result.errors.push(SiteError {
                url: None,
                reason: "Domain on Do-Not-Contact list".to_string(),
            });
            return result;
        }

        if let Some(warning) = self.ctx.tos.warning_for(&site.host) {
            tracing::warn!("{}: {}", site.host, warning);
            result.errors.push(SiteError {
                url: None,
                reason: warning,
            });
        }

        for url in candidate_urls(&site.root_url, max_pages) {
            tokio::time::sleep(self.ctx.settings.between_requests).await;

            match self.crawl_url(&url, &site.host).await {
                Ok(Some(extraction)) => {
                    result.merge_page(url.as_str(), &extraction, self.ctx);
                }
                Ok(None) => {}
                Err(reason) => {
                    tracing::debug!("Page failed for {}: {}", url, reason);
                    result.errors.push(SiteError {
                        url: Some(url.to_string()),
                        reason,
                    });
                }
            }
        }

        if self.ctx.settings.enable_mx_check {
            if let Some(resolver) = &self.ctx.resolver {
                for (address, record) in result.emails.iter_mut() {
                    if let Some((_, domain)) = email::split_parts(address) {
                        record.mx_valid = Some(email::mx_valid(resolver, domain).await);
                    }
                }
            }
        }

        tracing::info!(
            "Crawled {}: {} emails, {} phones, {} pages",
            site.host,
            result.emails.len(),
            result.phones.len(),
            result.source_pages.len()
        );

        result
    }

    /// Fetches and extracts one URL through every gate
    ///
    /// `Ok(None)` is a silent, polite skip (robots disallow). `Err` carries
    /// the reason recorded on the site's error list.
    pub async fn crawl_url(
        &self,
        url: &Url,
        host: &str,
    ) -> Result<Option<PageExtraction>, String> {
        if let Some(cached) = self.ctx.cache.get(url.as_str()).await {
            tracing::debug!("Cache hit for {}", url);
            return Ok(Some(PageExtraction {
                result: cached,
                contact_links: Vec::new(),
            }));
        }

        let verdict = self.ctx.safety.is_safe(url).await;
        if !verdict.safe {
            return Err(verdict
                .reason
                .unwrap_or_else(|| "URL blocked by safety filter".to_string()));
        }

        let decision = self
            .ctx
            .robots
            .is_allowed(url, &self.ctx.settings.bot_name)
            .await;
        if !decision.allowed {
            tracing::debug!("robots.txt disallows {}", url);
            self.ctx.metrics.inc_request("robots-blocked", host);
            self.ctx.metrics.inc_robots_blocked(host);
            return Ok(None);
        }

        if decision.crawl_delay > 0.0 {
            let delay =
                Duration::from_secs_f64(decision.crawl_delay).max(self.ctx.settings.between_requests);
            tokio::time::sleep(delay).await;
        }

        let html = self
            .ctx
            .limiter
            .run_with_retry(
                host,
                || fetch_html(&self.ctx.client, url, &self.ctx.settings, &self.ctx.metrics),
                |e| e.is_transient(),
            )
            .await
            .map_err(|e| e.to_string())?;

        if let Some(hit) = captcha::detect(&html) {
            self.ctx.metrics.inc_request("captcha", host);
            return Err(hit.reason);
        }

        let extraction = extract_page(&html, url);
        self.ctx.cache.set(url.as_str(), &extraction.result).await;

        Ok(Some(extraction))
    }
}

/// Builds the candidate URL list for a site, truncated to `max_pages`
pub fn candidate_urls(root_url: &str, max_pages: u32) -> Vec<Url> {
    let Ok(root) = Url::parse(root_url) else {
        return Vec::new();
    };

    let mut urls = vec![root.clone()];
    for path in CANDIDATE_PATHS {
        if let Ok(url) = root.join(path) {
            urls.push(url);
        }
    }
    urls.truncate(max_pages as usize);
    urls
}
