//! Page-level extraction
//!
//! Runs the sub-extractors over one HTML document, cleans every address,
//! normalizes every phone candidate, and merges the evidence into a
//! `PageResult`. Parsing is fully synchronous; no document handle outlives
//! this module.

use std::collections::HashSet;

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{Html, Selector};
use url::Url;

use crate::contacts::{email, phone};
use crate::extract::jsonld::extract_jsonld;
use crate::extract::{DiscoverySource, EmailEvidence, PageResult, Socials};

const JSONLD_CONFIDENCE: f64 = 0.95;
const MAILTO_CONFIDENCE: f64 = 0.85;
const FOOTER_CONFIDENCE: f64 = 0.60;
const INLINE_CONTACT_CONFIDENCE: f64 = 0.70;
const INLINE_CONFIDENCE: f64 = 0.50;

/// Cap on discovered same-host contact links
const MAX_CONTACT_LINKS: usize = 5;

static MAILTO_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"a[href^="mailto:"]"#).unwrap());

static FOOTER_MAILTO_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"footer a[href^="mailto:"]"#).unwrap());

static TEL_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse(r#"a[href^="tel:"]"#).unwrap());

static ANCHOR_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("a[href]").unwrap());

static BODY_SELECTOR: Lazy<Selector> = Lazy::new(|| Selector::parse("body").unwrap());

static INLINE_EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)[A-Z0-9._%+-]+@[A-Z0-9.-]+\.[A-Z]{2,24}").unwrap());

/// Paths and anchor texts that smell like contact pages
static KEY_PAGES_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)(kontakt|kontakta|about|om|team|medarbetare|personal|ledning|contact)")
        .unwrap()
});

/// Everything extracted from one page
#[derive(Debug, Clone, Default)]
pub struct PageExtraction {
    /// Cleaned, per-page-deduplicated contact data
    pub result: PageResult,

    /// Same-host links that look like contact pages (capped)
    pub contact_links: Vec<String>,
}

/// Whether a URL path looks like a contact or team page
pub fn is_contact_like_path(path: &str) -> bool {
    KEY_PAGES_RE.is_match(path)
}

/// Extracts and cleans all contact evidence from a page
pub fn extract_page(html: &str, page_url: &Url) -> PageExtraction {
    let document = Html::parse_document(html);

    let body_text = body_text(&document);
    let structured = extract_jsonld(&document);

    // Evidence in source order; the first sighting of an address wins, so
    // higher-confidence extractors run first
    let mut evidence: Vec<(String, DiscoverySource, f64)> = Vec::new();

    for raw in &structured.emails {
        evidence.push((raw.clone(), DiscoverySource::JsonLd, JSONLD_CONFIDENCE));
    }

    for anchor in document.select(&MAILTO_SELECTOR) {
        if let Some(href) = anchor.value().attr("href") {
            evidence.push((
                mailto_address(href),
                DiscoverySource::Mailto,
                MAILTO_CONFIDENCE,
            ));
        }
    }

    for anchor in document.select(&FOOTER_MAILTO_SELECTOR) {
        if let Some(href) = anchor.value().attr("href") {
            evidence.push((
                mailto_address(href),
                DiscoverySource::Footer,
                FOOTER_CONFIDENCE,
            ));
        }
    }

    let inline_confidence = if is_contact_like_path(page_url.path()) {
        INLINE_CONTACT_CONFIDENCE
    } else {
        INLINE_CONFIDENCE
    };
    for found in INLINE_EMAIL_RE.find_iter(&body_text) {
        evidence.push((
            found.as_str().to_string(),
            DiscoverySource::Inline,
            inline_confidence,
        ));
    }

    // Clean and dedupe within the page
    let mut seen = HashSet::new();
    let mut emails = Vec::new();
    for (raw, source, confidence) in evidence {
        if let Some(cleaned) = email::clean_email(&raw) {
            if seen.insert(cleaned.clone()) {
                emails.push(EmailEvidence {
                    email: cleaned,
                    source,
                    confidence,
                });
            }
        }
    }

    let phones = collect_phones(&document, &structured.phones, &body_text);
    let socials = socials_from_same_as(&structured.same_as);
    let contact_links = discover_contact_links(&document, page_url);

    PageExtraction {
        result: PageResult {
            emails,
            phones,
            socials,
        },
        contact_links,
    }
}

/// Joins all body text of the document
fn body_text(document: &Html) -> String {
    let texts: Vec<&str> = match document.select(&BODY_SELECTOR).next() {
        Some(body) => body.text().collect(),
        None => document.root_element().text().collect(),
    };
    texts.join(" ")
}

/// Strips the mailto: scheme and any query from an anchor href
fn mailto_address(href: &str) -> String {
    let without_scheme = href.trim_start_matches("mailto:");
    match without_scheme.split_once('?') {
        Some((address, _)) => address.to_string(),
        None => without_scheme.to_string(),
    }
}

/// Normalizes phone candidates from tel: links, JSON-LD, and body text
fn collect_phones(document: &Html, structured: &[String], body_text: &str) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut phones = Vec::new();

    let mut push = |number: Option<String>| {
        if let Some(n) = number {
            if seen.insert(n.clone()) {
                phones.push(n);
            }
        }
    };

    for anchor in document.select(&TEL_SELECTOR) {
        if let Some(href) = anchor.value().attr("href") {
            push(phone::normalize(href.trim_start_matches("tel:")));
        }
    }

    for raw in structured {
        push(phone::normalize(raw));
    }

    for number in phone::parse_all(body_text) {
        push(Some(number));
    }

    phones
}

/// Routes sameAs links into social fields by hostname substring
fn socials_from_same_as(same_as: &[String]) -> Socials {
    let mut socials = Socials::default();
    for link in same_as {
        let lower = link.to_lowercase();
        if lower.contains("linkedin") {
            socials.linkedin.get_or_insert_with(|| link.clone());
        } else if lower.contains("facebook") {
            socials.facebook.get_or_insert_with(|| link.clone());
        } else if lower.contains("twitter") || lower.contains("x.com") {
            socials.x.get_or_insert_with(|| link.clone());
        }
    }
    socials
}

/// Collects same-host anchors that look like contact pages
fn discover_contact_links(document: &Html, page_url: &Url) -> Vec<String> {
    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for anchor in document.select(&ANCHOR_SELECTOR) {
        if links.len() >= MAX_CONTACT_LINKS {
            break;
        }
        let Some(href) = anchor.value().attr("href") else {
            continue;
        };
        let href = href.trim();
        if href.is_empty()
            || href.starts_with('#')
            || href.starts_with("mailto:")
            || href.starts_with("tel:")
            || href.starts_with("javascript:")
        {
            continue;
        }

        let Ok(resolved) = page_url.join(href) else {
            continue;
        };
        if resolved.host_str() != page_url.host_str() {
            continue;
        }

        let text: String = anchor.text().collect::<Vec<_>>().join(" ");
        if !is_contact_like_path(resolved.path()) && !KEY_PAGES_RE.is_match(&text) {
            continue;
        }

        let link = resolved.to_string();
        if seen.insert(link.clone()) {
            links.push(link);
        }
    }

    links
}
