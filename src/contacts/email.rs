//! Email cleaning, classification and scoring
//!
//! Every extracted address runs through the cleaning pipeline before it may
//! enter a site result. Classification happens once per unique address per
//! site; the score maps to the record confidence as `score / 100`.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use trust_dns_resolver::TokioAsyncResolver;

/// Localparts that mark a shared, role-based mailbox
static ROLE_LOCALPART_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(info|kontakt|support|sales|kundtjanst|office|hej|hello|contact|admin|webmaster|inquiry|service)$",
    )
    .unwrap()
});

/// Consumer mail providers
static PERSONAL_DOMAIN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"@(gmail|hotmail|outlook|yahoo|live|icloud|protonmail|me\.com|aol|gmx|mail\.com)")
        .unwrap()
});

static NOREPLY_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"noreply|no-reply|donotreply").unwrap());

static TESTLIKE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"test|example|placeholder").unwrap());

/// Addresses discarded outright during cleaning
static JUNK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"example\.com|user@domain\.com|noreply|donotreply|no-reply|test@|placeholder|u003e")
        .unwrap()
});

/// Strict address shape: printable localpart, dotted domain, alphabetic TLD
static FORMAT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^[a-z0-9][a-z0-9._%+-]*@[a-z0-9][a-z0-9.-]*\.[a-z]{2,24}$").unwrap()
});

/// TLDs a contact record may carry
const ALLOWED_TLDS: [&str; 6] = ["se", "com", "info", "nu", "org", "net"];

/// Classification of an email address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EmailType {
    /// Shared mailbox tied to a function (info@, kontakt@)
    Role,
    /// Consumer mail provider
    Personal,
    /// Machine or throwaway mailbox on the company domain
    Generic,
    /// No signal either way
    Unknown,
}

impl EmailType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Role => "role",
            Self::Personal => "personal",
            Self::Generic => "generic",
            Self::Unknown => "unknown",
        }
    }
}

/// Runs the cleaning pipeline on a raw extracted address
///
/// Lowercases and trims, rejects junk patterns, validates the format, and
/// enforces the TLD allowlist. Returns the cleaned address or None.
pub fn clean_email(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || JUNK_RE.is_match(&email) {
        return None;
    }
    if !is_valid_format(&email) {
        return None;
    }
    let (_, domain) = split_parts(&email)?;
    let tld = domain.rsplit('.').next()?;
    if !ALLOWED_TLDS.contains(&tld) {
        return None;
    }
    Some(email)
}

/// Strict format check on an already-lowercased address
pub fn is_valid_format(email: &str) -> bool {
    if email.contains("..") || email.matches('@').count() != 1 {
        return false;
    }
    FORMAT_RE.is_match(email)
}

/// Splits an address into (localpart, domain)
pub fn split_parts(email: &str) -> Option<(&str, &str)> {
    let (local, domain) = email.split_once('@')?;
    if local.is_empty() || domain.is_empty() {
        return None;
    }
    Some((local, domain))
}

/// Whether the address lives on the site's own domain
///
/// Matches when one side equals the other or is a subdomain of it, so
/// `shop.acme.se` still owns `info@acme.se`. The boundary must be a label
/// dot; `verkstad.se` does not own `bilverkstad.se`.
pub fn is_company_domain(site_host: &str, email_domain: &str) -> bool {
    site_host == email_domain
        || site_host.ends_with(&format!(".{}", email_domain))
        || email_domain.ends_with(&format!(".{}", site_host))
}

/// Classifies an address relative to the site being crawled
pub fn classify(email: &str, site_host: &str) -> EmailType {
    let Some((local, domain)) = split_parts(email) else {
        return EmailType::Unknown;
    };

    if ROLE_LOCALPART_RE.is_match(local) {
        return EmailType::Role;
    }

    if PERSONAL_DOMAIN_RE.is_match(email) {
        return EmailType::Personal;
    }

    if is_company_domain(site_host, domain) {
        let looks_generic = is_short_alpha(local) || local.starts_with("no-reply")
            || local.starts_with("noreply");
        return if looks_generic {
            EmailType::Generic
        } else {
            EmailType::Role
        };
    }

    EmailType::Unknown
}

fn is_short_alpha(local: &str) -> bool {
    (1..=2).contains(&local.len()) && local.chars().all(|c| c.is_ascii_alphabetic())
}

/// Scores an address on a 0-100 scale
///
/// Starts at 50 and applies additive signals; the result is clamped. The
/// record confidence is this value divided by 100. A role mailbox on the
/// company's own domain (info@example.se on example.se) lands at 90.
pub fn score(email: &str, email_type: EmailType, site_host: &str) -> u8 {
    let mut score: i32 = 50;
    let mut role_localpart = false;

    if let Some((local, domain)) = split_parts(email) {
        if is_company_domain(site_host, domain) {
            score += 30;
        }
        role_localpart = ROLE_LOCALPART_RE.is_match(local);
        // Junk penalties target the mailbox, not the company name; a domain
        // like testfirma.se must not sink its own addresses
        if NOREPLY_RE.is_match(local) {
            score -= 50;
        }
        if TESTLIKE_RE.is_match(local) {
            score -= 50;
        }
    }

    // A role localpart already carries its own bonus; the type bonus covers
    // classifications derived from the domain, so the two never stack
    if role_localpart {
        score += 10;
    } else {
        score += match email_type {
            EmailType::Role => 20,
            EmailType::Personal => -10,
            EmailType::Generic => -20,
            EmailType::Unknown => 0,
        };
    }

    score.clamp(0, 100) as u8
}

/// Checks whether the address domain publishes MX records
///
/// Gated behind ENABLE_MX_CHECK; the outcome never changes classification.
pub async fn mx_valid(resolver: &TokioAsyncResolver, domain: &str) -> bool {
    match resolver.mx_lookup(domain).await {
        Ok(lookup) => lookup.iter().next().is_some(),
        Err(e) => {
            tracing::debug!("MX lookup failed for {}: {}", domain, e);
            false
        }
    }
}
