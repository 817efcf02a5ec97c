//! Captcha and bot-challenge detection
//!
//! Pattern-based only: a page that trips these markers is skipped, never
//! solved. Detection runs on the raw HTML before parsing.

use once_cell::sync::Lazy;
use regex::Regex;

static CHALLENGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)recaptcha|g-recaptcha|grecaptcha|hcaptcha|cloudflare|cf-browser-verification|challenge-platform|just a moment|attention required",
    )
    .unwrap()
});

static RECAPTCHA_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)recaptcha|g-recaptcha|grecaptcha").unwrap());

static HCAPTCHA_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(?i)hcaptcha").unwrap());

/// A detected challenge page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaHit {
    /// Challenge vendor: recaptcha, hcaptcha or cloudflare
    pub kind: &'static str,

    /// Human-readable skip reason recorded on the site result
    pub reason: String,
}

/// Scans HTML for challenge markers
///
/// Kind resolution order: recaptcha, then hcaptcha, then everything else
/// is attributed to Cloudflare (its interstitials carry most of the
/// remaining patterns).
pub fn detect(html: &str) -> Option<CaptchaHit> {
    if !CHALLENGE_RE.is_match(html) {
        return None;
    }

    let kind = if RECAPTCHA_RE.is_match(html) {
        "recaptcha"
    } else if HCAPTCHA_RE.is_match(html) {
        "hcaptcha"
    } else {
        "cloudflare"
    };

    Some(CaptchaHit {
        kind,
        reason: format!("Captcha detected ({})", kind),
    })
}
