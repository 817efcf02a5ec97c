//! Contact extraction from HTML pages
//!
//! Four independent sub-extractors run over one parsed document: JSON-LD
//! organization blocks, mailto anchors, footer mailto anchors, and inline
//! body text. Their evidence is merged, cleaned, and deduplicated into a
//! per-URL `PageResult` — the cacheable unit of the whole pipeline.

mod jsonld;
mod page;

pub use page::{extract_page, is_contact_like_path, PageExtraction};

use serde::{Deserialize, Serialize};

/// Which extractor branch first surfaced an email
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DiscoverySource {
    JsonLd,
    Mailto,
    Footer,
    Inline,
}

impl DiscoverySource {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::JsonLd => "json-ld",
            Self::Mailto => "mailto",
            Self::Footer => "footer",
            Self::Inline => "inline",
        }
    }
}

impl std::fmt::Display for DiscoverySource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One extracted email with its provenance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailEvidence {
    pub email: String,
    pub source: DiscoverySource,
    pub confidence: f64,
}

/// Social profile links for one site
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Socials {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub linkedin: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub facebook: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub x: Option<String>,
}

impl Socials {
    pub fn is_empty(&self) -> bool {
        self.linkedin.is_none() && self.facebook.is_none() && self.x.is_none()
    }

    /// Fills each empty field from `other`; existing values are never
    /// overwritten
    pub fn adopt_missing(&mut self, other: &Socials) {
        if self.linkedin.is_none() {
            self.linkedin = other.linkedin.clone();
        }
        if self.facebook.is_none() {
            self.facebook = other.facebook.clone();
        }
        if self.x.is_none() {
            self.x = other.x.clone();
        }
    }

    /// Number of populated fields
    pub fn count(&self) -> usize {
        [&self.linkedin, &self.facebook, &self.x]
            .iter()
            .filter(|v| v.is_some())
            .count()
    }
}

/// Per-URL crawl result: the cacheable value
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PageResult {
    pub emails: Vec<EmailEvidence>,
    pub phones: Vec<String>,
    pub socials: Socials,
}
