//! JSON-LD structured-data extraction
//!
//! Walks `<script type="application/ld+json">` blocks looking for
//! organization-shaped items and pulls out contact fields. Malformed JSON
//! is ignored; structured data on the open web is best-effort at the best
//! of times.

use once_cell::sync::Lazy;
use scraper::{Html, Selector};
use serde_json::Value;

static JSONLD_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"script[type="application/ld+json"]"#).unwrap());

/// @type values treated as an organization
const ORG_TYPES: [&str; 5] = [
    "Organization",
    "LocalBusiness",
    "Corporation",
    "Store",
    "ProfessionalService",
];

/// Contact fields pulled out of a document's JSON-LD blocks
#[derive(Debug, Clone, Default, PartialEq)]
pub struct JsonLdContacts {
    pub emails: Vec<String>,
    pub phones: Vec<String>,
    pub same_as: Vec<String>,
}

/// Extracts organization contact data from all JSON-LD blocks
pub fn extract_jsonld(document: &Html) -> JsonLdContacts {
    let mut contacts = JsonLdContacts::default();

    for script in document.select(&JSONLD_SELECTOR) {
        let raw: String = script.text().collect();
        let value: Value = match serde_json::from_str(raw.trim()) {
            Ok(v) => v,
            Err(_) => continue,
        };
        for item in candidate_items(&value) {
            if is_organization(item) {
                collect_from_item(item, &mut contacts);
            }
        }
    }

    contacts
}

/// Flattens a JSON-LD value into the items worth inspecting
///
/// Handles a bare object, a top-level array, and the @graph envelope.
fn candidate_items(value: &Value) -> Vec<&Value> {
    let mut items = Vec::new();
    match value {
        Value::Array(arr) => {
            for v in arr {
                items.extend(candidate_items(v));
            }
        }
        Value::Object(obj) => {
            items.push(value);
            if let Some(Value::Array(graph)) = obj.get("@graph") {
                for v in graph {
                    items.extend(candidate_items(v));
                }
            }
        }
        _ => {}
    }
    items
}

/// True when an item's @type names an organization shape
fn is_organization(item: &Value) -> bool {
    match item.get("@type") {
        Some(Value::String(t)) => ORG_TYPES.contains(&t.as_str()),
        Some(Value::Array(types)) => types
            .iter()
            .filter_map(|t| t.as_str())
            .any(|t| ORG_TYPES.contains(&t)),
        _ => false,
    }
}

fn collect_from_item(item: &Value, contacts: &mut JsonLdContacts) {
    push_strings(item.get("email"), &mut contacts.emails);
    push_strings(item.get("telephone"), &mut contacts.phones);
    push_strings(item.get("sameAs"), &mut contacts.same_as);

    // contactPoint may be a single object or an array of them
    match item.get("contactPoint") {
        Some(point @ Value::Object(_)) => {
            push_strings(point.get("email"), &mut contacts.emails);
            push_strings(point.get("telephone"), &mut contacts.phones);
        }
        Some(Value::Array(points)) => {
            for point in points {
                push_strings(point.get("email"), &mut contacts.emails);
                push_strings(point.get("telephone"), &mut contacts.phones);
            }
        }
        _ => {}
    }
}

/// Appends a string or array-of-strings JSON field to `out`
fn push_strings(value: Option<&Value>, out: &mut Vec<String>) {
    match value {
        Some(Value::String(s)) if !s.trim().is_empty() => out.push(s.trim().to_string()),
        Some(Value::Array(arr)) => {
            for v in arr {
                if let Some(s) = v.as_str() {
                    if !s.trim().is_empty() {
                        out.push(s.trim().to_string());
                    }
                }
            }
        }
        _ => {}
    }
}
