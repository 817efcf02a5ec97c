//! Phone candidate discovery and E.164 normalization
//!
//! Candidates come from tel: links and body text. Sweden is the default
//! region: a leading 0 trunk prefix is rewritten to +46, and only valid
//! Swedish numbers survive normalization.

use once_cell::sync::Lazy;
use regex::Regex;

/// Loose candidate shape: digits with common separators, bounded by digits
static CANDIDATE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\+?\d[\d\s().\-]{5,}\d").unwrap());

/// Normalized Swedish number: +46, no trunk zero, 7-10 subscriber digits
static SWEDISH_E164_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^\+46[1-9]\d{6,9}$").unwrap());

/// Finds raw phone candidates in free text
pub fn find_candidates(text: &str) -> Vec<String> {
    CANDIDATE_RE
        .find_iter(text)
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Normalizes one candidate to E.164, or rejects it
///
/// Separators are stripped, the Swedish trunk prefix is rewritten, and the
/// result must be a plausible Swedish number: 9-15 characters, +46 country
/// code, and no digit repeated seven or more times in a row.
pub fn normalize(candidate: &str) -> Option<String> {
    let stripped: String = candidate
        .chars()
        .filter(|c| !matches!(c, '(' | ')' | '.' | '-') && !c.is_whitespace())
        .collect();

    let number = if let Some(tail) = stripped.strip_prefix('0') {
        format!("+46{}", tail)
    } else {
        stripped
    };

    if !number.starts_with('+') {
        return None;
    }
    if !(9..=15).contains(&number.len()) {
        return None;
    }
    if !SWEDISH_E164_RE.is_match(&number) {
        return None;
    }
    if has_long_repeat(&number, 7) {
        return None;
    }

    Some(number)
}

/// Extracts, normalizes and deduplicates all numbers in a text
pub fn parse_all(text: &str) -> Vec<String> {
    let mut seen = std::collections::HashSet::new();
    let mut numbers = Vec::new();
    for candidate in find_candidates(text) {
        if let Some(number) = normalize(&candidate) {
            if seen.insert(number.clone()) {
                numbers.push(number);
            }
        }
    }
    numbers
}

/// True when any character repeats at least `limit` times consecutively
fn has_long_repeat(s: &str, limit: usize) -> bool {
    let mut run = 0;
    let mut prev = None;
    for c in s.chars() {
        if Some(c) == prev {
            run += 1;
        } else {
            run = 1;
            prev = Some(c);
        }
        if run >= limit {
            return true;
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_trunk_zero() {
        assert_eq!(
            normalize("0812345678"),
            Some("+46812345678".to_string())
        );
    }

    #[test]
    fn test_normalize_already_international() {
        assert_eq!(normalize("+4684002227"), Some("+4684002227".to_string()));
    }

    #[test]
    fn test_normalize_strips_separators() {
        assert_eq!(
            normalize("08-12 34 56 78"),
            Some("+46812345678".to_string())
        );
        assert_eq!(
            normalize("+46 (0) 8.12.34.56"),
            None // the (0) leaves a trunk zero inside the number
        );
        assert_eq!(
            normalize("070-123 45 67"),
            Some("+46701234567".to_string())
        );
    }

    #[test]
    fn test_normalize_rejects_missing_plus() {
        assert_eq!(normalize("812345678"), None);
    }

    #[test]
    fn test_normalize_rejects_foreign_country_code() {
        assert_eq!(normalize("+4512345678"), None);
        assert_eq!(normalize("+15551234567"), None);
    }

    #[test]
    fn test_normalize_rejects_trunk_zero_after_country_code() {
        assert_eq!(normalize("+46012345678"), None);
    }

    #[test]
    fn test_normalize_rejects_too_short_and_too_long() {
        assert_eq!(normalize("+46123"), None);
        assert_eq!(normalize("+4612345678901234"), None);
    }

    #[test]
    fn test_normalize_rejects_repeated_digits() {
        assert_eq!(normalize("+4600000000"), None);
        assert_eq!(normalize("+4611111111111"), None);
    }

    #[test]
    fn test_normalize_is_idempotent() {
        let normalized = normalize("08-400 22 27").unwrap();
        assert_eq!(normalize(&normalized), Some(normalized.clone()));
    }

    #[test]
    fn test_find_candidates_in_text() {
        let text = "Ring oss: 08-12 34 56 78 eller +46 70 123 45 67!";
        let candidates = find_candidates(text);
        assert_eq!(candidates.len(), 2);
    }

    #[test]
    fn test_parse_all_dedupes() {
        let text = "08-12 34 56 78 ... 081 234 56 78 ... 08 12 34 56 78";
        let numbers = parse_all(text);
        assert_eq!(numbers, vec!["+46812345678".to_string()]);
    }

    #[test]
    fn test_parse_all_skips_invalid() {
        let text = "Org.nr 556677-8899 och telefon 08-400 22 27";
        let numbers = parse_all(text);
        assert_eq!(numbers, vec!["+4684002227".to_string()]);
    }

    #[test]
    fn test_long_repeat_detection() {
        assert!(has_long_repeat("+4600000001", 7));
        assert!(!has_long_repeat("+46812345678", 7));
    }
}
