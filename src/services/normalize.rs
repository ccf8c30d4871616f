//! Epic Name Normalization
//!
//! Canonicalizes epic names for duplicate detection: prefix stripping,
//! stop-word removal, tokenization, and the token-overlap similarity test
//! used by the retrieval-stage deduplicator.

use std::collections::BTreeSet;

/// Filler words removed before comparing names.
const STOP_WORDS: &[&str] = &["and", "the", "a", "an", "my", "mt"];

/// Organizational tags historically prepended to epic names. Only the first
/// matching prefix is stripped.
const KNOWN_PREFIXES: &[&str] = &["mt -", "mt-", "mt ", "ma -", "ma-", "ma "];

/// Token-overlap ratio at or above which two names count as the same epic.
/// Deliberately strict: near-duplicates are kept distinct rather than merged.
const SIMILARITY_THRESHOLD: f64 = 0.8;

/// Normalize an epic name into its comparison token set.
///
/// Lowercases, strips one known organizational prefix, splits on whitespace
/// and `-`, and removes stop words. If stop-word removal would empty the set,
/// the full token set is returned instead so a non-empty input never yields
/// an empty comparison set.
pub fn normalize(name: &str) -> BTreeSet<String> {
    let mut lowered = name.to_lowercase().trim().to_string();

    for prefix in KNOWN_PREFIXES {
        if let Some(rest) = lowered.strip_prefix(prefix) {
            lowered = rest.trim().to_string();
            break;
        }
    }

    let words: BTreeSet<String> = lowered
        .replace('-', " ")
        .split_whitespace()
        .map(str::to_string)
        .collect();

    let core: BTreeSet<String> = words
        .iter()
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .cloned()
        .collect();

    if core.is_empty() {
        words
    } else {
        core
    }
}

/// Whether two epic names are semantically the same epic.
///
/// Overlap ratio is `|S1 ∩ S2| / min(|S1|, |S2|)` over the normalized token
/// sets; names match at a ratio of 0.8 or above. Empty inputs never match.
pub fn is_similar_name(name1: &str, name2: &str) -> bool {
    let words1 = normalize(name1);
    let words2 = normalize(name2);

    if words1.is_empty() || words2.is_empty() {
        return false;
    }

    let intersection = words1.intersection(&words2).count();
    let smaller = words1.len().min(words2.len());

    (intersection as f64 / smaller as f64) >= SIMILARITY_THRESHOLD
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_prefix_and_stop_words() {
        let tokens = normalize("MT - Database Design");
        assert_eq!(
            tokens,
            ["database", "design"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn normalize_splits_on_hyphen() {
        let tokens = normalize("Profile Management - Customer");
        assert!(tokens.contains("profile"));
        assert!(tokens.contains("management"));
        assert!(tokens.contains("customer"));
    }

    #[test]
    fn normalize_keeps_all_stop_word_name() {
        // A name made only of stop words keeps its original tokens.
        let tokens = normalize("The And");
        assert_eq!(
            tokens,
            ["the", "and"].iter().map(|s| s.to_string()).collect()
        );
    }

    #[test]
    fn similar_name_is_reflexive() {
        assert!(is_similar_name("Authentication", "Authentication"));
        assert!(is_similar_name("Payment Gateway", "Payment Gateway"));
    }

    #[test]
    fn similar_name_matches_prefixed_variant() {
        assert!(is_similar_name("Authentication", "MT - Authentication"));
        assert!(is_similar_name("MT - Database Design", "Database Design"));
    }

    #[test]
    fn similar_name_matches_subset() {
        // "payment" covers the whole smaller set.
        assert!(is_similar_name("Payment", "Payment Gateway"));
    }

    #[test]
    fn similar_name_rejects_distinct_epics() {
        assert!(!is_similar_name("Authentication", "Payment Gateway"));
        assert!(!is_similar_name("Order Management", "User Management"));
    }

    #[test]
    fn similar_name_rejects_partial_overlap_below_threshold() {
        // Overlap 1 / min(2, 2) = 0.5 < 0.8.
        assert!(!is_similar_name("User Profile", "User Settings"));
    }

    #[test]
    fn similar_name_rejects_empty_input() {
        assert!(!is_similar_name("", "Authentication"));
        assert!(!is_similar_name("   ", "Authentication"));
    }
}
