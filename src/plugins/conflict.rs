//! Duplicate and conflict detection against active decisions.
//!
//! Both checks are deliberately heuristic. Duplicates are exact equality of
//! normalized text. Conflicts are keyword overlap plus opposite negation
//! polarity, which favors surfacing potential contradictions over silently
//! accepting them; incidental shared keywords can and do produce
//! false positives, and a single shared keyword is enough.

use crate::core::event::Decision;
use crate::core::indexes::DecisionIndexes;
use regex::Regex;
use rustc_hash::FxHashSet;
use std::sync::LazyLock;

static PUNCTUATION: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"[\p{P}\p{S}]+").unwrap());

static NEGATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\b(no|not|never|avoid|don't|do not|must not|should not|cannot|can't)\b")
        .unwrap()
});

const STOP_WORDS: [&str; 14] =
    ["the", "a", "an", "and", "or", "to", "for", "of", "in", "on", "with", "as", "is", "are"];

/// Lowercase, collapse whitespace runs, trim. The equality form used by
/// duplicate checks and candidate dedupe.
pub fn normalize_text(text: &str) -> String {
    text.to_lowercase().split_whitespace().collect::<Vec<_>>().join(" ")
}

/// `normalize_text` with punctuation and symbols stripped as well. Only
/// used to tokenize text into keywords.
fn strip_punctuation(text: &str) -> String {
    let lowered = normalize_text(text);
    let stripped = PUNCTUATION.replace_all(&lowered, " ");
    stripped.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn has_negation(text: &str) -> bool {
    NEGATION.is_match(text)
}

/// Significant keywords: tokens longer than 2 chars that are not stop
/// words.
pub fn keywords(text: &str) -> FxHashSet<String> {
    strip_punctuation(text)
        .split(' ')
        .filter(|word| word.chars().count() > 2 && !STOP_WORDS.contains(word))
        .map(str::to_string)
        .collect()
}

fn shares_keyword(a: &str, b: &str) -> bool {
    let a_keys = keywords(a);
    if a_keys.is_empty() {
        return false;
    }
    let b_keys = keywords(b);
    a_keys.iter().any(|key| b_keys.contains(key))
}

/// First active decision whose normalized content equals the candidate's.
/// Non-active decisions never count as duplicates.
pub fn find_duplicate_active<'a>(
    indexes: &'a DecisionIndexes,
    text: &str,
) -> Option<&'a Decision> {
    let normalized = normalize_text(text);
    indexes
        .active_decisions()
        .into_iter()
        .find(|decision| normalize_text(decision.content()) == normalized)
}

/// Active decisions that share at least one keyword with `text` while
/// disagreeing with it on negation polarity.
pub fn find_conflicts<'a>(indexes: &'a DecisionIndexes, text: &str) -> Vec<&'a Decision> {
    let candidate_negated = has_negation(text);
    indexes
        .active_decisions()
        .into_iter()
        .filter(|decision| {
            let existing = decision.content();
            shares_keyword(text, existing) && has_negation(existing) != candidate_negated
        })
        .collect()
}
