//! Structural feature extraction.
//!
//! Captures the skeleton of a legal document: how it is laid out and which
//! drafting conventions it uses, independently of the actual wording. Two
//! filled-in copies of one template agree here even when their text differs.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One named structural signal: a presence flag or a count.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FeatureValue {
    Flag(bool),
    Count(u64),
}

static PARAGRAPH_BREAK: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\n\s*\n").ok());
static SENTENCE_END: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"[.!?]+").ok());
static SIGNATURE_BLOCK: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"(?i)\bin witness whereof\b|\bsignature\b|\bsigned by\b|/s/|_{3,}").ok());
static WHEREAS_CLAUSE: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?i)\bwhereas\b").ok());
static NUMBERED_SECTION: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"(?m)^\s*\d+[.)]\s").ok());
static CAPITALIZED_RUN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b[A-Z][a-z]+(?:\s+[A-Z][a-z]+)+\b").ok());
static QUOTED_SPAN: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r#""[^"\n]*"|“[^”\n]*”"#).ok());
static PARENTHETICAL_SPAN: Lazy<Option<Regex>> = Lazy::new(|| Regex::new(r"\([^)\n]*\)").ok());
static LEGAL_CITATION: Lazy<Option<Regex>> =
    Lazy::new(|| Regex::new(r"\b\d{1,4}\s+[A-Z][A-Za-z.]*\s+\d{1,5}\b|§\s*\d+").ok());

/// Extract the structural feature map from raw (non-normalized) text.
///
/// Every key is always present, so the comparator's union-of-keys mean runs
/// over the same ten features for any pair built by this extractor. Pattern
/// compilation never panics; a failed pattern degrades its feature to zero.
pub fn extract_structural_features(text: &str) -> BTreeMap<String, FeatureValue> {
    let mut features = BTreeMap::new();
    features.insert(
        "line_count".to_string(),
        FeatureValue::Count(text.lines().count() as u64),
    );
    features.insert(
        "paragraph_count".to_string(),
        FeatureValue::Count(count_paragraphs(text)),
    );
    features.insert(
        "sentence_count".to_string(),
        FeatureValue::Count(count_sentences(text)),
    );
    features.insert(
        "has_signature_block".to_string(),
        FeatureValue::Flag(matches_any(&SIGNATURE_BLOCK, text)),
    );
    features.insert(
        "has_whereas_clause".to_string(),
        FeatureValue::Flag(matches_any(&WHEREAS_CLAUSE, text)),
    );
    features.insert(
        "numbered_sections".to_string(),
        FeatureValue::Count(count_matches(&NUMBERED_SECTION, text)),
    );
    features.insert(
        "capitalized_runs".to_string(),
        FeatureValue::Count(count_matches(&CAPITALIZED_RUN, text)),
    );
    features.insert(
        "quoted_spans".to_string(),
        FeatureValue::Count(count_matches(&QUOTED_SPAN, text)),
    );
    features.insert(
        "parenthetical_spans".to_string(),
        FeatureValue::Count(count_matches(&PARENTHETICAL_SPAN, text)),
    );
    features.insert(
        "citation_count".to_string(),
        FeatureValue::Count(count_matches(&LEGAL_CITATION, text)),
    );
    features
}

fn count_paragraphs(text: &str) -> u64 {
    if text.trim().is_empty() {
        return 0;
    }
    match PARAGRAPH_BREAK.as_ref() {
        Some(re) => re.split(text).filter(|p| !p.trim().is_empty()).count() as u64,
        None => 1,
    }
}

fn count_sentences(text: &str) -> u64 {
    if text.trim().is_empty() {
        return 0;
    }
    match SENTENCE_END.as_ref() {
        Some(re) => re.split(text).filter(|s| !s.trim().is_empty()).count() as u64,
        None => 1,
    }
}

fn count_matches(pattern: &Lazy<Option<Regex>>, text: &str) -> u64 {
    pattern
        .as_ref()
        .map_or(0, |re| re.find_iter(text).count() as u64)
}

fn matches_any(pattern: &Lazy<Option<Regex>>, text: &str) -> bool {
    pattern.as_ref().is_some_and(|re| re.is_match(text))
}
