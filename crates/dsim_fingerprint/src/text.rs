//! Text normalization, hashing, and lexical weighting primitives.
//!
//! The three hash rules here are load-bearing for interoperability: two
//! independently built fingerprints of the same document must agree on
//! `content_hash`, `fuzzy_hash`, and `metadata_hash` byte for byte.

use sha2::{Digest, Sha256};
use std::collections::BTreeMap;

/// Words shorter than or equal to this are dropped from the fuzzy word set.
pub const FUZZY_WORD_LEN_FLOOR: usize = 3;

/// Collapse all whitespace runs to a single space, trim the edges, and
/// lower-case the result. Two documents that normalize to the same string
/// are exact duplicates by definition.
pub fn normalize_content(text: &str) -> String {
    let mut normalized = String::with_capacity(text.len());
    for segment in text.split_whitespace() {
        if !normalized.is_empty() {
            normalized.push(' ');
        }
        for ch in segment.chars() {
            normalized.extend(ch.to_lowercase());
        }
    }
    normalized
}

/// The sorted significant-word set behind the fuzzy hash: non-word
/// characters act as separators, words are lower-cased, words longer than
/// [`FUZZY_WORD_LEN_FLOOR`] characters are kept and sorted alphabetically.
/// Insensitive to sentence and paragraph reordering by construction.
pub fn fuzzy_words(text: &str) -> Vec<String> {
    let mut words: Vec<String> = text
        .split(|ch: char| !(ch.is_alphanumeric() || ch == '_'))
        .filter(|segment| !segment.is_empty())
        .map(|segment| segment.to_lowercase())
        .filter(|word| word.chars().count() > FUZZY_WORD_LEN_FLOOR)
        .collect();
    words.sort_unstable();
    words
}

/// Sha-256 of the input, rendered as lowercase hex.
pub fn hash_text(text: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(text.as_bytes());
    hex::encode(hasher.finalize())
}

/// Canonical serialization of a metadata value: object keys emitted in
/// sorted order at every nesting level, absent metadata as the empty object.
/// Non-object values serialize as given so malformed metadata still hashes
/// deterministically instead of failing.
pub fn canonical_metadata(metadata: Option<&serde_json::Value>) -> String {
    match metadata {
        None => "{}".to_string(),
        Some(value) => {
            let mut out = String::new();
            write_canonical_value(value, &mut out);
            out
        }
    }
}

fn write_canonical_value(value: &serde_json::Value, out: &mut String) {
    match value {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<&String> = map.keys().collect();
            keys.sort_unstable();
            out.push('{');
            for (position, key) in keys.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                out.push_str(&serde_json::Value::String((*key).clone()).to_string());
                out.push(':');
                if let Some(inner) = map.get(*key) {
                    write_canonical_value(inner, out);
                }
            }
            out.push('}');
        }
        serde_json::Value::Array(items) => {
            out.push('[');
            for (position, item) in items.iter().enumerate() {
                if position > 0 {
                    out.push(',');
                }
                write_canonical_value(item, out);
            }
            out.push(']');
        }
        other => out.push_str(&other.to_string()),
    }
}

/// Sparse lexical weights: sublinear term frequency (`1 + ln(tf)`) over
/// lower-cased word tokens. Returns `None` when the text yields no terms so
/// an absent vector never masquerades as a real one.
pub fn lexical_weights(text: &str) -> Option<BTreeMap<String, f64>> {
    let mut counts: BTreeMap<String, u64> = BTreeMap::new();
    for segment in text.split(|ch: char| !(ch.is_alphanumeric() || ch == '_')) {
        if segment.is_empty() {
            continue;
        }
        *counts.entry(segment.to_lowercase()).or_insert(0) += 1;
    }
    if counts.is_empty() {
        return None;
    }
    Some(
        counts
            .into_iter()
            .map(|(term, tf)| (term, 1.0 + (tf as f64).ln()))
            .collect(),
    )
}
