//! Per-signal similarity formulas. Every function is pure, symmetric in
//! its arguments, and returns a score in [0.0, 1.0].

use dsim_fingerprint::FeatureValue;
use std::collections::{BTreeMap, BTreeSet};

/// Positional character agreement between two digest strings:
/// `1 - mismatches / length`. Digests of different lengths are
/// incomparable and score 0.0.
#[inline]
pub fn char_agreement(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a != len_b {
        return 0.0;
    }
    if len_a == 0 {
        return 1.0;
    }
    let mismatches = a.chars().zip(b.chars()).filter(|(x, y)| x != y).count();
    1.0 - mismatches as f64 / len_a as f64
}

/// Cosine similarity between two sparse term-weight vectors, clamped to
/// [0.0, 1.0]. An empty vector on either side scores 0.0.
#[inline]
pub fn cosine_sparse(a: &BTreeMap<String, f64>, b: &BTreeMap<String, f64>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }
    let mut dot = 0.0;
    for (term, weight_a) in a {
        if let Some(weight_b) = b.get(term) {
            dot += weight_a * weight_b;
        }
    }
    let norm_a = a.values().map(|w| w * w).sum::<f64>().sqrt();
    let norm_b = b.values().map(|w| w * w).sum::<f64>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a * norm_b)).clamp(0.0, 1.0)
}

/// Cosine similarity between two dense embedding vectors, clamped to
/// [0.0, 1.0]. Empty or differently sized vectors score 0.0.
#[inline]
pub fn cosine_dense(a: &[f32], b: &[f32]) -> f64 {
    if a.is_empty() || a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0_f64;
    let mut norm_a = 0.0_f64;
    let mut norm_b = 0.0_f64;
    for (&x, &y) in a.iter().zip(b) {
        dot += x as f64 * y as f64;
        norm_a += (x as f64).powi(2);
        norm_b += (y as f64).powi(2);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    (dot / (norm_a.sqrt() * norm_b.sqrt())).clamp(0.0, 1.0)
}

/// Mean per-feature agreement over the union of both feature sets.
///
/// Flags agree exactly (1.0) or not at all (0.0). Counts score
/// `min / max`, with two zeros counting as perfect agreement and a
/// single zero as none. A feature missing on one side, or carrying a
/// different value kind on each side, scores 0.0 for that key. Two
/// empty maps are incomparable and score 0.0 overall.
pub fn structural_similarity(
    a: &BTreeMap<String, FeatureValue>,
    b: &BTreeMap<String, FeatureValue>,
) -> f64 {
    let keys: BTreeSet<&String> = a.keys().chain(b.keys()).collect();
    if keys.is_empty() {
        return 0.0;
    }
    let mut total = 0.0;
    for key in &keys {
        total += match (a.get(*key), b.get(*key)) {
            (Some(FeatureValue::Flag(x)), Some(FeatureValue::Flag(y))) => {
                if x == y {
                    1.0
                } else {
                    0.0
                }
            }
            (Some(FeatureValue::Count(x)), Some(FeatureValue::Count(y))) => count_ratio(*x, *y),
            _ => 0.0,
        };
    }
    total / keys.len() as f64
}

#[inline]
fn count_ratio(x: u64, y: u64) -> f64 {
    if x == 0 && y == 0 {
        return 1.0;
    }
    if x == 0 || y == 0 {
        return 0.0;
    }
    x.min(y) as f64 / x.max(y) as f64
}

/// Bitwise agreement between two hex-encoded perceptual hashes:
/// `1 - hamming_bits / total_bits`. Hashes of different lengths score
/// 0.0; a non-hex digit counts all four of its bits as differing.
pub fn hamming_similarity(a: &str, b: &str) -> f64 {
    let len_a = a.chars().count();
    let len_b = b.chars().count();
    if len_a == 0 || len_a != len_b {
        return 0.0;
    }
    let mut differing = 0_u32;
    for (ca, cb) in a.chars().zip(b.chars()) {
        differing += match (ca.to_digit(16), cb.to_digit(16)) {
            (Some(da), Some(db)) => (da ^ db).count_ones(),
            _ => 4,
        };
    }
    let total_bits = len_a as u32 * 4;
    1.0 - differing as f64 / total_bits as f64
}
