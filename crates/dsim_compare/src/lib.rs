//! # Document Similarity Comparison (`dsim_compare`)
//!
//! ## Purpose
//!
//! `dsim_compare` turns a pair of [`DocumentFingerprint`]s into a classified
//! [`DuplicateMatch`]. It computes six per-signal similarities, fuses them
//! under fixed weights, classifies the pair with an ordered rule table, and
//! attaches a confidence derived from inter-signal agreement. Comparison is
//! pure: no I/O, no shared state, and the same inputs always produce the same
//! classification.
//!
//! ## Core Types
//!
//! - [`DuplicateType`]: classification outcome, strongest first.
//! - [`SimilarityMethod`]: the signal attributed as primary evidence.
//! - [`SignalScores`]: the six component similarities, each in [0.0, 1.0].
//! - [`DuplicateMatch`]: ids in canonical order plus score, type,
//!   confidence, method, and per-signal details.
//!
//! ## Example
//!
//! ```
//! use dsim_compare::{DuplicateType, compare};
//! use dsim_fingerprint::{FingerprintConfig, build_fingerprint};
//!
//! let cfg = FingerprintConfig::default();
//! let a = build_fingerprint(
//!     "lease-2023",
//!     "This Lease Agreement is made between the parties.",
//!     None,
//!     None,
//!     None,
//!     &cfg,
//! )
//! .expect("fingerprint");
//! let b = build_fingerprint(
//!     "lease-2023-copy",
//!     "This  Lease   Agreement is made between the parties.",
//!     None,
//!     None,
//!     None,
//!     &cfg,
//! )
//! .expect("fingerprint");
//!
//! let m = compare(&a, &b).expect("identical content always matches");
//! assert_eq!(m.duplicate_type, DuplicateType::Exact);
//! assert_eq!(m.similarity_score, 1.0);
//! ```

pub mod similarity;
pub mod types;

pub use crate::similarity::{
    char_agreement, cosine_dense, cosine_sparse, hamming_similarity, structural_similarity,
};
pub use crate::types::{DuplicateMatch, DuplicateType, SignalScores, SimilarityMethod};

use chrono::Utc;
use dsim_fingerprint::DocumentFingerprint;

/// Fusion weight of the fuzzy-digest agreement signal.
pub const FUZZY_WEIGHT: f64 = 0.20;
/// Fusion weight of the lexical cosine signal.
pub const TFIDF_WEIGHT: f64 = 0.30;
/// Fusion weight of the embedding cosine signal.
pub const SEMANTIC_WEIGHT: f64 = 0.25;
/// Fusion weight of the layout-feature agreement signal.
pub const STRUCTURAL_WEIGHT: f64 = 0.15;
/// Fusion weight of the perceptual-hash agreement signal.
pub const VISUAL_WEIGHT: f64 = 0.05;
/// Fusion weight of the metadata-equality signal.
pub const METADATA_WEIGHT: f64 = 0.05;

/// Minimum fused score classified [`DuplicateType::Exact`].
pub const EXACT_SCORE_FLOOR: f64 = 0.95;
/// Minimum fused score classified [`DuplicateType::NearExact`].
pub const NEAR_EXACT_SCORE_FLOOR: f64 = 0.85;
/// Minimum structural score for the [`DuplicateType::Version`] rule.
pub const VERSION_STRUCTURAL_FLOOR: f64 = 0.8;
/// Minimum lexical score for the [`DuplicateType::Version`] rule.
pub const VERSION_TFIDF_FLOOR: f64 = 0.6;
/// Minimum structural score for the [`DuplicateType::Template`] rule.
pub const TEMPLATE_STRUCTURAL_FLOOR: f64 = 0.9;
/// Lexical score must stay below this for the [`DuplicateType::Template`] rule.
pub const TEMPLATE_TFIDF_CEILING: f64 = 0.4;
/// Minimum fused score classified [`DuplicateType::Similar`].
pub const SIMILAR_SCORE_FLOOR: f64 = 0.7;
/// Minimum fused score classified [`DuplicateType::Partial`].
pub const PARTIAL_SCORE_FLOOR: f64 = 0.4;
/// Fused scores below this produce no match record at all.
pub const REPORTING_FLOOR: f64 = 0.3;

/// Compute the six per-signal similarities between two fingerprints.
///
/// A signal whose inputs are absent on either side scores 0.0; absence is
/// never treated as agreement. Metadata is the exception only in the sense
/// that every fingerprint carries a metadata hash (documents ingested
/// without metadata share the hash of the empty object).
pub fn signal_scores(a: &DocumentFingerprint, b: &DocumentFingerprint) -> SignalScores {
    let fuzzy = char_agreement(&a.fuzzy_hash, &b.fuzzy_hash);
    let tfidf = match (a.tfidf_vector.as_ref(), b.tfidf_vector.as_ref()) {
        (Some(x), Some(y)) => cosine_sparse(x, y),
        _ => 0.0,
    };
    let semantic = match (a.semantic_vector.as_ref(), b.semantic_vector.as_ref()) {
        (Some(x), Some(y)) => cosine_dense(x, y),
        _ => 0.0,
    };
    let structural = structural_similarity(&a.structural_features, &b.structural_features);
    let visual = match (a.visual_hash.as_deref(), b.visual_hash.as_deref()) {
        (Some(x), Some(y)) => hamming_similarity(x, y),
        _ => 0.0,
    };
    let metadata = if a.metadata_hash == b.metadata_hash {
        1.0
    } else {
        0.0
    };
    SignalScores {
        fuzzy,
        tfidf,
        semantic,
        structural,
        visual,
        metadata,
    }
}

/// Weighted fusion of the six signals into one score in [0.0, 1.0].
#[inline]
pub fn fuse(scores: &SignalScores) -> f64 {
    FUZZY_WEIGHT * scores.fuzzy
        + TFIDF_WEIGHT * scores.tfidf
        + SEMANTIC_WEIGHT * scores.semantic
        + STRUCTURAL_WEIGHT * scores.structural
        + VISUAL_WEIGHT * scores.visual
        + METADATA_WEIGHT * scores.metadata
}

/// Classify a pair; the first rule that matches, in order, wins.
///
/// The Version and Template rules look at individual signals rather than
/// the fused score: a revised document keeps its skeleton and most of its
/// vocabulary, while a reused template keeps only the skeleton. Both can
/// therefore outrank the fused-score bands below them. Fused scores under
/// [`REPORTING_FLOOR`] that match no structural rule return `None`.
pub fn classify(fused: f64, scores: &SignalScores) -> Option<DuplicateType> {
    if fused >= EXACT_SCORE_FLOOR {
        return Some(DuplicateType::Exact);
    }
    if fused >= NEAR_EXACT_SCORE_FLOOR {
        return Some(DuplicateType::NearExact);
    }
    if scores.structural >= VERSION_STRUCTURAL_FLOOR && scores.tfidf >= VERSION_TFIDF_FLOOR {
        return Some(DuplicateType::Version);
    }
    if scores.structural >= TEMPLATE_STRUCTURAL_FLOOR && scores.tfidf < TEMPLATE_TFIDF_CEILING {
        return Some(DuplicateType::Template);
    }
    if fused >= SIMILAR_SCORE_FLOOR {
        return Some(DuplicateType::Similar);
    }
    if fused >= PARTIAL_SCORE_FLOOR {
        return Some(DuplicateType::Partial);
    }
    if fused < REPORTING_FLOOR {
        return None;
    }
    Some(DuplicateType::NotDuplicate)
}

/// Attribute the strongest primary signal.
///
/// Only fuzzy, lexical, semantic, and structural evidence can carry a
/// match; visual and metadata agreement corroborate but are never
/// attributed. Ties go to the earlier signal in that order.
pub fn primary_method(scores: &SignalScores) -> SimilarityMethod {
    let candidates = [
        (SimilarityMethod::Fuzzy, scores.fuzzy),
        (SimilarityMethod::Tfidf, scores.tfidf),
        (SimilarityMethod::Semantic, scores.semantic),
        (SimilarityMethod::Structural, scores.structural),
    ];
    let mut best = candidates[0];
    for candidate in &candidates[1..] {
        if candidate.1 > best.1 {
            best = *candidate;
        }
    }
    best.0
}

/// Confidence from inter-signal agreement among the non-zero primary
/// signals (fuzzy, lexical, semantic, structural).
///
/// Fewer than two live signals is underdetermined and scores 0.5.
/// Otherwise confidence starts at `1 - 2 * stdev` (sample deviation),
/// floored at 0.1, with a 0.2 bonus when the mean is at least 0.8,
/// capped at 1.0.
pub fn signal_confidence(scores: &SignalScores) -> f64 {
    let live: Vec<f64> = [
        scores.fuzzy,
        scores.tfidf,
        scores.semantic,
        scores.structural,
    ]
    .into_iter()
    .filter(|v| *v > 0.0)
    .collect();
    if live.len() < 2 {
        return 0.5;
    }
    let mean = live.iter().sum::<f64>() / live.len() as f64;
    let variance =
        live.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / (live.len() - 1) as f64;
    let mut confidence = (1.0 - 2.0 * variance.sqrt()).max(0.1);
    if mean >= 0.8 {
        confidence = (confidence + 0.2).min(1.0);
    }
    confidence
}

/// Compare two fingerprints and classify the pair.
///
/// Identical content hashes short-circuit: the pair is an exact duplicate
/// with score 1.0, confidence 1.0, and [`SimilarityMethod::Hash`], and no
/// other signal is computed. Otherwise the fused signals are classified;
/// pairs that fall below the reporting floor return `None`. Ids are
/// reported in canonical order, so argument order never changes the
/// outcome.
pub fn compare(a: &DocumentFingerprint, b: &DocumentFingerprint) -> Option<DuplicateMatch> {
    compare_scored(a, b).1
}

/// [`compare`], but also yields the fused score on its own.
///
/// Callers that cache pairwise scores need the scalar even when the pair
/// falls below the reporting floor and no match record is produced.
pub fn compare_scored(
    a: &DocumentFingerprint,
    b: &DocumentFingerprint,
) -> (f64, Option<DuplicateMatch>) {
    let (first, second) = if a.document_id <= b.document_id {
        (a, b)
    } else {
        (b, a)
    };

    if first.content_hash == second.content_hash {
        let matched = DuplicateMatch {
            document_id_1: first.document_id.clone(),
            document_id_2: second.document_id.clone(),
            duplicate_type: DuplicateType::Exact,
            similarity_score: 1.0,
            confidence: 1.0,
            method_used: SimilarityMethod::Hash,
            details: SignalScores::default(),
            compared_at: Utc::now(),
        };
        return (1.0, Some(matched));
    }

    let details = signal_scores(first, second);
    let fused = fuse(&details);
    let matched = classify(fused, &details).map(|duplicate_type| DuplicateMatch {
        document_id_1: first.document_id.clone(),
        document_id_2: second.document_id.clone(),
        duplicate_type,
        similarity_score: fused,
        confidence: signal_confidence(&details),
        method_used: primary_method(&details),
        details,
        compared_at: Utc::now(),
    });
    (fused, matched)
}
