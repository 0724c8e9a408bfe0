use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Relationship between two documents, strongest first.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateType {
    /// Byte-identical after normalization, or fused score >= 0.95.
    Exact,
    /// Trivially edited copy (fused score >= 0.85).
    NearExact,
    /// Same document family, revised content.
    Version,
    /// Same boilerplate skeleton filled with unrelated content.
    Template,
    /// Overlapping content (fused score >= 0.7).
    Similar,
    /// Weak overlap (fused score >= 0.4).
    Partial,
    /// Reported for visibility only; never treated as a duplicate.
    NotDuplicate,
}

impl DuplicateType {
    /// Whether a match of this type connects two documents into one
    /// cluster. Template matches share a skeleton, not content, and
    /// Partial overlap is too weak to merge families transitively.
    pub fn is_cluster_edge(self) -> bool {
        matches!(
            self,
            DuplicateType::Exact
                | DuplicateType::NearExact
                | DuplicateType::Version
                | DuplicateType::Similar
        )
    }
}

/// Primary signal attributed to a match, for explainability.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SimilarityMethod {
    /// Content hashes were identical; no other signal was consulted.
    Hash,
    /// Positional agreement of sorted-word digests.
    Fuzzy,
    /// Cosine over sparse lexical weight vectors.
    Tfidf,
    /// Cosine over dense embedding vectors.
    Semantic,
    /// Layout feature agreement.
    Structural,
}

/// Per-signal similarities, each in [0.0, 1.0]. A signal absent on
/// either side scores 0.0 rather than being skipped.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq)]
pub struct SignalScores {
    pub fuzzy: f64,
    pub tfidf: f64,
    pub semantic: f64,
    pub structural: f64,
    pub visual: f64,
    pub metadata: f64,
}

/// Outcome of one pairwise comparison.
///
/// Ids are stored in canonical order (`document_id_1 <= document_id_2`)
/// so the same pair always produces the same record regardless of
/// argument order.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DuplicateMatch {
    pub document_id_1: String,
    pub document_id_2: String,
    pub duplicate_type: DuplicateType,
    /// Weighted fusion of the per-signal scores, in [0.0, 1.0].
    pub similarity_score: f64,
    /// Inter-signal agreement, in [0.1, 1.0] (0.5 when underdetermined).
    pub confidence: f64,
    pub method_used: SimilarityMethod,
    pub details: SignalScores,
    pub compared_at: DateTime<Utc>,
}
