//! Fingerprint construction for the document similarity engine.
//!
//! Turns raw text plus optional metadata and collaborator-supplied signals
//! into an immutable [`DocumentFingerprint`]: an exact content hash, an
//! order-invariant fuzzy hash, a canonical metadata hash, structural
//! features, sparse lexical weights, and optional semantic/visual signals.
//!
//! Every optional field is either fully populated or entirely absent. An
//! absent signal contributes zero weight downstream, never a zero vector
//! posing as real similarity.

mod signals;
mod structural;
mod text;

pub use signals::{Embedder, ImageHasher, SignalError, StubEmbedder, l2_normalize_in_place};
pub use structural::{FeatureValue, extract_structural_features};
pub use text::{
    FUZZY_WORD_LEN_FLOOR, canonical_metadata, fuzzy_words, hash_text, lexical_weights,
    normalize_content,
};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;

/// Supported fingerprint configuration version.
pub const FINGERPRINT_CONFIG_VERSION: u32 = 1;

/// Words per page used for the page-count estimate.
pub const WORDS_PER_PAGE: usize = 250;

/// Runtime configuration for fingerprint construction.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FingerprintConfig {
    /// Semantic version of the fingerprint configuration.
    pub version: u32,
    /// Maximum number of characters forwarded to the embedding collaborator.
    /// `None` passes the full text through.
    pub embed_max_len: Option<usize>,
}

impl Default for FingerprintConfig {
    fn default() -> Self {
        Self {
            version: FINGERPRINT_CONFIG_VERSION,
            embed_max_len: None,
        }
    }
}

impl FingerprintConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cap the text length handed to the embedding collaborator.
    pub fn with_embed_max_len(mut self, limit: usize) -> Self {
        self.embed_max_len = Some(limit);
        self
    }

    pub fn validate(&self) -> Result<(), FingerprintError> {
        if self.version != FINGERPRINT_CONFIG_VERSION {
            return Err(FingerprintError::InvalidConfigVersion(self.version));
        }
        Ok(())
    }
}

/// Contract violations during fingerprint construction. Collaborator
/// failures are not listed here: those degrade to absent signals.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FingerprintError {
    #[error("unsupported fingerprint config version: {0}")]
    InvalidConfigVersion(u32),
    #[error("document id must not be empty")]
    EmptyDocumentId,
    #[error("document text must not be empty")]
    EmptyText,
}

/// The fixed signal bundle derived once per document, used as the sole input
/// to every comparison.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DocumentFingerprint {
    /// Unique key; re-creating under the same id replaces the prior entry.
    pub document_id: String,
    /// Sha-256 of the whitespace-collapsed, lower-cased full text. Equal
    /// normalized text always produces an equal hash (the exact-match proof).
    pub content_hash: String,
    /// Sha-256 of the sorted significant-word set. Insensitive to sentence
    /// and paragraph reordering and to stop-word noise.
    pub fuzzy_hash: String,
    /// Sha-256 of the canonical (key-sorted) metadata serialization. Absent
    /// metadata hashes as the empty object.
    pub metadata_hash: String,
    /// Named layout/drafting-convention signals extracted from the raw text.
    pub structural_features: BTreeMap<String, FeatureValue>,
    /// Sparse lexical term weights; `None` when the text yields no terms.
    pub tfidf_vector: Option<BTreeMap<String, f64>>,
    /// Unit-normalized embedding, present only when the collaborator
    /// succeeded with a non-empty vector.
    pub semantic_vector: Option<Vec<f32>>,
    /// Perceptual hash of the rendered page, present only when an image was
    /// supplied and hashing succeeded.
    pub visual_hash: Option<String>,
    pub word_count: usize,
    pub char_count: usize,
    /// Estimated as `word_count / 250`, minimum 1.
    pub page_count: usize,
    pub created_at: DateTime<Utc>,
}

/// Build a fingerprint from raw text and already-resolved optional signals.
///
/// Pure with respect to collaborators: the caller runs embedding and image
/// hashing first, degrades any failure to `None`, and passes the results in.
/// Empty id or text is a contract violation, not a degradable signal.
pub fn build_fingerprint(
    document_id: &str,
    text: &str,
    metadata: Option<&serde_json::Value>,
    semantic_vector: Option<Vec<f32>>,
    visual_hash: Option<String>,
    cfg: &FingerprintConfig,
) -> Result<DocumentFingerprint, FingerprintError> {
    cfg.validate()?;
    if document_id.trim().is_empty() {
        return Err(FingerprintError::EmptyDocumentId);
    }
    if text.trim().is_empty() {
        return Err(FingerprintError::EmptyText);
    }

    let normalized = normalize_content(text);
    let content_hash = hash_text(&normalized);
    let fuzzy_hash = hash_text(&fuzzy_words(text).join(" "));
    let metadata_hash = hash_text(&canonical_metadata(metadata));

    let semantic_vector = semantic_vector.and_then(|mut v| {
        if v.is_empty() {
            None
        } else {
            l2_normalize_in_place(&mut v);
            Some(v)
        }
    });
    let visual_hash = visual_hash.filter(|h| !h.is_empty());

    let word_count = text.split_whitespace().count();
    let char_count = text.chars().count();
    let page_count = (word_count / WORDS_PER_PAGE).max(1);

    Ok(DocumentFingerprint {
        document_id: document_id.to_string(),
        content_hash,
        fuzzy_hash,
        metadata_hash,
        structural_features: extract_structural_features(text),
        tfidf_vector: lexical_weights(&normalized),
        semantic_vector,
        visual_hash,
        word_count,
        char_count,
        page_count,
        created_at: Utc::now(),
    })
}
