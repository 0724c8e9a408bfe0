//! In-memory storage for document fingerprints and the pairwise score
//! cache that rides along with them.
//!
//! The registry is the single write path for fingerprints: inserting or
//! replacing a document's fingerprint drops every cached comparison
//! involving that document, so a stale score can never outlive the
//! fingerprint it was computed from. Reads hand out `Arc` clones and
//! never block writers for longer than one shard lock.

use dashmap::DashMap;
use dsim_fingerprint::DocumentFingerprint;
use std::sync::Arc;
use thiserror::Error;
use tracing::debug;

/// Errors produced by registry lookups.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum RegistryError {
    /// The document id has no fingerprint. Unknown ids are a caller
    /// error, never silently skipped.
    #[error("no fingerprint registered for document '{document_id}'")]
    NotFound { document_id: String },
}

/// Unordered pair of document ids, stored in canonical order so
/// `(a, b)` and `(b, a)` address the same cache slot.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PairKey {
    first: String,
    second: String,
}

impl PairKey {
    pub fn new(a: &str, b: &str) -> Self {
        if a <= b {
            Self {
                first: a.to_string(),
                second: b.to_string(),
            }
        } else {
            Self {
                first: b.to_string(),
                second: a.to_string(),
            }
        }
    }

    pub fn first(&self) -> &str {
        &self.first
    }

    pub fn second(&self) -> &str {
        &self.second
    }

    pub fn involves(&self, document_id: &str) -> bool {
        self.first == document_id || self.second == document_id
    }
}

/// Cache of fused similarity scores keyed by canonical id pair.
///
/// Only the scalar score is cached. Full match records are cheap to
/// rebuild and carry a timestamp, so caching them would hand back stale
/// `compared_at` values.
#[derive(Debug, Default)]
pub struct ComparisonCache {
    scores: DashMap<PairKey, f64>,
}

impl ComparisonCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, key: &PairKey) -> Option<f64> {
        self.scores.get(key).map(|entry| *entry.value())
    }

    pub fn insert(&self, key: PairKey, score: f64) {
        self.scores.insert(key, score);
    }

    /// Drop every cached pair involving the document. Returns the
    /// number of entries removed.
    pub fn evict_for(&self, document_id: &str) -> usize {
        let mut evicted = 0_usize;
        self.scores.retain(|key, _| {
            if key.involves(document_id) {
                evicted += 1;
                false
            } else {
                true
            }
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.scores.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scores.is_empty()
    }

    pub fn clear(&self) {
        self.scores.clear();
    }
}

/// Shared fingerprint store.
///
/// Fingerprints are immutable once stored; updating a document means
/// storing a new fingerprint under the same id, which also evicts the
/// cached scores computed against the old one.
#[derive(Debug, Default)]
pub struct FingerprintRegistry {
    fingerprints: DashMap<String, Arc<DocumentFingerprint>>,
    cache: ComparisonCache,
}

impl FingerprintRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a fingerprint and evict its stale cached pairs.
    pub fn upsert(&self, fingerprint: DocumentFingerprint) -> Arc<DocumentFingerprint> {
        let document_id = fingerprint.document_id.clone();
        let evicted = self.cache.evict_for(&document_id);
        let stored = Arc::new(fingerprint);
        self.fingerprints.insert(document_id.clone(), stored.clone());
        debug!(
            document_id = %document_id,
            evicted_pairs = evicted,
            "registry_upsert"
        );
        stored
    }

    pub fn get(&self, document_id: &str) -> Result<Arc<DocumentFingerprint>, RegistryError> {
        self.fingerprints
            .get(document_id)
            .map(|entry| entry.value().clone())
            .ok_or_else(|| RegistryError::NotFound {
                document_id: document_id.to_string(),
            })
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.fingerprints.contains_key(document_id)
    }

    /// Remove a fingerprint and every cached pair involving it.
    pub fn remove(&self, document_id: &str) -> Result<Arc<DocumentFingerprint>, RegistryError> {
        let (_, removed) =
            self.fingerprints
                .remove(document_id)
                .ok_or_else(|| RegistryError::NotFound {
                    document_id: document_id.to_string(),
                })?;
        let evicted = self.cache.evict_for(document_id);
        debug!(
            document_id = %document_id,
            evicted_pairs = evicted,
            "registry_remove"
        );
        Ok(removed)
    }

    /// Sorted snapshot of every registered document id.
    pub fn ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .fingerprints
            .iter()
            .map(|entry| entry.key().clone())
            .collect();
        ids.sort_unstable();
        ids
    }

    /// Snapshot of every stored fingerprint, sorted by document id.
    /// Bulk sweeps work over this frozen view so concurrent upserts
    /// cannot tear a pass in progress.
    pub fn snapshot(&self) -> Vec<Arc<DocumentFingerprint>> {
        let mut all: Vec<Arc<DocumentFingerprint>> = self
            .fingerprints
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        all.sort_unstable_by(|a, b| a.document_id.cmp(&b.document_id));
        all
    }

    pub fn len(&self) -> usize {
        self.fingerprints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fingerprints.is_empty()
    }

    pub fn cached_score(&self, key: &PairKey) -> Option<f64> {
        self.cache.get(key)
    }

    pub fn record_score(&self, key: PairKey, score: f64) {
        self.cache.insert(key, score);
    }

    pub fn cached_comparisons(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsim_fingerprint::{FingerprintConfig, build_fingerprint};

    fn fingerprint_of(id: &str, text: &str) -> DocumentFingerprint {
        build_fingerprint(id, text, None, None, None, &FingerprintConfig::default())
            .expect("fingerprint")
    }

    #[test]
    fn pair_key_is_canonical() {
        let forward = PairKey::new("alpha", "omega");
        let reverse = PairKey::new("omega", "alpha");
        assert_eq!(forward, reverse);
        assert_eq!(forward.first(), "alpha");
        assert_eq!(forward.second(), "omega");
        assert!(forward.involves("alpha"));
        assert!(forward.involves("omega"));
        assert!(!forward.involves("delta"));
    }

    #[test]
    fn upsert_then_get_round_trips() {
        let registry = FingerprintRegistry::new();
        registry.upsert(fingerprint_of("doc-a", "The parties agree."));

        let stored = registry.get("doc-a").expect("stored fingerprint");
        assert_eq!(stored.document_id, "doc-a");
        assert_eq!(registry.len(), 1);
        assert!(registry.contains("doc-a"));
    }

    #[test]
    fn get_unknown_id_is_not_found() {
        let registry = FingerprintRegistry::new();
        let err = registry.get("missing").expect_err("unknown id must fail");
        assert!(matches!(
            err,
            RegistryError::NotFound { ref document_id } if document_id == "missing"
        ));
        assert!(err.to_string().contains("missing"));
    }

    #[test]
    fn recreate_evicts_only_pairs_involving_that_document() {
        let registry = FingerprintRegistry::new();
        registry.upsert(fingerprint_of("a", "First agreement text."));
        registry.upsert(fingerprint_of("b", "Second agreement text."));
        registry.upsert(fingerprint_of("c", "Third agreement text."));

        registry.record_score(PairKey::new("a", "b"), 0.9);
        registry.record_score(PairKey::new("a", "c"), 0.8);
        registry.record_score(PairKey::new("b", "c"), 0.7);
        assert_eq!(registry.cached_comparisons(), 3);

        registry.upsert(fingerprint_of("a", "First agreement text, revised."));

        assert_eq!(registry.cached_comparisons(), 1);
        assert!(registry.cached_score(&PairKey::new("a", "b")).is_none());
        assert!(registry.cached_score(&PairKey::new("a", "c")).is_none());
        assert_eq!(registry.cached_score(&PairKey::new("b", "c")), Some(0.7));
    }

    #[test]
    fn remove_drops_fingerprint_and_its_pairs() {
        let registry = FingerprintRegistry::new();
        registry.upsert(fingerprint_of("a", "First agreement text."));
        registry.upsert(fingerprint_of("b", "Second agreement text."));
        registry.record_score(PairKey::new("a", "b"), 0.5);

        let removed = registry.remove("a").expect("existing fingerprint");
        assert_eq!(removed.document_id, "a");
        assert!(!registry.contains("a"));
        assert_eq!(registry.cached_comparisons(), 0);

        let err = registry.remove("a").expect_err("second remove must fail");
        assert!(matches!(err, RegistryError::NotFound { .. }));
    }

    #[test]
    fn ids_and_snapshot_are_sorted() {
        let registry = FingerprintRegistry::new();
        for id in ["gamma", "alpha", "beta"] {
            registry.upsert(fingerprint_of(id, "Shared text body."));
        }
        assert_eq!(registry.ids(), vec!["alpha", "beta", "gamma"]);

        let snapshot = registry.snapshot();
        let snapshot_ids: Vec<&str> = snapshot
            .iter()
            .map(|fp| fp.document_id.as_str())
            .collect();
        assert_eq!(snapshot_ids, vec!["alpha", "beta", "gamma"]);
    }

    #[test]
    fn fresh_insert_with_empty_cache_is_harmless() {
        let registry = FingerprintRegistry::new();
        registry.upsert(fingerprint_of("solo", "Only document."));
        assert_eq!(registry.cached_comparisons(), 0);
    }
}
