use crate::types::{Cluster, DetectError, DetectorConfig, KeepStrategy};
use dsim_compare::{DuplicateMatch, compare_scored};
use dsim_fingerprint::DocumentFingerprint;
use dsim_registry::{FingerprintRegistry, PairKey};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Pairwise duplicate detection over a shared fingerprint registry.
///
/// Sweeps are O(n²) in the chosen id set; that is the contract here,
/// not an oversight. Any blocking or candidate-generation stage that
/// narrows the pair volume belongs upstream of this type and must not
/// alter which scores the selected pairs receive.
pub struct BatchDetector {
    registry: Arc<FingerprintRegistry>,
    config: DetectorConfig,
}

impl BatchDetector {
    /// Build a detector over a shared registry. Fails when the
    /// configuration is invalid.
    pub fn new(
        registry: Arc<FingerprintRegistry>,
        config: DetectorConfig,
    ) -> Result<Self, DetectError> {
        config.validate()?;
        Ok(Self { registry, config })
    }

    pub fn config(&self) -> &DetectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<FingerprintRegistry> {
        &self.registry
    }

    /// Compare one document against a candidate set (default: the whole
    /// registry minus itself) and report matches at or above the
    /// configured threshold, best first. The target and every explicit
    /// candidate id must be registered.
    pub fn find_duplicates(
        &self,
        document_id: &str,
        candidates: Option<&[String]>,
    ) -> Result<Vec<DuplicateMatch>, DetectError> {
        let start = Instant::now();
        let target = self.registry.get(document_id)?;
        let pool = self.resolve_set(candidates)?;

        let mut matches: Vec<DuplicateMatch> = pool
            .iter()
            .filter(|candidate| candidate.document_id != document_id)
            .filter_map(|candidate| self.classified_pair(&target, candidate))
            .collect();

        sort_matches(&mut matches);
        self.truncate(&mut matches);
        info!(
            document_id = %document_id,
            candidates = pool.len(),
            matches = matches.len(),
            elapsed_micros = start.elapsed().as_micros(),
            "find_duplicates_complete"
        );
        Ok(matches)
    }

    /// Full pairwise sweep over the chosen ids (default: the whole
    /// registry). Each unordered pair is visited exactly once; matches
    /// at or above the threshold come back sorted best first.
    pub fn batch_detect(
        &self,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<DuplicateMatch>, DetectError> {
        let start = Instant::now();
        let fingerprints = self.resolve_set(document_ids)?;

        let mut matches: Vec<DuplicateMatch> = if self.config.use_parallel {
            (0..fingerprints.len())
                .into_par_iter()
                .flat_map_iter(|i| {
                    let fingerprints = &fingerprints;
                    (i + 1..fingerprints.len()).filter_map(move |j| {
                        self.classified_pair(&fingerprints[i], &fingerprints[j])
                    })
                })
                .collect()
        } else {
            (0..fingerprints.len())
                .flat_map(|i| {
                    let fingerprints = &fingerprints;
                    (i + 1..fingerprints.len()).filter_map(move |j| {
                        self.classified_pair(&fingerprints[i], &fingerprints[j])
                    })
                })
                .collect()
        };

        sort_matches(&mut matches);
        self.truncate(&mut matches);
        info!(
            documents = fingerprints.len(),
            matches = matches.len(),
            parallel = self.config.use_parallel,
            elapsed_micros = start.elapsed().as_micros(),
            "batch_detect_complete"
        );
        Ok(matches)
    }

    /// Group the chosen ids into families of transitively connected
    /// duplicates.
    ///
    /// Exact, near-exact, version, and similar matches form undirected
    /// edges; partial and template matches are reportable but never
    /// connect documents. Components are walked with an explicit stack
    /// over the match snapshot taken up front. Documents without a
    /// qualifying edge belong to no cluster. Clusters come back sorted
    /// by descending size, members sorted ascending.
    pub fn duplicate_clusters(
        &self,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<Cluster>, DetectError> {
        let matches = self.batch_detect(document_ids)?;

        let mut adjacency: BTreeMap<&str, Vec<&str>> = BTreeMap::new();
        for m in &matches {
            if !m.duplicate_type.is_cluster_edge() {
                continue;
            }
            adjacency
                .entry(&m.document_id_1)
                .or_default()
                .push(&m.document_id_2);
            adjacency
                .entry(&m.document_id_2)
                .or_default()
                .push(&m.document_id_1);
        }

        let mut clusters = Vec::new();
        let mut visited: BTreeSet<&str> = BTreeSet::new();
        for &start in adjacency.keys() {
            if visited.contains(start) {
                continue;
            }
            let mut members = Vec::new();
            let mut stack = vec![start];
            while let Some(node) = stack.pop() {
                if !visited.insert(node) {
                    continue;
                }
                members.push(node.to_string());
                if let Some(neighbors) = adjacency.get(node) {
                    stack.extend(neighbors.iter().copied());
                }
            }
            members.sort_unstable();
            clusters.push(Cluster {
                document_ids: members,
            });
        }

        clusters.sort_unstable_by(|a, b| {
            b.len()
                .cmp(&a.len())
                .then_with(|| a.document_ids.cmp(&b.document_ids))
        });
        Ok(clusters)
    }

    /// Choose one keeper per cluster under the strategy and return the
    /// ids that survive, preserving the input order. Ids outside every
    /// cluster are always retained.
    ///
    /// Deterministic for fixed fingerprints: ties on the strategy key
    /// keep the lexicographically smallest id, so re-running with the
    /// same inputs always yields the same keep-list.
    pub fn resolve_duplicates(
        &self,
        document_ids: &[String],
        strategy: KeepStrategy,
    ) -> Result<Vec<String>, DetectError> {
        let start = Instant::now();
        let clusters = self.duplicate_clusters(Some(document_ids))?;

        let mut dropped: BTreeSet<&str> = BTreeSet::new();
        for cluster in &clusters {
            if let Some(keeper) = self.keeper_of(cluster, strategy)? {
                for id in &cluster.document_ids {
                    if *id != keeper {
                        dropped.insert(id);
                    }
                }
            }
        }

        let mut seen: BTreeSet<&str> = BTreeSet::new();
        let keep: Vec<String> = document_ids
            .iter()
            .filter(|id| !dropped.contains(id.as_str()) && seen.insert(id.as_str()))
            .cloned()
            .collect();
        info!(
            documents = document_ids.len(),
            clusters = clusters.len(),
            kept = keep.len(),
            strategy = ?strategy,
            elapsed_micros = start.elapsed().as_micros(),
            "resolve_duplicates_complete"
        );
        Ok(keep)
    }

    /// Cache-gated comparison. A cached score below the threshold skips
    /// the pair outright; anything else recomputes the full match, so a
    /// reported type or confidence is never served stale.
    fn classified_pair(
        &self,
        a: &DocumentFingerprint,
        b: &DocumentFingerprint,
    ) -> Option<DuplicateMatch> {
        let key = PairKey::new(&a.document_id, &b.document_id);
        if let Some(cached) = self.registry.cached_score(&key) {
            if cached < self.config.similarity_threshold {
                return None;
            }
        }
        let (fused, matched) = compare_scored(a, b);
        self.registry.record_score(key, fused);
        matched.filter(|m| m.similarity_score >= self.config.similarity_threshold)
    }

    /// Resolve the working set: an explicit id list (deduplicated, every
    /// id must exist) or a snapshot of the whole registry.
    fn resolve_set(
        &self,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<Arc<DocumentFingerprint>>, DetectError> {
        match document_ids {
            None => Ok(self.registry.snapshot()),
            Some(ids) => {
                let unique: BTreeSet<&String> = ids.iter().collect();
                let mut fingerprints = Vec::with_capacity(unique.len());
                for id in unique {
                    fingerprints.push(self.registry.get(id)?);
                }
                Ok(fingerprints)
            }
        }
    }

    fn keeper_of(
        &self,
        cluster: &Cluster,
        strategy: KeepStrategy,
    ) -> Result<Option<String>, DetectError> {
        let mut keeper: Option<Arc<DocumentFingerprint>> = None;
        for id in &cluster.document_ids {
            let candidate = self.registry.get(id)?;
            let replace = match &keeper {
                None => true,
                Some(incumbent) => outranks(&candidate, incumbent, strategy),
            };
            if replace {
                keeper = Some(candidate);
            }
        }
        Ok(keeper.map(|fp| fp.document_id.clone()))
    }

    fn truncate(&self, matches: &mut Vec<DuplicateMatch>) {
        if let Some(cap) = self.config.max_results {
            matches.truncate(cap);
        }
    }
}

/// Strict improvement on the strategy key. Ties never replace the
/// incumbent, which walks members in ascending id order and therefore
/// keeps the smallest id.
fn outranks(
    candidate: &DocumentFingerprint,
    incumbent: &DocumentFingerprint,
    strategy: KeepStrategy,
) -> bool {
    match strategy {
        KeepStrategy::Newest => candidate.created_at > incumbent.created_at,
        KeepStrategy::Oldest => candidate.created_at < incumbent.created_at,
        KeepStrategy::Longest => candidate.word_count > incumbent.word_count,
        KeepStrategy::Shortest => candidate.word_count < incumbent.word_count,
    }
}

/// Descending score; ties break on the canonical id pair so orderings
/// are stable across runs and thread counts.
fn sort_matches(matches: &mut [DuplicateMatch]) {
    matches.sort_unstable_by(|a, b| {
        b.similarity_score
            .partial_cmp(&a.similarity_score)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.document_id_1.cmp(&b.document_id_1))
            .then_with(|| a.document_id_2.cmp(&b.document_id_2))
    });
}
