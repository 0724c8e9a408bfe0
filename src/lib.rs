//! Workspace umbrella crate for the document similarity and deduplication
//! engine.
//!
//! This crate stitches together fingerprint construction, pairwise
//! comparison, the concurrent fingerprint registry, and batch detection so
//! callers can manage a document corpus through a single [`DedupEngine`]
//! entry point: register text, compare pairs, sweep for duplicates, build
//! clusters, and resolve each cluster down to one keeper.

pub use dsim_compare::{
    DuplicateMatch, DuplicateType, SignalScores, SimilarityMethod, compare, compare_scored,
};
pub use dsim_detect::{
    BatchDetector, Cluster, DEFAULT_SIMILARITY_THRESHOLD, DetectError, DetectorConfig,
    KeepStrategy,
};
pub use dsim_fingerprint::{
    DocumentFingerprint, Embedder, FingerprintConfig, FingerprintError, ImageHasher, SignalError,
    StubEmbedder, build_fingerprint,
};
pub use dsim_registry::{ComparisonCache, FingerprintRegistry, PairKey, RegistryError};

use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt;
use std::sync::{Arc, OnceLock, RwLock};
use std::time::{Duration, Instant};
use tracing::{info, warn};

/// Errors that can occur while driving the engine facade.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    Fingerprint(FingerprintError),
    Registry(RegistryError),
    Detect(DetectError),
}

impl fmt::Display for EngineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EngineError::Fingerprint(err) => write!(f, "fingerprint failure: {err}"),
            EngineError::Registry(err) => write!(f, "registry failure: {err}"),
            EngineError::Detect(err) => write!(f, "detection failure: {err}"),
        }
    }
}

impl Error for EngineError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            EngineError::Fingerprint(err) => Some(err),
            EngineError::Registry(err) => Some(err),
            EngineError::Detect(err) => Some(err),
        }
    }
}

impl From<FingerprintError> for EngineError {
    fn from(value: FingerprintError) -> Self {
        EngineError::Fingerprint(value)
    }
}

impl From<RegistryError> for EngineError {
    fn from(value: RegistryError) -> Self {
        EngineError::Registry(value)
    }
}

impl From<DetectError> for EngineError {
    fn from(value: DetectError) -> Self {
        EngineError::Detect(value)
    }
}

/// Metrics observer for engine operations. The success value of
/// `record_compare` reports whether the pair already had a cached score;
/// the success value of `record_batch` carries the number of matches found.
pub trait DedupMetrics: Send + Sync {
    fn record_fingerprint(&self, latency: Duration, result: Result<(), EngineError>);
    fn record_compare(&self, latency: Duration, result: Result<bool, EngineError>);
    fn record_batch(&self, latency: Duration, result: Result<usize, EngineError>);
}

/// Install or clear the global engine metrics recorder.
pub fn set_dedup_metrics(recorder: Option<Arc<dyn DedupMetrics>>) {
    let lock = metrics_lock();
    let mut guard = lock.write().expect("engine metrics lock poisoned");
    *guard = recorder;
}

fn metrics_lock() -> &'static RwLock<Option<Arc<dyn DedupMetrics>>> {
    static METRICS: OnceLock<RwLock<Option<Arc<dyn DedupMetrics>>>> = OnceLock::new();
    METRICS.get_or_init(|| RwLock::new(None))
}

fn metrics_recorder() -> Option<Arc<dyn DedupMetrics>> {
    let guard = metrics_lock()
        .read()
        .unwrap_or_else(|poisoned| poisoned.into_inner());
    guard.clone()
}

struct MetricsSpan {
    recorder: Arc<dyn DedupMetrics>,
    start: Instant,
}

impl MetricsSpan {
    fn start() -> Option<Self> {
        metrics_recorder().map(|recorder| Self {
            recorder,
            start: Instant::now(),
        })
    }

    fn record_fingerprint(self, result: Result<(), EngineError>) {
        self.recorder
            .record_fingerprint(self.start.elapsed(), result);
    }

    fn record_compare(self, result: Result<bool, EngineError>) {
        self.recorder.record_compare(self.start.elapsed(), result);
    }

    fn record_batch(self, result: Result<usize, EngineError>) {
        self.recorder.record_batch(self.start.elapsed(), result);
    }
}

/// Point-in-time operational counters exposed by [`DedupEngine::statistics`].
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EngineStatistics {
    /// Fingerprints currently registered.
    pub total_documents: usize,
    /// Pairwise scores currently cached.
    pub cached_comparisons: usize,
    /// Reporting cutoff applied by the detector.
    pub similarity_threshold: f64,
    /// Whether bulk sweeps fan out over the rayon pool.
    pub parallel: bool,
}

/// Facade wiring fingerprint construction, the shared registry, and the
/// batch detector behind a single entry point.
///
/// The engine owns the registry: every fingerprint created through it lands
/// there and becomes visible to subsequent comparisons, sweeps, clustering,
/// and resolution. Collaborators (semantic embedding, page hashing) are
/// optional; when one is absent or failing, the corresponding signal is
/// simply absent from the fingerprints the engine produces.
pub struct DedupEngine {
    registry: Arc<FingerprintRegistry>,
    detector: BatchDetector,
    embedder: Option<Arc<dyn Embedder>>,
    image_hasher: Option<Arc<dyn ImageHasher>>,
    fingerprint_config: FingerprintConfig,
}

impl DedupEngine {
    /// Build an engine over a fresh registry. Both configurations are
    /// validated up front.
    pub fn new(
        fingerprint_config: FingerprintConfig,
        detector_config: DetectorConfig,
    ) -> Result<Self, EngineError> {
        fingerprint_config.validate()?;
        let registry = Arc::new(FingerprintRegistry::new());
        let detector = BatchDetector::new(Arc::clone(&registry), detector_config)?;
        Ok(Self {
            registry,
            detector,
            embedder: None,
            image_hasher: None,
            fingerprint_config,
        })
    }

    /// Attach a semantic-embedding collaborator.
    pub fn with_embedder(mut self, embedder: Arc<dyn Embedder>) -> Self {
        self.embedder = Some(embedder);
        self
    }

    /// Attach a page-rendering/perceptual-hash collaborator.
    pub fn with_image_hasher(mut self, image_hasher: Arc<dyn ImageHasher>) -> Self {
        self.image_hasher = Some(image_hasher);
        self
    }

    pub fn registry(&self) -> &Arc<FingerprintRegistry> {
        &self.registry
    }

    pub fn fingerprint_config(&self) -> &FingerprintConfig {
        &self.fingerprint_config
    }

    pub fn detector_config(&self) -> &DetectorConfig {
        self.detector.config()
    }

    /// Fingerprint a document and register it, replacing any prior entry
    /// under the same id and evicting that id's cached comparisons.
    ///
    /// Collaborator failures degrade the affected signal to absent; blank
    /// id or text is a contract violation and fails the call.
    pub fn create_fingerprint(
        &self,
        document_id: &str,
        text: &str,
        metadata: Option<&serde_json::Value>,
        image_ref: Option<&str>,
    ) -> Result<Arc<DocumentFingerprint>, EngineError> {
        let mut span = MetricsSpan::start();
        match self.build_and_register(document_id, text, metadata, image_ref) {
            Ok(fingerprint) => {
                if let Some(span) = span.take() {
                    span.record_fingerprint(Ok(()));
                }
                Ok(fingerprint)
            }
            Err(err) => {
                if let Some(span) = span.take() {
                    span.record_fingerprint(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    fn build_and_register(
        &self,
        document_id: &str,
        text: &str,
        metadata: Option<&serde_json::Value>,
        image_ref: Option<&str>,
    ) -> Result<Arc<DocumentFingerprint>, EngineError> {
        if document_id.trim().is_empty() {
            return Err(FingerprintError::EmptyDocumentId.into());
        }
        if text.trim().is_empty() {
            return Err(FingerprintError::EmptyText.into());
        }

        let start = Instant::now();
        let semantic_vector = self.embedder.as_ref().and_then(|embedder| {
            match embedder.embed(text, self.fingerprint_config.embed_max_len) {
                Ok(vector) => Some(vector),
                Err(err) => {
                    warn!(document_id = %document_id, error = %err, "embedding_degraded");
                    None
                }
            }
        });
        let visual_hash = match (self.image_hasher.as_ref(), image_ref) {
            (Some(hasher), Some(image_ref)) => match hasher.perceptual_hash(image_ref) {
                Ok(hash) => Some(hash),
                Err(err) => {
                    warn!(document_id = %document_id, error = %err, "visual_hash_degraded");
                    None
                }
            },
            _ => None,
        };

        let fingerprint = build_fingerprint(
            document_id,
            text,
            metadata,
            semantic_vector,
            visual_hash,
            &self.fingerprint_config,
        )?;
        let word_count = fingerprint.word_count;
        let fingerprint = self.registry.upsert(fingerprint);
        info!(
            document_id = %document_id,
            word_count,
            elapsed_micros = start.elapsed().as_micros() as u64,
            "fingerprint_created"
        );
        Ok(fingerprint)
    }

    /// Compare two registered documents directly, independent of the
    /// detector threshold. The fused score is written back to the
    /// comparison cache. Returns `Ok(None)` when the pair falls below the
    /// reporting floor.
    pub fn compare_documents(
        &self,
        document_id_1: &str,
        document_id_2: &str,
    ) -> Result<Option<DuplicateMatch>, EngineError> {
        let mut span = MetricsSpan::start();
        match self.compare_pair(document_id_1, document_id_2) {
            Ok((cache_hit, matched)) => {
                if let Some(span) = span.take() {
                    span.record_compare(Ok(cache_hit));
                }
                Ok(matched)
            }
            Err(err) => {
                if let Some(span) = span.take() {
                    span.record_compare(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    fn compare_pair(
        &self,
        document_id_1: &str,
        document_id_2: &str,
    ) -> Result<(bool, Option<DuplicateMatch>), EngineError> {
        let a = self.registry.get(document_id_1)?;
        let b = self.registry.get(document_id_2)?;
        let key = PairKey::new(&a.document_id, &b.document_id);
        let cache_hit = self.registry.cached_score(&key).is_some();
        let (fused, matched) = compare_scored(&a, &b);
        self.registry.record_score(key, fused);
        Ok((cache_hit, matched))
    }

    /// One-versus-many detection; see [`BatchDetector::find_duplicates`].
    pub fn find_duplicates(
        &self,
        document_id: &str,
        candidates: Option<&[String]>,
    ) -> Result<Vec<DuplicateMatch>, EngineError> {
        Ok(self.detector.find_duplicates(document_id, candidates)?)
    }

    /// Full pairwise sweep; see [`BatchDetector::batch_detect`].
    pub fn batch_detect_duplicates(
        &self,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<DuplicateMatch>, EngineError> {
        let mut span = MetricsSpan::start();
        match self.detector.batch_detect(document_ids) {
            Ok(matches) => {
                if let Some(span) = span.take() {
                    span.record_batch(Ok(matches.len()));
                }
                Ok(matches)
            }
            Err(err) => {
                let err = EngineError::from(err);
                if let Some(span) = span.take() {
                    span.record_batch(Err(err.clone()));
                }
                Err(err)
            }
        }
    }

    /// Duplicate clusters over the chosen ids; see
    /// [`BatchDetector::duplicate_clusters`].
    pub fn duplicate_clusters(
        &self,
        document_ids: Option<&[String]>,
    ) -> Result<Vec<Cluster>, EngineError> {
        Ok(self.detector.duplicate_clusters(document_ids)?)
    }

    /// Cluster the given ids and keep exactly one document per cluster; see
    /// [`BatchDetector::resolve_duplicates`].
    pub fn remove_duplicates(
        &self,
        document_ids: &[String],
        strategy: KeepStrategy,
    ) -> Result<Vec<String>, EngineError> {
        Ok(self.detector.resolve_duplicates(document_ids, strategy)?)
    }

    /// Drop a fingerprint and every cached comparison involving it.
    pub fn remove_document(
        &self,
        document_id: &str,
    ) -> Result<Arc<DocumentFingerprint>, EngineError> {
        Ok(self.registry.remove(document_id)?)
    }

    /// Point-in-time counters for dashboards and tests.
    pub fn statistics(&self) -> EngineStatistics {
        EngineStatistics {
            total_documents: self.registry.len(),
            cached_comparisons: self.registry.cached_comparisons(),
            similarity_threshold: self.detector.config().similarity_threshold,
            parallel: self.detector.config().use_parallel,
        }
    }
}
