use dsim_registry::RegistryError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Current detector configuration version.
pub const DETECTOR_CONFIG_VERSION: u32 = 1;

/// Default minimum fused score for a match to be reported.
pub const DEFAULT_SIMILARITY_THRESHOLD: f64 = 0.7;

/// Runtime configuration for detection sweeps.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DetectorConfig {
    /// Semantic version of the detector configuration.
    pub version: u32,
    /// Minimum fused score a match must reach to be reported. One
    /// cutoff for every duplicate type; distinct from the comparator's
    /// internal reporting floor.
    pub similarity_threshold: f64,
    /// Run pairwise sweeps on the rayon thread pool (default false).
    pub use_parallel: bool,
    /// Cap on reported matches per sweep; `None` reports everything.
    pub max_results: Option<usize>,
}

impl DetectorConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_similarity_threshold(mut self, threshold: f64) -> Self {
        self.similarity_threshold = threshold;
        self
    }

    pub fn with_parallel(mut self, use_parallel: bool) -> Self {
        self.use_parallel = use_parallel;
        self
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = Some(max_results);
        self
    }

    /// Validate the configuration before any sweep runs with it.
    pub fn validate(&self) -> Result<(), DetectError> {
        if self.version != DETECTOR_CONFIG_VERSION {
            return Err(DetectError::InvalidConfig(format!(
                "unsupported detector config version {}",
                self.version
            )));
        }
        if !(0.0..=1.0).contains(&self.similarity_threshold) {
            return Err(DetectError::InvalidConfig(format!(
                "similarity_threshold must be within [0.0, 1.0], got {}",
                self.similarity_threshold
            )));
        }
        if self.max_results == Some(0) {
            return Err(DetectError::InvalidConfig(
                "max_results must be greater than zero when set".into(),
            ));
        }
        Ok(())
    }
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            version: DETECTOR_CONFIG_VERSION,
            similarity_threshold: DEFAULT_SIMILARITY_THRESHOLD,
            use_parallel: false,
            max_results: None,
        }
    }
}

/// How the resolver picks the surviving document in a cluster.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KeepStrategy {
    /// Keep the most recently fingerprinted document.
    Newest,
    /// Keep the earliest fingerprinted document.
    Oldest,
    /// Keep the document with the highest word count.
    Longest,
    /// Keep the document with the lowest word count.
    Shortest,
}

/// A family of transitively connected duplicates.
///
/// Holds at least two member ids, sorted ascending. Clusters are
/// rebuilt from the current fingerprints on every request, never
/// persisted.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Cluster {
    pub document_ids: Vec<String>,
}

impl Cluster {
    pub fn len(&self) -> usize {
        self.document_ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.document_ids.is_empty()
    }

    pub fn contains(&self, document_id: &str) -> bool {
        self.document_ids.iter().any(|id| id == document_id)
    }
}

/// Errors produced by the detection layer.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DetectError {
    /// Invalid detector configuration.
    #[error("invalid detector config: {0}")]
    InvalidConfig(String),
    /// A target or candidate id has no registered fingerprint.
    #[error("registry error: {0}")]
    Registry(#[from] RegistryError),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        let cfg = DetectorConfig::default();
        assert!(cfg.validate().is_ok());
        assert_eq!(cfg.similarity_threshold, DEFAULT_SIMILARITY_THRESHOLD);
        assert!(!cfg.use_parallel);
        assert!(cfg.max_results.is_none());
    }

    #[test]
    fn out_of_range_threshold_rejected() {
        let cfg = DetectorConfig::new().with_similarity_threshold(1.5);
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            DetectError::InvalidConfig(msg) => assert!(msg.contains("similarity_threshold")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn unsupported_version_rejected() {
        let cfg = DetectorConfig {
            version: 9,
            ..DetectorConfig::default()
        };
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            DetectError::InvalidConfig(msg) => assert!(msg.contains("version")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn zero_max_results_rejected() {
        let cfg = DetectorConfig::new().with_max_results(0);
        let err = cfg.validate().expect_err("config should be invalid");
        match err {
            DetectError::InvalidConfig(msg) => assert!(msg.contains("max_results")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn keep_strategy_serializes_snake_case() {
        let json = serde_json::to_string(&KeepStrategy::Newest).expect("serialize");
        assert_eq!(json, "\"newest\"");
    }

    #[test]
    fn cluster_membership_helpers() {
        let cluster = Cluster {
            document_ids: vec!["a".into(), "b".into()],
        };
        assert_eq!(cluster.len(), 2);
        assert!(!cluster.is_empty());
        assert!(cluster.contains("a"));
        assert!(!cluster.contains("c"));
    }
}
