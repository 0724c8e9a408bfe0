//! # Duplicate Detection (`dsim_detect`)
//!
//! Corpus-level orchestration on top of [`dsim_compare`]: one-to-many
//! and many-to-many sweeps over the fingerprint registry, connected
//! duplicate clusters, and keeper resolution.
//!
//! Sweeps check the shared score cache before comparing and write back
//! after, so repeated queries over a stable corpus do not redo the
//! pairwise work. The sweep itself is O(n²) in the id set by contract;
//! candidate narrowing belongs upstream.
//!
//! - [`BatchDetector`]: `find_duplicates`, `batch_detect`,
//!   `duplicate_clusters`, `resolve_duplicates`.
//! - [`DetectorConfig`]: threshold, parallelism, and result-cap knobs.
//! - [`Cluster`] and [`KeepStrategy`]: clustering and resolution types.

pub mod detector;
pub mod types;

pub use crate::detector::BatchDetector;
pub use crate::types::{
    Cluster, DEFAULT_SIMILARITY_THRESHOLD, DETECTOR_CONFIG_VERSION, DetectError, DetectorConfig,
    KeepStrategy,
};
