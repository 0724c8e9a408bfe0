//! Collaborator seams for signals the engine consumes but does not produce:
//! semantic embeddings and perceptual hashes of rendered pages.
//!
//! Both collaborators are called only during fingerprint creation, never
//! during comparison. Implementations own their transport and are expected
//! to bound any network or model call with a timeout; a returned error
//! degrades the affected signal to absent instead of failing the build.

use fxhash::hash64;
use thiserror::Error;

/// Failure surfaced by a signal collaborator.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SignalError {
    #[error("embedding failed: {0}")]
    Embedding(String),
    #[error("image hashing failed: {0}")]
    ImageHash(String),
    #[error("collaborator timed out after {0}ms")]
    Timeout(u64),
}

/// Text-embedding collaborator producing a fixed-size semantic vector.
pub trait Embedder: Send + Sync {
    /// Embed `text`, truncated to `max_len` characters when given.
    fn embed(&self, text: &str, max_len: Option<usize>) -> Result<Vec<f32>, SignalError>;
}

/// Page-rendering/OCR collaborator producing a perceptual hash string for a
/// rendered document image.
pub trait ImageHasher: Send + Sync {
    fn perceptual_hash(&self, image_ref: &str) -> Result<String, SignalError>;
}

/// Deterministic embedder for tests and offline runs. Generates sinusoid
/// values derived from a hash of the input text, so equal inputs always
/// yield equal unit-length vectors with minimal CPU cost.
#[derive(Debug, Clone)]
pub struct StubEmbedder {
    pub dim: usize,
}

impl Default for StubEmbedder {
    fn default() -> Self {
        Self { dim: 384 }
    }
}

impl StubEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim }
    }
}

impl Embedder for StubEmbedder {
    fn embed(&self, text: &str, max_len: Option<usize>) -> Result<Vec<f32>, SignalError> {
        let bounded: String = match max_len {
            Some(limit) => text.chars().take(limit).collect(),
            None => text.to_string(),
        };
        let mut v = vec![0f32; self.dim];
        let h = hash64(bounded.as_bytes());
        for (idx, value) in v.iter_mut().enumerate() {
            *value = ((h >> (idx % 32)) as f32 * 0.0001).sin();
        }
        l2_normalize_in_place(&mut v);
        Ok(v)
    }
}

/// Scale a vector to unit length in place. Zero vectors are left unchanged.
pub fn l2_normalize_in_place(v: &mut [f32]) {
    let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm > 0.0 {
        for x in v.iter_mut() {
            *x /= norm;
        }
    }
}
