use docsim::{
    DedupEngine, DetectError, DetectorConfig, Embedder, EngineError, FingerprintConfig,
    FingerprintError, ImageHasher, KeepStrategy, RegistryError, SignalError,
};
use std::sync::Arc;

const NOTICE: &str = "NOTICE OF DEFAULT\n\n\
    1. The tenant has failed to pay rent when due.\n\
    2. The tenant has ten days to cure the default.";

fn default_engine() -> DedupEngine {
    DedupEngine::new(FingerprintConfig::default(), DetectorConfig::default())
        .expect("default configs are valid")
}

struct OfflineEmbedder;

impl Embedder for OfflineEmbedder {
    fn embed(&self, _text: &str, _max_len: Option<usize>) -> Result<Vec<f32>, SignalError> {
        Err(SignalError::Timeout(250))
    }
}

struct OfflineHasher;

impl ImageHasher for OfflineHasher {
    fn perceptual_hash(&self, _image_ref: &str) -> Result<String, SignalError> {
        Err(SignalError::ImageHash("render queue unavailable".into()))
    }
}

#[test]
fn blank_text_is_rejected_for_every_whitespace_shape() {
    let engine = default_engine();
    let whitespace_variations = vec!["", " ", "   ", "\t", "\n", "\r\n", " \t \n ", "\t\t\t"];

    for ws in whitespace_variations {
        let result = engine.create_fingerprint("blank-doc", ws, None, None);
        assert!(
            matches!(
                result,
                Err(EngineError::Fingerprint(FingerprintError::EmptyText))
            ),
            "should reject whitespace text: {ws:?}",
        );
    }
}

#[test]
fn blank_document_id_is_rejected() {
    let engine = default_engine();
    for id in ["", " ", "\t\n"] {
        let result = engine.create_fingerprint(id, NOTICE, None, None);
        assert!(
            matches!(
                result,
                Err(EngineError::Fingerprint(FingerprintError::EmptyDocumentId))
            ),
            "should reject blank id: {id:?}",
        );
    }
}

#[test]
fn find_duplicates_with_unknown_target_fails() {
    let engine = default_engine();
    let result = engine.find_duplicates("never-registered", None);
    assert!(matches!(
        result,
        Err(EngineError::Detect(DetectError::Registry(
            RegistryError::NotFound { .. }
        )))
    ));
}

#[test]
fn unknown_candidate_id_fails_the_whole_call() {
    let engine = default_engine();
    engine
        .create_fingerprint("present", NOTICE, None, None)
        .expect("fingerprint");

    let candidates = vec!["present".to_string(), "absent".to_string()];
    let result = engine.batch_detect_duplicates(Some(&candidates));
    assert!(matches!(
        result,
        Err(EngineError::Detect(DetectError::Registry(
            RegistryError::NotFound { .. }
        )))
    ));
}

#[test]
fn remove_duplicates_rejects_unknown_ids() {
    let engine = default_engine();
    engine
        .create_fingerprint("only", NOTICE, None, None)
        .expect("fingerprint");

    let ids = vec!["only".to_string(), "ghost".to_string()];
    let result = engine.remove_duplicates(&ids, KeepStrategy::Newest);
    assert!(matches!(
        result,
        Err(EngineError::Detect(DetectError::Registry(
            RegistryError::NotFound { .. }
        )))
    ));
}

#[test]
fn out_of_range_threshold_is_rejected_at_construction() {
    let detector_cfg = DetectorConfig::new().with_similarity_threshold(1.5);
    let result = DedupEngine::new(FingerprintConfig::default(), detector_cfg);
    assert!(matches!(
        result,
        Err(EngineError::Detect(DetectError::InvalidConfig(_)))
    ));
}

#[test]
fn zero_max_results_is_rejected_at_construction() {
    let detector_cfg = DetectorConfig::new().with_max_results(0);
    let result = DedupEngine::new(FingerprintConfig::default(), detector_cfg);
    assert!(matches!(
        result,
        Err(EngineError::Detect(DetectError::InvalidConfig(_)))
    ));
}

#[test]
fn unsupported_fingerprint_config_version_is_rejected() {
    let fingerprint_cfg = FingerprintConfig {
        version: 99,
        ..Default::default()
    };
    let result = DedupEngine::new(fingerprint_cfg, DetectorConfig::default());
    assert!(matches!(
        result,
        Err(EngineError::Fingerprint(
            FingerprintError::InvalidConfigVersion(99)
        ))
    ));
}

#[test]
fn collaborator_outages_never_fail_fingerprinting() {
    let engine = default_engine()
        .with_embedder(Arc::new(OfflineEmbedder))
        .with_image_hasher(Arc::new(OfflineHasher));

    let fingerprint = engine
        .create_fingerprint("degraded-notice", NOTICE, None, Some("scan-007.png"))
        .expect("outages degrade signals, they do not fail the call");

    assert!(fingerprint.semantic_vector.is_none());
    assert!(fingerprint.visual_hash.is_none());
    // The degraded fingerprint still participates in detection.
    let matches = engine
        .find_duplicates("degraded-notice", None)
        .expect("detection still works");
    assert!(matches.is_empty());
}

#[test]
fn engine_errors_render_their_member_context() {
    let fingerprint_err = EngineError::Fingerprint(FingerprintError::EmptyText);
    let registry_err = EngineError::Registry(RegistryError::NotFound {
        document_id: "doc-9".into(),
    });
    let detect_err = EngineError::Detect(DetectError::InvalidConfig("bad threshold".into()));

    assert_eq!(
        fingerprint_err.to_string(),
        "fingerprint failure: document text must not be empty"
    );
    assert!(registry_err.to_string().contains("doc-9"));
    assert!(detect_err.to_string().contains("bad threshold"));
}

#[test]
fn error_source_chain_reaches_member_errors() {
    use std::error::Error;

    let err = EngineError::Registry(RegistryError::NotFound {
        document_id: "chained".into(),
    });
    let source = err.source().expect("member error is the source");
    assert!(source.to_string().contains("chained"));
}
