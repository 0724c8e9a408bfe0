use criterion::{Criterion, black_box, criterion_group, criterion_main};
use docsim::{DedupEngine, DetectorConfig, FingerprintConfig, build_fingerprint, compare};

const SERVICE_AGREEMENT: &str = "MASTER SERVICE AGREEMENT\n\n\
    This Master Service Agreement is entered into by and between Meridian \
    Analytics LLC, a Delaware limited liability company, and Harbor Light \
    Consulting Inc., a California corporation.\n\n\
    WHEREAS, the Provider offers professional data engineering services; and\n\
    WHEREAS, the Client wishes to engage the Provider on the terms below;\n\n\
    NOW, THEREFORE, the parties agree as follows:\n\n\
    1. Services. The Provider shall perform the services described in each \
    statement of work executed under this Agreement.\n\
    2. Compensation. The Client shall pay the fees set out in the applicable \
    statement of work within thirty days of invoice.\n\
    3. Term. This Agreement remains in force for one year and renews \
    automatically unless either party gives notice of non-renewal at least \
    ninety (90) days before the renewal date.\n\
    4. Confidentiality. Each party shall protect the other party's \
    confidential information with reasonable care and use it only to perform \
    this Agreement.\n\
    5. Liability. Neither party is liable for indirect or consequential \
    damages arising out of this Agreement.\n\n\
    IN WITNESS WHEREOF, the parties have executed this Agreement as of the \
    date last signed below.\n\n\
    Signature of Provider: ____________\n\
    Signature of Client: ____________";

fn fingerprint_bench(c: &mut Criterion) {
    let cfg = FingerprintConfig::default();
    c.bench_function("fingerprint_service_agreement", |b| {
        b.iter(|| {
            let fp = build_fingerprint(
                "bench-agreement",
                black_box(SERVICE_AGREEMENT),
                None,
                None,
                None,
                &cfg,
            )
            .expect("bench fingerprint");
            black_box(fp);
        });
    });
}

fn compare_bench(c: &mut Criterion) {
    let cfg = FingerprintConfig::default();
    let original = build_fingerprint("bench-original", SERVICE_AGREEMENT, None, None, None, &cfg)
        .expect("original fingerprint");
    let amended_text = SERVICE_AGREEMENT.replace("ninety (90) days", "sixty (60) days");
    let amended = build_fingerprint("bench-amended", &amended_text, None, None, None, &cfg)
        .expect("amended fingerprint");

    c.bench_function("compare_amended_agreement", |b| {
        b.iter(|| {
            let verdict = compare(black_box(&original), black_box(&amended));
            black_box(verdict);
        });
    });
}

fn sweep_bench(c: &mut Criterion) {
    let engine = seeded_engine();
    c.bench_function("batch_sweep_40_docs", |b| {
        b.iter(|| {
            let matches = engine.batch_detect_duplicates(None).expect("bench sweep");
            black_box(matches);
        });
    });
}

fn seeded_engine() -> DedupEngine {
    let engine = DedupEngine::new(FingerprintConfig::default(), DetectorConfig::default())
        .expect("default configs are valid");
    for seed in 0..40 {
        engine
            .create_fingerprint(&format!("corpus-{seed}"), &corpus_text(seed), None, None)
            .expect("seed fingerprint");
    }
    engine
}

fn corpus_text(seed: usize) -> String {
    match seed % 4 {
        0 => SERVICE_AGREEMENT.to_string(),
        1 => format!("  {}  ", SERVICE_AGREEMENT.to_uppercase()),
        2 => SERVICE_AGREEMENT.replace("ninety (90) days", &format!("{} days", 30 + seed)),
        _ => format!(
            "Court filing memorandum {seed}. The clerk entered the scheduling \
             order and the parties received notice by mail on the date shown \
             in the docket for case number {seed}."
        ),
    }
}

criterion_group!(engine_benches, fingerprint_bench, compare_bench, sweep_bench);
criterion_main!(engine_benches);
