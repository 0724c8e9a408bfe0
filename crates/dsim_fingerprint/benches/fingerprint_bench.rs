use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use dsim_fingerprint::{build_fingerprint, extract_structural_features, FingerprintConfig};

fn synthetic_contract(paragraphs: usize) -> String {
    let mut text = String::from("WHEREAS, the parties wish to enter into this Agreement;\n\n");
    for i in 0..paragraphs {
        text.push_str(&format!(
            "{}. The party of the first part shall deliver item {} to the \
             party of the second part (the \"Recipient\") no later than day {}.\n\n",
            i + 1,
            i,
            i * 3
        ));
    }
    text.push_str("IN WITNESS WHEREOF, the parties execute this Agreement.\nSignature: _____\n");
    text
}

fn bench_fingerprint(c: &mut Criterion) {
    let cfg = FingerprintConfig::default();
    let mut group = c.benchmark_group("fingerprint");

    for size in [10, 100, 500].iter() {
        let text = synthetic_contract(*size);
        group.throughput(Throughput::Bytes(text.len() as u64));
        group.bench_function(format!("build_{size}"), |b| {
            b.iter(|| {
                build_fingerprint(
                    black_box("bench-doc"),
                    black_box(&text),
                    None,
                    None,
                    None,
                    black_box(&cfg),
                )
                .expect("build fingerprint")
            })
        });
        group.bench_function(format!("structural_{size}"), |b| {
            b.iter(|| extract_structural_features(black_box(&text)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fingerprint);
criterion_main!(benches);
