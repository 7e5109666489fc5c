use criterion::{criterion_group, criterion_main, Criterion};
use sparsify::features::{generate, FeatureKind};

fn bench_generate(c: &mut Criterion) {
    let tokens: Vec<String> = (0..512).map(|i| format!("tok{i}")).collect();
    c.bench_function("osb_gap4_512_tokens", |b| {
        b.iter(|| generate(&tokens, 4, FeatureKind::OrthogonalSparseBigram))
    });
    c.bench_function("gappy_gap4_512_tokens", |b| {
        b.iter(|| generate(&tokens, 4, FeatureKind::GappyBigram))
    });
    c.bench_function("trigram_512_tokens", |b| {
        b.iter(|| generate(&tokens, 0, FeatureKind::ThreeGram))
    });
}

criterion_group!(benches, bench_generate);
criterion_main!(benches);
