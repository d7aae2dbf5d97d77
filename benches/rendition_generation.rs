//! Rendition Generation Benchmarks
//!
//! Throughput of single generations and of stale regeneration across a
//! document's full rendition set.
//!
//! Run with: `cargo bench --bench rendition_generation`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use rendition_engine::{Document, RenditionEngine, RenditionProfile, RenditionType};

fn create_document(size: usize) -> Document {
    Document::new("bench-doc", "bench.txt", "text/plain", "lorem ipsum ".repeat(size / 12))
}

fn bench_generate(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("generate");

    for size in [1_000usize, 100_000] {
        let doc = create_document(size);
        group.throughput(Throughput::Bytes(size as u64));

        for kind in [RenditionType::Pdf, RenditionType::WebOptimized, RenditionType::Thumbnail] {
            group.bench_with_input(BenchmarkId::new(kind.to_string(), size), &doc, |b, doc| {
                let engine = RenditionEngine::new();
                b.iter(|| {
                    rt.block_on(async {
                        let rendition = engine.generate(doc, kind.clone(), None).await.unwrap();
                        // Keep memory flat across iterations
                        engine.delete_rendition(&doc.id, &rendition.id).await;
                        black_box(rendition)
                    })
                });
            });
        }
    }

    group.finish();
}

fn bench_regenerate_stale(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();

    c.bench_function("regenerate_stale/default_profiles", |b| {
        b.iter_batched(
            || {
                rt.block_on(async {
                    let engine = RenditionEngine::new();
                    for profile in RenditionProfile::defaults() {
                        engine.register_profile(profile).await;
                    }
                    let doc = create_document(10_000);
                    engine.auto_generate(&doc).await;
                    (engine, doc.with_version(2))
                })
            },
            |(engine, doc)| rt.block_on(async { black_box(engine.regenerate_stale(&doc).await) }),
            criterion::BatchSize::SmallInput,
        );
    });
}

criterion_group!(benches, bench_generate, bench_regenerate_stale);
criterion_main!(benches);
