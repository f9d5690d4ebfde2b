use campus_rag::embeddings::{Embedder, HashingEmbedder, cosine_similarity};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const PASSAGE: &str = "Semester fees must be paid before the last working day of July. \
    Students who miss the deadline pay a late fine of two hundred rupees per week. \
    Fee receipts are issued by the accounts section on the ground floor of the admin block.";

pub fn criterion_benchmark(c: &mut Criterion) {
    let embedder = HashingEmbedder::default();
    c.bench_function("embed_passage", |b| {
        b.iter(|| embedder.embed(black_box(PASSAGE)))
    });

    let query = embedder.embed("When is the fee deadline?");
    let stored: Vec<Vec<f32>> = (0..1_000)
        .map(|i| embedder.embed(&format!("{PASSAGE} Notice number {i}.")))
        .collect();
    c.bench_function("scan_1000_embeddings", |b| {
        b.iter(|| {
            stored
                .iter()
                .map(|e| cosine_similarity(black_box(&query), e))
                .fold(f32::MIN, f32::max)
        })
    });
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
