use campus_rag::embeddings::{ChunkingConfig, chunk_text};
use campus_rag::ingestion::markup::{html_to_text, markdown_to_text};
use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;

const SENTENCES: [&str; 6] = [
    "Semester fees must be paid before the last working day of July.",
    "Students who miss the deadline pay a late fine of two hundred rupees per week!",
    "Hostel gates close at ten in the night and open at six in the morning.",
    "Is the library open on Sundays? Only during the examination period.",
    "Scholarship applications are verified by the accounts section within two weeks.",
    "Hall tickets are issued at the examination cell a week before the first paper...",
];

fn handbook(paragraphs: usize) -> String {
    (0..paragraphs)
        .map(|i| SENTENCES[i % SENTENCES.len()])
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn criterion_benchmark(c: &mut Criterion) {
    let text = handbook(2_000);
    let config = ChunkingConfig::default();
    c.bench_function("chunking", |b| {
        b.iter(|| chunk_text(black_box(&text), black_box(&config)))
    });

    let markdown = format!("# Student Handbook\n\n{}\n\n- {}\n", text, SENTENCES[0]);
    c.bench_function("markdown_to_text", |b| {
        b.iter(|| markdown_to_text(black_box(&markdown)))
    });

    let html = format!(
        "<html><head><title>Handbook</title></head><body><p>{}</p></body></html>",
        text
    );
    c.bench_function("html_to_text", |b| b.iter(|| html_to_text(black_box(&html))));
}

criterion_group!(benches, criterion_benchmark);
criterion_main!(benches);
