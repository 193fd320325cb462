use criterion::{criterion_group, criterion_main, Criterion};

use bsbi_index::{
    builder::BuilderOptions,
    index::BufferKind,
    search::{search_boolean, search_vector},
};
use helpers::{documents::word, index::TestIndex};

fn criterion_benchmark(c: &mut Criterion) {
    // Create the index
    let data = TestIndex::new(
        1000,
        8,
        1250,
        20.,
        Some(1),
        BuilderOptions {
            weight_function: 4,
            stemming: false,
            ..Default::default()
        },
    );
    let index = data.load(BufferKind::Mmap);

    let query = data.documents[10].text();
    c.bench_function("vector (first page)", |b| {
        b.iter(|| search_vector(&index, &query, 10).unwrap().first_page().len())
    });
    c.bench_function("vector (all pages)", |b| {
        b.iter(|| search_vector(&index, &query, 10).unwrap().into_sorted_vec().unwrap().len())
    });

    let query = format!("({} || {}) && ({}) && !({})", word(0), word(5), word(17), word(3));
    c.bench_function("boolean", |b| {
        b.iter(|| search_boolean(&index, &query).unwrap().documents.len())
    });
}

criterion_group! {
    name = benches;
    config = Criterion::default().significance_level(0.1).sample_size(100);
    targets = criterion_benchmark
}
criterion_main!(benches);
