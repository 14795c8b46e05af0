//! Benchmarks: row-hash cost and render-cache hit/miss cost, the two things
//! that decide whether the L1/L2 chain actually pays for itself versus just
//! shaping every row every frame.
//!
//! Run with: cargo bench --package vterm-render

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};

// cache.rs's hash/cache types are crate-private; this bench exercises them
// through the small `#[doc(hidden)]` re-export below rather than duplicating
// the hashing logic here.
use vterm_render::bench_support::{hash_row_text, make_row, RenderCache};

fn bench_row_hash(c: &mut Criterion) {
    let mut group = c.benchmark_group("row_hash");
    for cols in [80usize, 120, 240] {
        let row = make_row(cols);
        group.bench_with_input(BenchmarkId::new("hash_row_text", cols), &row, |b, row| {
            b.iter(|| black_box(hash_row_text(row)));
        });
    }
    group.finish();
}

fn bench_l1_hit_vs_rebuild(c: &mut Criterion) {
    let mut group = c.benchmark_group("l1_cache");
    let row = make_row(120);
    let text_hash = hash_row_text(&row);

    group.bench_function("insert_then_lookup_hit", |b| {
        let mut cache = RenderCache::new();
        cache.insert_l1(text_hash, 0, Default::default());
        b.iter(|| black_box(cache.lookup_l1(text_hash, 0).is_some()));
    });

    group.bench_function("lookup_miss", |b| {
        let cache = RenderCache::new();
        b.iter(|| black_box(cache.lookup_l1(text_hash, 0).is_some()));
    });

    group.finish();
}

criterion_group!(benches, bench_row_hash, bench_l1_hit_vs_rebuild);
criterion_main!(benches);
