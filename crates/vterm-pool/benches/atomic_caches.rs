//! Benchmarks: write/read cost of `AtomicCaches`, the thing a render thread
//! pays once per tick and a host UI thread may poll many times per tick.
//!
//! Run with: cargo bench --package vterm-pool

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use vterm_core::{CursorShape, CursorState, GridView, TerminalSnapshot};
use vterm_pool::AtomicCaches;

fn make_snapshot(history_len: usize) -> TerminalSnapshot {
    TerminalSnapshot {
        view: GridView::empty(120, 40),
        cursor: CursorState { line: 39, col: 10, visible: true, shape: CursorShape::Block },
        display_offset: 0,
        history_len,
        selection: None,
        search_matches: Vec::new(),
        focused_match: None,
        title: Some("zsh".to_string()),
        generation: 1,
    }
}

fn bench_write_snapshot(c: &mut Criterion) {
    let caches = AtomicCaches::new();
    let snapshot = make_snapshot(5_000);
    c.bench_function("write_snapshot", |b| {
        b.iter(|| caches.write_snapshot(black_box(&snapshot)));
    });
}

fn bench_reads(c: &mut Criterion) {
    let caches = AtomicCaches::new();
    caches.write_snapshot(&make_snapshot(5_000));

    let mut group = c.benchmark_group("reads");
    group.bench_function("cursor", |b| b.iter(|| black_box(caches.cursor())));
    group.bench_function("scroll_info", |b| b.iter(|| black_box(caches.scroll_info())));
    group.bench_function("title", |b| b.iter(|| black_box(caches.title())));
    group.finish();
}

criterion_group!(benches, bench_write_snapshot, bench_reads);
criterion_main!(benches);
