//! Benchmarks: VTE parsing throughput and snapshot (damage-diff) performance.
//!
//! Run with: cargo bench --package vterm-terminal

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use vterm_terminal::Terminal;

// ── Data generators ──

/// Pure ASCII text (simulates `cat large_file`).
fn gen_ascii(size: usize) -> Vec<u8> {
    let line = b"abcdefghijklmnopqrstuvwxyz ABCDEFGHIJKLMNOPQRSTUVWXYZ 0123456789\r\n";
    line.iter().cycle().take(size).copied().collect()
}

/// 256-color ANSI escape sequences.
fn gen_ansi_color(size: usize) -> Vec<u8> {
    let mut buf = Vec::with_capacity(size);
    let mut i: u8 = 0;
    while buf.len() < size {
        // \x1b[38;5;Nm — set foreground to 256-color N
        let seq = format!("\x1b[38;5;{}mX", i);
        buf.extend_from_slice(seq.as_bytes());
        i = i.wrapping_add(1);
    }
    buf.truncate(size);
    buf
}

/// Fast scrolling (newline-heavy output).
fn gen_scroll(size: usize) -> Vec<u8> {
    let line = b"line\n";
    line.iter().cycle().take(size).copied().collect()
}

/// Unicode CJK wide characters (Korean/Chinese/Japanese).
fn gen_unicode(size: usize) -> Vec<u8> {
    let text = "가나다라마바사아자차카타파하 你好世界 こんにちは\r\n";
    let bytes = text.as_bytes();
    bytes.iter().cycle().take(size).copied().collect()
}

// ── VTE throughput benchmarks ──

fn bench_vte_throughput(c: &mut Criterion) {
    let sizes: &[(usize, &str)] = &[
        (10 * 1024, "10KB"),
        (100 * 1024, "100KB"),
        (1024 * 1024, "1MB"),
    ];

    let generators: &[(&str, fn(usize) -> Vec<u8>)] = &[
        ("ascii", gen_ascii),
        ("ansi_color", gen_ansi_color),
        ("scroll", gen_scroll),
        ("unicode", gen_unicode),
    ];

    for &(gen_name, gen_fn) in generators {
        let mut group = c.benchmark_group(format!("vte_throughput/{}", gen_name));

        for &(size, label) in sizes {
            let data = gen_fn(size);
            group.throughput(Throughput::Bytes(data.len() as u64));

            group.bench_with_input(BenchmarkId::new("parse", label), &data, |b, data| {
                // Terminal::new() spawns a real PTY — we only use it as a Term host.
                let terminal = Terminal::new(120, 40).expect("create terminal");

                b.iter(|| {
                    terminal.bench_write_to_term(black_box(data));
                });
            });
        }
        group.finish();
    }
}

// ── Snapshot benchmarks ──

fn bench_snapshot(c: &mut Criterion) {
    let mut group = c.benchmark_group("snapshot");

    // Full redraw: first snapshot after populating the screen.
    group.bench_function("full_redraw/120x40", |b| {
        let mut terminal = Terminal::new(120, 40).expect("create terminal");
        let fill = gen_ascii(120 * 40);
        terminal.bench_write_to_term(&fill);

        b.iter(|| {
            black_box(terminal.bench_force_snapshot());
        });
    });

    // Partial update: only a few lines change between snapshots.
    group.bench_function("partial_update/120x40", |b| {
        let mut terminal = Terminal::new(120, 40).expect("create terminal");
        let fill = gen_ascii(120 * 40);
        terminal.bench_write_to_term(&fill);
        terminal.bench_force_snapshot();

        let small_change = b"partial update line\r\n";

        b.iter(|| {
            terminal.bench_write_to_term(small_change);
            black_box(terminal.bench_force_snapshot());
        });
    });

    // No change: the diff fast-path when nothing changed since last snapshot.
    group.bench_function("no_change/120x40", |b| {
        let mut terminal = Terminal::new(120, 40).expect("create terminal");
        let fill = gen_ascii(120 * 40);
        terminal.bench_write_to_term(&fill);
        terminal.bench_force_snapshot();

        b.iter(|| {
            black_box(terminal.bench_force_snapshot());
        });
    });

    group.finish();
}

criterion_group!(benches, bench_vte_throughput, bench_snapshot);
criterion_main!(benches);
