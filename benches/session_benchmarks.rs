//! Benchmarks for buffer edits and session bookkeeping.
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use quire_buffer::TextBuffer;
use quire_core::{Config, MemoryFileSystem, ProjectContext, SessionController};
use std::sync::Arc;
use tokio::runtime::Runtime;

/// Generates a large text string for benchmarking.
fn generate_large_text(lines: usize) -> String {
    (0..lines)
        .map(|i| format!("Line {}: This is a sample line of text for benchmarking purposes.\n", i))
        .collect()
}

/// A session over `count` in-memory files named `file{i}.txt`.
fn session_with_files(count: usize) -> SessionController {
    let text = generate_large_text(200);
    let fs = (0..count).fold(MemoryFileSystem::new(), |fs, i| {
        fs.with_file(format!("/bench/file{i}.txt"), text.as_str())
    });
    SessionController::new(ProjectContext::new("/bench"), Arc::new(fs), Config::default())
}

/// Benchmarks buffer creation.
fn bench_buffer_creation(c: &mut Criterion) {
    let mut group = c.benchmark_group("buffer_creation");

    for size in [100, 1000, 10000].iter() {
        let text = generate_large_text(*size);

        group.bench_with_input(BenchmarkId::new("from_str", size), &text, |b, text| {
            b.iter(|| {
                let buffer = TextBuffer::from(black_box(text.as_str()));
                black_box(buffer)
            })
        });
    }

    group.finish();
}

/// Benchmarks whole-text replacement and its undo.
fn bench_set_text_undo(c: &mut Criterion) {
    let mut group = c.benchmark_group("set_text_undo");

    let base_text = generate_large_text(10000);
    let edited = base_text.replace("sample", "edited");

    group.bench_function("set_text_then_undo", |b| {
        b.iter_with_setup(
            || TextBuffer::from(base_text.as_str()),
            |mut buffer| {
                buffer.set_text(black_box(&edited));
                buffer.undo().unwrap();
                black_box(buffer)
            },
        )
    });

    group.finish();
}

/// Benchmarks opening and closing documents through the controller.
fn bench_session(c: &mut Criterion) {
    let mut group = c.benchmark_group("session");
    let runtime = Runtime::new().unwrap();

    for count in [10, 50].iter() {
        group.bench_with_input(BenchmarkId::new("open_all", count), count, |b, &count| {
            b.iter_with_setup(
                || session_with_files(count),
                |mut session| {
                    runtime.block_on(async {
                        for i in 0..count {
                            session.open_document(format!("file{i}.txt")).await.unwrap();
                        }
                    });
                    black_box(session)
                },
            )
        });

        group.bench_with_input(BenchmarkId::new("close_front", count), count, |b, &count| {
            b.iter_with_setup(
                || {
                    let mut session = session_with_files(count);
                    runtime.block_on(async {
                        for i in 0..count {
                            session.open_document(format!("file{i}.txt")).await.unwrap();
                        }
                    });
                    session
                },
                |mut session| {
                    while !session.is_empty() {
                        session.close_document(0).unwrap();
                    }
                    black_box(session)
                },
            )
        });

        group.bench_with_input(BenchmarkId::new("save_all", count), count, |b, &count| {
            b.iter_with_setup(
                || {
                    let mut session = session_with_files(count);
                    runtime.block_on(async {
                        for i in 0..count {
                            session.open_document(format!("file{i}.txt")).await.unwrap();
                            session.edit_selected(|e| e.insert(0, "x").unwrap()).unwrap();
                        }
                    });
                    session
                },
                |mut session| {
                    let report = runtime.block_on(session.save_all());
                    black_box(report)
                },
            )
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer_creation, bench_set_text_undo, bench_session);

criterion_main!(benches);
