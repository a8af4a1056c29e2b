//! Stream buffer and incremental synthesizer overhead
//!
//! The mock backend is silent, so these numbers are the streaming core's own
//! cost per word and per chunk, excluding any model.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use soundboard_core::config::SynthesizerConfig;
use soundboard_core::engine::{MockBackend, PlainTextCompiler};
use soundboard_core::streaming::{AudioChunk, IncrementalSynthesizer, StreamBuffer};
use std::sync::Arc;

const SAMPLE_RATE: u32 = 24000;
const CHUNK_SAMPLES: usize = 1200;

const SENTENCE: &str = "So the plan for tomorrow is simple, we meet at the station at nine, \
    take the early train, and grab coffee on the way. Any questions?";

fn bench_buffer_add(c: &mut Criterion) {
    let mut group = c.benchmark_group("stream_buffer_add");

    for max_buffer_ms in [50.0, 200.0, 1000.0] {
        group.throughput(Throughput::Elements(100));
        group.bench_with_input(
            BenchmarkId::from_parameter(max_buffer_ms as u64),
            &max_buffer_ms,
            |b, &max_buffer_ms| {
                b.iter(|| {
                    let mut buffer = StreamBuffer::new(SAMPLE_RATE, max_buffer_ms, 10.0);
                    let mut released = 0;
                    for word_index in 0..100 {
                        let chunk = AudioChunk::new(vec![0.1; CHUNK_SAMPLES], SAMPLE_RATE, word_index, false);
                        released += buffer.add(chunk).len();
                    }
                    released += buffer.commit_all().len();
                    black_box(released)
                });
            },
        );
    }

    group.finish();
}

fn bench_buffer_rollback(c: &mut Criterion) {
    c.bench_function("stream_buffer_rollback", |b| {
        b.iter(|| {
            let mut buffer = StreamBuffer::new(SAMPLE_RATE, 10_000.0, 10.0);
            for word_index in 0..50 {
                buffer.add(AudioChunk::new(vec![0.1; CHUNK_SAMPLES], SAMPLE_RATE, word_index, false));
            }
            black_box(buffer.rollback_to(black_box(25)))
        });
    });
}

fn bench_synthesizer(c: &mut Criterion) {
    let words: Vec<&str> = SENTENCE.split_whitespace().collect();
    let mut group = c.benchmark_group("incremental_synthesizer");
    group.throughput(Throughput::Elements(words.len() as u64));

    for (name, text) in [
        ("clean", words.clone()),
        ("with_correction", {
            let mut corrected = words.clone();
            corrected.insert(10, "actually");
            corrected
        }),
    ] {
        group.bench_function(name, |b| {
            b.iter(|| {
                let mut synth = IncrementalSynthesizer::new(
                    Arc::new(MockBackend::new()),
                    Arc::new(PlainTextCompiler::default()),
                    SynthesizerConfig::default(),
                )
                .unwrap();

                let mut chunks = 0;
                for word in &text {
                    chunks += synth.feed(word).len();
                }
                chunks += synth.finalize().len();
                black_box(chunks)
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_buffer_add, bench_buffer_rollback, bench_synthesizer);
criterion_main!(benches);
