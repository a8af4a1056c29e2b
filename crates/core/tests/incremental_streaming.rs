//! Incremental synthesizer sessions driven word by word
//!
//! Uses the mock backend so sample counts are predictable and no model is
//! needed.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use soundboard_core::config::SynthesizerConfig;
use soundboard_core::engine::{
    Compiler, MockBackend, PlainTextCompiler, SynthesisError, SynthesisResult, TtsBackend,
};
use soundboard_core::graph::ControlGraph;
use soundboard_core::streaming::{AudioChunk, IncrementalSynthesizer, SynthesisState};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

fn synthesizer(config: SynthesizerConfig) -> IncrementalSynthesizer {
    IncrementalSynthesizer::new(
        Arc::new(MockBackend::new().with_tone()),
        Arc::new(PlainTextCompiler::default()),
        config,
    )
    .unwrap()
}

fn samples(chunks: &[AudioChunk]) -> usize {
    chunks.iter().map(|c| c.len()).sum()
}

/// Always times out
struct StalledBackend;

impl TtsBackend for StalledBackend {
    fn name(&self) -> &str {
        "stalled"
    }

    fn sample_rate(&self) -> u32 {
        24000
    }

    fn synthesize(&self, _graph: &ControlGraph) -> SynthesisResult<Vec<f32>> {
        Err(SynthesisError::Timeout { timeout_ms: 500 })
    }
}

#[test]
fn test_hello_how_are_you() {
    let mut synth = synthesizer(SynthesizerConfig::default());
    let mut chunks = Vec::new();

    for word in ["Hello,", "how", "are"] {
        chunks.extend(synth.feed(word));
    }
    assert_eq!(synth.state(), SynthesisState::Accumulating);
    assert_eq!(synth.stats().pending_text, "how are");

    chunks.extend(synth.feed("you?"));
    assert_eq!(synth.state(), SynthesisState::CommitBoundary);
    assert_eq!(synth.rollback_markers().last().map(|m| m.word_index), Some(3));

    chunks.extend(synth.finalize());
    let stats = synth.stats();
    assert_eq!(stats.words_processed, 4);
    assert_eq!(stats.committed_text, "Hello, how are you?");
    assert_eq!(stats.pending_text, "");
    assert_eq!(stats.commit_count, 2);
    assert_eq!(stats.rollback_count, 0);
    assert_eq!(stats.buffer_duration_ms, 0.0);
    assert!(stats.first_audio_latency_ms.is_some());
    assert_eq!(stats.chunks_emitted, chunks.len() as u64);
    assert!(chunks.iter().all(|c| c.is_committed));
}

#[test]
fn test_first_audio_arrives_before_finalize() {
    let mut synth = synthesizer(SynthesizerConfig::default());
    // 300ms of audio exceeds the 200ms stream budget immediately
    let early = synth.feed("Hello,");
    assert!(!early.is_empty());
    assert_eq!(early[0].word_index, 0);
}

#[test]
fn test_no_rollback_emits_every_synthesized_sample() {
    let backend = MockBackend::new().with_tone();
    let mut synth = synthesizer(SynthesizerConfig::default());

    let mut chunks = Vec::new();
    for word in "The quick brown fox, jumps over the lazy dog.".split_whitespace() {
        chunks.extend(synth.feed(word));
    }
    chunks.extend(synth.finalize());

    let expected: usize = synth
        .speculative_graphs()
        .iter()
        .map(|g| backend.synthesize(&g.graph).unwrap().len())
        .sum();
    assert_eq!(samples(&chunks), expected);
    assert!(chunks.windows(2).all(|w| w[0].word_index <= w[1].word_index));
}

#[test]
fn test_speed_scales_output() {
    let mut normal = synthesizer(SynthesizerConfig::default());
    let mut fast = synthesizer(SynthesizerConfig::default().with_speed(2.0));

    let mut a = normal.feed("word");
    a.extend(normal.finalize());
    let mut b = fast.feed("word");
    b.extend(fast.finalize());

    assert!(samples(&a).abs_diff(3600) <= 1);
    assert!(samples(&b).abs_diff(1800) <= 1);
}

#[test]
fn test_explicit_correction_rolls_back_within_the_same_feed() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let mut synth = synthesizer(SynthesizerConfig::default().with_buffer_ms(2000.0))
        .on_rollback(move |target| sink.lock().unwrap().push(target));

    synth.feed("Meet");
    synth.feed("at");
    synth.feed("noon.");
    synth.feed("On");
    synth.feed("Tuesday");
    let chunks = synth.feed("sorry");

    // fade first, then nothing else: "sorry" stays pending in the buffer
    assert_eq!(chunks.len(), 1);
    assert!(chunks[0].is_committed);
    assert_eq!(chunks[0].word_index, 2);
    assert_eq!(chunks[0].len(), 240);

    assert_eq!(*seen.lock().unwrap(), vec![Some(2)]);
    assert_eq!(synth.words(), &["Meet", "at", "noon.", "sorry"]);
    assert_eq!(synth.stats().committed_text, "Meet at noon.");
    assert_eq!(synth.stats().rollback_count, 1);

    let rest = synth.finalize();
    assert!(rest.iter().all(|c| c.word_index <= 3));
    assert!(rest.iter().all(|c| c.word_index != 4));
}

#[test]
fn test_repetition_rolls_back_to_before_first_occurrence() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let config = SynthesizerConfig::default()
        .with_buffer_ms(2000.0)
        .with_correction_sensitivity(0.8);
    let mut synth = synthesizer(config).on_rollback(move |target| sink.lock().unwrap().push(target));

    for word in ["I", "want", "the"] {
        assert!(synth.feed(word).is_empty());
    }
    let chunks = synth.feed("the");

    assert_eq!(*seen.lock().unwrap(), vec![Some(1)]);
    assert_eq!(chunks.len(), 1);
    assert_eq!(chunks[0].word_index, 1);
    assert_eq!(synth.words(), &["I", "want", "the"]);
    assert_eq!(synth.stats().pending_text, "I want the");
}

#[test]
fn test_deliberate_doubling_is_kept() {
    let config = SynthesizerConfig::default()
        .with_buffer_ms(2000.0)
        .with_correction_sensitivity(0.8);
    let mut synth = synthesizer(config);

    for word in ["very", "very", "good."] {
        synth.feed(word);
    }
    synth.finalize();

    let stats = synth.stats();
    assert_eq!(stats.rollback_count, 0);
    assert_eq!(synth.words(), &["very", "very", "good."]);
    assert_eq!(stats.committed_text, "very very good.");
}

#[test]
fn test_rollback_never_touches_released_audio() {
    let mut synth = synthesizer(SynthesizerConfig::default().with_buffer_ms(50.0));

    let mut released = Vec::new();
    for word in ["one", "two", "three", "four"] {
        released.extend(synth.feed(word));
    }
    assert!(!released.is_empty());
    let released_words: Vec<usize> = released.iter().map(|c| c.word_index).collect();

    let after = synth.feed("actually");
    assert!(after.iter().all(|c| c.is_committed));
    assert_eq!(synth.words(), &["actually"]);
    assert!(synth.stats().buffer_duration_ms <= 100.0);

    // whatever was released before the correction is still in the output
    let mut all = released;
    all.extend(after);
    all.extend(synth.finalize());
    let prefix: Vec<usize> = all.iter().take(released_words.len()).map(|c| c.word_index).collect();
    assert_eq!(prefix, released_words);
}

#[test]
fn test_fade_starts_at_last_released_level() {
    let mut synth = synthesizer(SynthesizerConfig::default().with_buffer_ms(50.0));

    let mut released = Vec::new();
    for word in ["one", "two", "three"] {
        released.extend(synth.feed(word));
    }
    let last_level = released.last().and_then(|c| c.samples.last().copied()).unwrap();

    let fade = synth.feed("wait");
    assert_eq!(fade[0].samples[0], last_level);
    assert_eq!(*fade[0].samples.last().unwrap(), 0.0);
}

#[test]
fn test_backend_timeouts_skip_units() {
    let mut synth = IncrementalSynthesizer::new(
        Arc::new(StalledBackend),
        Arc::new(PlainTextCompiler::default()),
        SynthesizerConfig::default(),
    )
    .unwrap();

    let mut chunks = Vec::new();
    for word in ["still", "talking."] {
        chunks.extend(synth.feed(word));
    }
    chunks.extend(synth.finalize());

    let stats = synth.stats();
    assert!(chunks.is_empty());
    assert_eq!(stats.synthesis_failures, 2);
    assert_eq!(stats.words_processed, 2);
    assert_eq!(stats.committed_text, "still talking.");
    assert!(stats.first_audio_latency_ms.is_none());
    assert_eq!(synth.state(), SynthesisState::Flushed);
}

#[test]
fn test_custom_compiler_receives_session_settings() {
    struct Recording {
        calls: AtomicUsize,
        inner: PlainTextCompiler,
    }

    impl Compiler for Recording {
        fn compile(&self, request: &soundboard_core::engine::CompileRequest) -> ControlGraph {
            self.calls.fetch_add(1, Ordering::SeqCst);
            assert_eq!(request.voice.as_deref(), Some("am_michael"));
            assert_eq!(request.emotion.as_deref(), Some("calm"));
            self.inner.compile(request)
        }
    }

    let compiler = Arc::new(Recording {
        calls: AtomicUsize::new(0),
        inner: PlainTextCompiler::default(),
    });
    let mut synth = IncrementalSynthesizer::new(
        Arc::new(MockBackend::new()),
        compiler.clone(),
        SynthesizerConfig::default()
            .with_voice("am_michael")
            .with_emotion("calm"),
    )
    .unwrap();

    synth.feed("easy");
    synth.feed("now.");
    synth.finalize();
    assert_eq!(compiler.calls.load(Ordering::SeqCst), 2);
}

#[test]
fn test_reset_allows_a_fresh_session() {
    let mut synth = synthesizer(SynthesizerConfig::default());
    synth.feed("first");
    synth.feed("session.");
    synth.finalize();

    synth.reset();
    assert_eq!(synth.state(), SynthesisState::Idle);

    synth.feed("second");
    let stats = synth.stats();
    assert_eq!(stats.words_processed, 1);
    assert_eq!(stats.pending_text, "second");
    assert_eq!(stats.committed_text, "");
    assert_eq!(stats.commit_count, 0);
}

#[test]
fn test_stats_serialize() {
    let mut synth = synthesizer(SynthesizerConfig::default());
    synth.feed("Hi.");
    let json = serde_json::to_value(synth.stats()).unwrap();
    assert_eq!(json["words_processed"], 1);
    assert_eq!(json["committed_text"], "Hi.");

    let exported = synth.metrics().to_prometheus("test");
    assert!(exported.contains("stream_commits_total{session=\"test\"} 1"));
}

#[test]
fn prop_random_sessions_keep_invariants() {
    const VOCAB: [&str; 12] = [
        "the", "cat", "sat", "on", "a", "mat,", "then", "left.", "actually", "wait", "so", "well",
    ];

    let mut rng = StdRng::seed_from_u64(0xdead_beef);
    for case in 0..100 {
        let rollbacks = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&rollbacks);

        let config = SynthesizerConfig::default()
            .with_buffer_ms(rng.gen_range(20.0..300.0))
            .with_chunk_ms(rng.gen_range(5.0..80.0))
            .with_correction_sensitivity(rng.gen_range(0.0..=1.0));
        let max_ms = config.max_buffer_ms();
        let mut synth = synthesizer(config).on_rollback(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
        });

        let mut chunks = Vec::new();
        for _ in 0..rng.gen_range(1..30) {
            chunks.extend(synth.feed(VOCAB[rng.gen_range(0..VOCAB.len())]));
            let stats = synth.stats();
            assert!(stats.buffer_duration_ms <= max_ms + 1e-6, "case {}", case);
            assert_eq!(stats.words_processed, synth.words().len());
        }
        chunks.extend(synth.finalize());

        let stats = synth.stats();
        assert!(chunks.iter().all(|c| c.is_committed), "case {}", case);
        assert!(chunks.iter().all(|c| c.sample_rate == 24000));
        assert_eq!(stats.rollback_count as usize, rollbacks.load(Ordering::SeqCst));
        assert_eq!(stats.pending_text, "");
        assert_eq!(stats.buffer_duration_ms, 0.0);
        assert_eq!(stats.chunks_emitted, chunks.len() as u64);
    }
}
