//! Incremental speculative synthesizer
//!
//! Turns words arriving one at a time (typically from an LLM) into ordered
//! PCM chunks with bounded latency:
//!
//! ```text
//! feed(word) -> correction check -> compile -> SpeculativeGraph
//!            -> backend.synthesize -> ~50ms chunks -> StreamBuffer -> ready chunks
//! ```
//!
//! Words ending in clause or sentence punctuation are commit boundaries. A
//! detected self-correction rolls audio back to a word index and emits a
//! short fade so the cut is not audible.
//!
//! One instance is one session. Everything runs on the caller's thread; the
//! backend call is the only potentially slow step.

use super::buffer::StreamBuffer;
use super::chunk::{now_ms, AudioChunk, RollbackMarker, SpeculativeGraph};
use super::correction::{Correction, CorrectionDetector};
use super::metrics::SynthesisMetrics;
use crate::config::SynthesizerConfig;
use crate::engine::{CompileRequest, Compiler, SynthesisError, TtsBackend};
use crate::error::Result;
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;

/// Trailing characters that close a committed span
const COMMIT_PUNCTUATION: [char; 6] = ['.', '!', '?', ',', ';', ':'];

/// Called after each rollback with the last kept word index (`None` = none kept)
pub type RollbackCallback = Box<dyn FnMut(Option<usize>) + Send>;

/// Session lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SynthesisState {
    /// Nothing fed yet
    Idle,
    /// Last word was speculative
    Accumulating,
    /// Last word closed a committed span
    CommitBoundary,
    /// `finalize` released everything
    Flushed,
}

/// Snapshot of session statistics
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StreamStats {
    pub words_processed: usize,
    pub committed_text: String,
    pub pending_text: String,
    pub rollback_count: u64,
    pub first_audio_latency_ms: Option<f64>,
    pub buffer_duration_ms: f64,
    pub chunks_emitted: u64,
    pub synthesis_failures: u64,
    pub commit_count: u64,
    pub synthesis_p50_us: Option<u64>,
    pub synthesis_p99_us: Option<u64>,
}

/// Word-by-word streaming synthesizer with rollback
///
/// # Example
///
/// ```
/// use soundboard_core::config::SynthesizerConfig;
/// use soundboard_core::engine::{MockBackend, PlainTextCompiler};
/// use soundboard_core::streaming::IncrementalSynthesizer;
/// use std::sync::Arc;
///
/// let mut synth = IncrementalSynthesizer::new(
///     Arc::new(MockBackend::new()),
///     Arc::new(PlainTextCompiler::default()),
///     SynthesizerConfig::default(),
/// )
/// .unwrap();
///
/// let mut audio = Vec::new();
/// for word in ["Hello,", "how", "are", "you?"] {
///     audio.extend(synth.feed(word));
/// }
/// audio.extend(synth.finalize());
///
/// assert_eq!(synth.stats().words_processed, 4);
/// assert!(audio.iter().all(|chunk| chunk.is_committed));
/// ```
pub struct IncrementalSynthesizer {
    config: SynthesizerConfig,
    backend: Arc<dyn TtsBackend>,
    compiler: Arc<dyn Compiler>,

    buffer: StreamBuffer,
    detector: CorrectionDetector,
    state: SynthesisState,

    words: Vec<String>,
    pending_text: String,
    committed_text: String,
    /// Words covered by `committed_text`
    committed_words: usize,
    /// Words already handed to the backend
    synthesized_words: usize,
    /// Samples produced into the stream, net of rollbacks
    samples_produced: usize,

    markers: Vec<RollbackMarker>,
    graphs: Vec<SpeculativeGraph>,
    metrics: SynthesisMetrics,
    on_rollback: Option<RollbackCallback>,
}

impl IncrementalSynthesizer {
    pub fn new(
        backend: Arc<dyn TtsBackend>,
        compiler: Arc<dyn Compiler>,
        config: SynthesizerConfig,
    ) -> Result<Self> {
        config.validate()?;

        let buffer = StreamBuffer::new(
            backend.sample_rate(),
            config.max_buffer_ms(),
            config.crossfade_ms,
        );
        let detector = CorrectionDetector::new(config.correction_sensitivity);

        tracing::debug!(
            backend = backend.name(),
            sample_rate = backend.sample_rate(),
            voice = %config.voice,
            "incremental synthesizer created"
        );

        Ok(Self {
            config,
            backend,
            compiler,
            buffer,
            detector,
            state: SynthesisState::Idle,
            words: Vec::new(),
            pending_text: String::new(),
            committed_text: String::new(),
            committed_words: 0,
            synthesized_words: 0,
            samples_produced: 0,
            markers: Vec::new(),
            graphs: Vec::new(),
            metrics: SynthesisMetrics::new()?,
            on_rollback: None,
        })
    }

    /// Register a rollback callback
    pub fn on_rollback(mut self, callback: impl FnMut(Option<usize>) + Send + 'static) -> Self {
        self.on_rollback = Some(Box::new(callback));
        self
    }

    pub fn config(&self) -> &SynthesizerConfig {
        &self.config
    }

    pub fn sample_rate(&self) -> u32 {
        self.backend.sample_rate()
    }

    pub fn state(&self) -> SynthesisState {
        self.state
    }

    pub fn words(&self) -> &[String] {
        &self.words
    }

    pub fn rollback_markers(&self) -> &[RollbackMarker] {
        &self.markers
    }

    pub fn speculative_graphs(&self) -> &[SpeculativeGraph] {
        &self.graphs
    }

    pub fn metrics(&self) -> &SynthesisMetrics {
        &self.metrics
    }

    /// Feed the next word, returning chunks ready for playback
    ///
    /// A crossfade chunk from a rollback, if any, comes first. Blank input is
    /// ignored.
    pub fn feed(&mut self, word: &str) -> Vec<AudioChunk> {
        let word = word.trim();
        if word.is_empty() {
            return Vec::new();
        }

        self.metrics.mark_word();
        let mut ready = Vec::new();

        if self.config.enable_rollback {
            if let Some(correction) = self.detector.feed(word) {
                ready.extend(self.rollback(correction));
            }
        }

        self.words.push(word.to_string());
        let word_index = self.words.len() - 1;
        if !self.pending_text.is_empty() {
            self.pending_text.push(' ');
        }
        self.pending_text.push_str(word);

        let is_commit = word.ends_with(|c: char| COMMIT_PUNCTUATION.contains(&c));
        ready.extend(self.synthesize_pending(word_index, is_commit));

        if is_commit {
            self.commit_segment(word_index);
            self.state = SynthesisState::CommitBoundary;
        } else {
            self.state = SynthesisState::Accumulating;
        }

        self.metrics.mark_emitted(ready.len());
        ready
    }

    /// Release the whole buffer and commit the pending text
    ///
    /// Every fed word was already voiced speculatively by `feed`, so no
    /// backend call happens here.
    pub fn finalize(&mut self) -> Vec<AudioChunk> {
        let ready = self.buffer.commit_all();

        if !self.pending_text.is_empty() {
            self.detector.commit(&self.pending_text);
            self.append_committed();
        }
        self.state = SynthesisState::Flushed;

        self.metrics.mark_emitted(ready.len());
        tracing::debug!(
            chunks = ready.len(),
            words = self.words.len(),
            "stream finalized"
        );
        ready
    }

    /// Clear all session state for reuse
    pub fn reset(&mut self) {
        self.buffer.clear();
        self.detector.reset();
        self.state = SynthesisState::Idle;
        self.words.clear();
        self.pending_text.clear();
        self.committed_text.clear();
        self.committed_words = 0;
        self.synthesized_words = 0;
        self.samples_produced = 0;
        self.markers.clear();
        self.graphs.clear();
        self.metrics.reset();
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            words_processed: self.words.len(),
            committed_text: self.committed_text.clone(),
            pending_text: self.pending_text.clone(),
            rollback_count: self.metrics.rollback_count,
            first_audio_latency_ms: self.metrics.first_audio_latency_ms(),
            buffer_duration_ms: self.buffer.duration_ms(),
            chunks_emitted: self.metrics.chunks_emitted,
            synthesis_failures: self.metrics.synthesis_failures,
            commit_count: self.metrics.commit_count,
            synthesis_p50_us: self.metrics.synthesis_p50_us(),
            synthesis_p99_us: self.metrics.synthesis_p99_us(),
        }
    }

    fn chunk_size(&self) -> usize {
        let samples = self.backend.sample_rate() as f64 * self.config.chunk_ms / 1000.0;
        (samples as usize).max(1)
    }

    /// Compile and synthesize the words not yet sent to the backend
    fn synthesize_pending(&mut self, word_index: usize, is_commit: bool) -> Vec<AudioChunk> {
        if self.synthesized_words >= self.words.len() {
            return Vec::new();
        }

        let text = self.words[self.synthesized_words..].join(" ");
        self.synthesized_words = self.words.len();

        let request = CompileRequest {
            text,
            voice: Some(self.config.voice.clone()),
            emotion: self.config.emotion.clone(),
            speed: Some(self.config.speed),
        };
        let graph = self.compiler.compile(&request);
        if graph.tokens.is_empty() {
            tracing::debug!(word_index, "nothing to synthesize");
            return Vec::new();
        }

        let speculative = SpeculativeGraph::new(graph, word_index, is_commit);
        let started = Instant::now();
        let result = self.backend.synthesize(&speculative.graph);
        self.graphs.push(speculative);

        match result {
            Ok(pcm) => {
                self.metrics.record_synthesis(started.elapsed());
                tracing::debug!(word_index, samples = pcm.len(), is_commit, "synthesized unit");
                self.enqueue(pcm, word_index, is_commit)
            }
            Err(SynthesisError::Timeout { timeout_ms }) => {
                self.metrics.record_failure();
                tracing::warn!(
                    backend = self.backend.name(),
                    word_index,
                    "Synthesis timed out after {}ms, skipping unit",
                    timeout_ms
                );
                Vec::new()
            }
            Err(e) => {
                self.metrics.record_failure();
                tracing::warn!(
                    backend = self.backend.name(),
                    word_index,
                    "Synthesis failed, skipping unit: {}",
                    e
                );
                Vec::new()
            }
        }
    }

    /// Slice PCM into chunks and push them through the buffer
    fn enqueue(&mut self, pcm: Vec<f32>, word_index: usize, is_commit: bool) -> Vec<AudioChunk> {
        let sample_rate = self.backend.sample_rate();
        let chunk_size = self.chunk_size();
        let mut ready = Vec::new();

        for piece in pcm.chunks(chunk_size) {
            self.samples_produced += piece.len();
            let chunk = AudioChunk::new(piece.to_vec(), sample_rate, word_index, is_commit);
            ready.extend(self.buffer.add(chunk));
        }

        ready
    }

    fn append_committed(&mut self) {
        if !self.committed_text.is_empty() {
            self.committed_text.push(' ');
        }
        self.committed_text.push_str(&self.pending_text);
        self.pending_text.clear();
        self.committed_words = self.words.len();
    }

    fn commit_segment(&mut self, word_index: usize) {
        self.detector.commit(&self.pending_text);
        self.append_committed();

        self.markers.push(RollbackMarker {
            word_index,
            sample_offset: self.samples_produced,
            text_so_far: self.committed_text.clone(),
            timestamp_ms: now_ms(),
        });
        self.metrics.commit_count += 1;
    }

    /// Undo speculative words after a detected correction
    fn rollback(&mut self, correction: Correction) -> Vec<AudioChunk> {
        self.metrics.rollback_count += 1;

        let target = match correction {
            Correction::ToWord(index) => Some(index),
            Correction::ToLastCommit => self.markers.last().map(|m| m.word_index),
        };

        let before = self.buffer.pending_samples();
        let fade = match target {
            Some(index) => self.buffer.rollback_to(index),
            None => self.buffer.rollback_all(),
        };
        let discarded = before - self.buffer.pending_samples();
        self.samples_produced = self.samples_produced.saturating_sub(discarded);

        let kept = target
            .map_or(0, |index| index + 1)
            .max(self.committed_words)
            .min(self.words.len());

        self.words.truncate(kept);
        self.graphs.retain(|g| g.word_index < kept);
        self.markers.retain(|m| m.word_index < kept);
        self.synthesized_words = self.synthesized_words.min(kept);
        self.pending_text = self.words[self.committed_words..].join(" ");
        self.detector.rollback(kept);

        tracing::info!(
            ?target,
            kept_words = kept,
            discarded_samples = discarded,
            rollbacks = self.metrics.rollback_count,
            "rolled back speculative audio"
        );

        if let Some(callback) = self.on_rollback.as_mut() {
            callback(target);
        }

        match fade {
            Some(samples) if !samples.is_empty() => vec![AudioChunk::new(
                samples,
                self.backend.sample_rate(),
                target.unwrap_or(0),
                true,
            )],
            _ => Vec::new(),
        }
    }
}

impl fmt::Debug for IncrementalSynthesizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IncrementalSynthesizer")
            .field("backend", &self.backend.name())
            .field("state", &self.state)
            .field("words", &self.words.len())
            .field("buffered_chunks", &self.buffer.len())
            .field("markers", &self.markers.len())
            .finish()
    }
}
