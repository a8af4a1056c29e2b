//! Stream buffer with auto-commit and rollback
//!
//! Holds chunks that may still be rolled back. The capacity is a latency
//! budget, not a memory cap: once pending audio exceeds `max_buffer_ms`, the
//! oldest chunks are committed and released until it fits again.
//!
//! Chunk lifecycle: Pending (rollback-eligible) -> Committed (terminal).

use super::chunk::AudioChunk;
use std::collections::VecDeque;

#[derive(Debug, Clone)]
pub struct StreamBuffer {
    sample_rate: u32,
    max_buffer_ms: f64,
    crossfade_samples: usize,
    chunks: VecDeque<AudioChunk>,
    total_samples: usize,
    /// Last sample handed to the caller, start level of a rollback fade
    last_released: f32,
}

impl StreamBuffer {
    pub fn new(sample_rate: u32, max_buffer_ms: f64, crossfade_ms: f64) -> Self {
        Self {
            sample_rate,
            max_buffer_ms,
            crossfade_samples: (sample_rate as f64 * crossfade_ms / 1000.0) as usize,
            chunks: VecDeque::new(),
            total_samples: 0,
            last_released: 0.0,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn max_samples(&self) -> usize {
        (self.sample_rate as f64 * self.max_buffer_ms / 1000.0) as usize
    }

    fn release(&mut self, mut chunk: AudioChunk) -> AudioChunk {
        chunk.is_committed = true;
        self.total_samples -= chunk.samples.len();
        if let Some(&last) = chunk.samples.last() {
            self.last_released = last;
        }
        chunk
    }

    /// Append a chunk, returning whatever had to be committed to stay
    /// within budget (oldest first)
    pub fn add(&mut self, chunk: AudioChunk) -> Vec<AudioChunk> {
        self.total_samples += chunk.samples.len();
        self.chunks.push_back(chunk);

        let max_samples = self.max_samples();
        let mut ready = Vec::new();
        while self.total_samples > max_samples {
            let Some(oldest) = self.chunks.pop_front() else {
                break;
            };
            ready.push(self.release(oldest));
        }
        ready
    }

    /// Commit and release everything, oldest first
    pub fn commit_all(&mut self) -> Vec<AudioChunk> {
        let mut ready = Vec::with_capacity(self.chunks.len());
        while let Some(chunk) = self.chunks.pop_front() {
            ready.push(self.release(chunk));
        }
        self.total_samples = 0;
        ready
    }

    /// Discard trailing chunks newer than `word_index`
    ///
    /// Stops at the first committed chunk. Returns a fade-to-silence buffer
    /// when anything was discarded, `None` otherwise.
    pub fn rollback_to(&mut self, word_index: usize) -> Option<Vec<f32>> {
        self.rollback_while(|chunk| chunk.word_index > word_index)
    }

    /// Discard every uncommitted trailing chunk
    pub fn rollback_all(&mut self) -> Option<Vec<f32>> {
        self.rollback_while(|_| true)
    }

    fn rollback_while(&mut self, discard: impl Fn(&AudioChunk) -> bool) -> Option<Vec<f32>> {
        let mut discarded = 0usize;
        while let Some(back) = self.chunks.back() {
            if back.is_committed || !discard(back) {
                break;
            }
            if let Some(chunk) = self.chunks.pop_back() {
                self.total_samples -= chunk.samples.len();
                discarded += 1;
            }
        }

        if discarded == 0 {
            return None;
        }

        tracing::debug!(discarded, remaining = self.chunks.len(), "stream buffer rollback");
        Some(self.crossfade_out())
    }

    /// Linear ramp from the last released level down to silence
    fn crossfade_out(&self) -> Vec<f32> {
        let n = self.crossfade_samples;
        match n {
            0 => Vec::new(),
            1 => vec![0.0],
            _ => (0..n)
                .map(|i| self.last_released * (1.0 - i as f32 / (n - 1) as f32))
                .collect(),
        }
    }

    /// Pending audio duration
    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.total_samples as f64 / self.sample_rate as f64 * 1000.0
    }

    pub fn pending_samples(&self) -> usize {
        self.total_samples
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    /// Drop everything without releasing it
    pub fn clear(&mut self) {
        self.chunks.clear();
        self.total_samples = 0;
        self.last_released = 0.0;
    }
}
