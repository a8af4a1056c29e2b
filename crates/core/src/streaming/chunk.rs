//! Streaming data types: audio chunks, rollback markers, speculative graphs

use crate::graph::ControlGraph;
use serde::{Deserialize, Serialize};
use std::time::{Instant, SystemTime, UNIX_EPOCH};

/// Wall-clock milliseconds since the Unix epoch (0 if the clock is before it)
pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// PCM chunk with rollback metadata
///
/// Owned by the stream buffer until released, then by the caller.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioChunk {
    /// Mono f32 PCM
    pub samples: Vec<f32>,

    pub sample_rate: u32,

    /// Committed chunks can no longer be rolled back
    pub is_committed: bool,

    /// Index of the word that produced this chunk
    pub word_index: usize,

    /// Creation time (ms since Unix epoch)
    pub timestamp_ms: u64,
}

impl AudioChunk {
    pub fn new(samples: Vec<f32>, sample_rate: u32, word_index: usize, is_committed: bool) -> Self {
        Self {
            samples,
            sample_rate,
            is_committed,
            word_index,
            timestamp_ms: now_ms(),
        }
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn duration_ms(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.samples.len() as f64 / self.sample_rate as f64 * 1000.0
    }
}

/// Checkpoint placed at every commit boundary
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RollbackMarker {
    /// Index of the word that closed the committed span
    pub word_index: usize,

    /// Samples produced into the stream up to this point
    pub sample_offset: usize,

    /// All committed text so far
    pub text_so_far: String,

    pub timestamp_ms: u64,
}

/// A compiled unit that may still be rolled back
#[derive(Debug, Clone)]
pub struct SpeculativeGraph {
    pub graph: ControlGraph,
    pub word_index: usize,
    pub is_committed: bool,
    pub created_at: Instant,
}

impl SpeculativeGraph {
    pub fn new(graph: ControlGraph, word_index: usize, is_committed: bool) -> Self {
        Self {
            graph,
            word_index,
            is_committed,
            created_at: Instant::now(),
        }
    }

    /// Committed copy of this graph
    pub fn commit(self) -> Self {
        Self {
            is_committed: true,
            ..self
        }
    }

    pub fn can_rollback(&self) -> bool {
        !self.is_committed
    }
}
