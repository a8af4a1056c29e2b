//! Incremental speculative streaming
//!
//! Word-by-word synthesis with a bounded rollback window:
//!
//! - [`IncrementalSynthesizer`]: orchestrates compile, synthesize, buffer
//! - [`StreamBuffer`]: pending chunks, auto-commit, rollback with crossfade
//! - [`CorrectionDetector`]: self-correction heuristics over incoming words
//! - [`SynthesisMetrics`]: per-session counters and latency histogram

pub mod buffer;
pub mod chunk;
pub mod correction;
pub mod metrics;
pub mod synthesizer;

pub use buffer::StreamBuffer;
pub use chunk::{AudioChunk, RollbackMarker, SpeculativeGraph};
pub use correction::{Correction, CorrectionDetector};
pub use metrics::SynthesisMetrics;
pub use synthesizer::{IncrementalSynthesizer, RollbackCallback, StreamStats, SynthesisState};
