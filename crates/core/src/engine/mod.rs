//! Synthesis collaborators
//!
//! The streaming core never tokenizes text or runs a model itself. It talks
//! to two injected collaborators:
//!
//! - [`Compiler`]: text (+ voice, emotion, speed) to [`ControlGraph`]
//! - [`TtsBackend`]: [`ControlGraph`] to mono f32 PCM in [-1, 1]
//!
//! Reference implementations ([`PlainTextCompiler`], [`MockBackend`]) are
//! enough to drive the whole pipeline in tests and benchmarks.

mod compiler;
mod mock;

pub use compiler::{EmotionProfile, PlainTextCompiler};
pub use mock::MockBackend;

use crate::graph::ControlGraph;

/// Result type for backend operations
pub type SynthesisResult<T> = std::result::Result<T, SynthesisError>;

/// Per-unit synthesis failures
///
/// The synthesizer skips the failing unit and keeps streaming.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SynthesisError {
    #[error("Backend '{backend}' failed: {message}")]
    Backend { backend: String, message: String },

    #[error("Unsupported voice: {0}")]
    UnsupportedVoice(String),

    #[error("Graph has no tokens")]
    EmptyGraph,

    #[error("Synthesis timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },
}

/// Everything a compiler needs to build a graph
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CompileRequest {
    pub text: String,
    pub voice: Option<String>,
    pub emotion: Option<String>,
    pub speed: Option<f32>,
}

impl CompileRequest {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            ..Default::default()
        }
    }

    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = Some(voice.into());
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = Some(speed);
        self
    }
}

/// Text to ControlGraph
///
/// Must be deterministic: identical requests yield identical graphs.
pub trait Compiler: Send + Sync {
    fn compile(&self, request: &CompileRequest) -> ControlGraph;
}

/// ControlGraph to PCM
///
/// Implementations wrap a model or a remote service. The sample rate must
/// stay fixed for the backend's lifetime; nothing downstream resamples.
pub trait TtsBackend: Send + Sync {
    /// Backend identifier for logs
    fn name(&self) -> &str;

    /// Output sample rate in Hz
    fn sample_rate(&self) -> u32;

    /// Synthesize one graph
    ///
    /// # Arguments
    /// * `graph` - Compiled unit (one word or the final remainder when streaming)
    ///
    /// # Returns
    /// * `Ok(Vec<f32>)` - Mono PCM at [`TtsBackend::sample_rate`]
    /// * `Err(SynthesisError)` - The unit is skipped by the caller
    fn synthesize(&self, graph: &ControlGraph) -> SynthesisResult<Vec<f32>>;
}
