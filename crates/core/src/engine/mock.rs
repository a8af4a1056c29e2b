//! Mock backend for tests and benchmarks
//!
//! Produces silence (or a 440 Hz tone) of an estimated duration: 150ms per
//! word plus explicit pauses plus event durations, divided by global speed.

use super::{SynthesisError, SynthesisResult, TtsBackend};
use crate::graph::ControlGraph;
use std::f32::consts::PI;

const SECONDS_PER_WORD: f64 = 0.15;
const TONE_HZ: f32 = 440.0;
const TONE_AMPLITUDE: f32 = 0.3;

#[derive(Debug, Clone)]
pub struct MockBackend {
    sample_rate: u32,
    silence: bool,
}

impl MockBackend {
    /// Silent mock at 24 kHz
    pub fn new() -> Self {
        Self {
            sample_rate: 24000,
            silence: true,
        }
    }

    /// Emit a sine tone instead of silence
    pub fn with_tone(mut self) -> Self {
        self.silence = false;
        self
    }

    pub fn with_sample_rate(mut self, sample_rate: u32) -> Self {
        self.sample_rate = sample_rate;
        self
    }

    /// Estimated output duration in seconds
    pub fn estimate_duration(graph: &ControlGraph) -> f64 {
        let words: usize = graph
            .tokens
            .iter()
            .map(|t| t.text.split_whitespace().count())
            .sum();
        let events: f64 = graph.events.iter().map(|e| e.duration).sum();

        (words as f64 * SECONDS_PER_WORD + graph.total_pause() + events) / graph.global_speed as f64
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl TtsBackend for MockBackend {
    fn name(&self) -> &str {
        "mock"
    }

    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn synthesize(&self, graph: &ControlGraph) -> SynthesisResult<Vec<f32>> {
        if graph.global_speed <= 0.0 {
            return Err(SynthesisError::Backend {
                backend: self.name().to_string(),
                message: format!("invalid global_speed {}", graph.global_speed),
            });
        }

        let num_samples = (Self::estimate_duration(graph) * self.sample_rate as f64) as usize;

        if self.silence {
            return Ok(vec![0.0; num_samples]);
        }

        let rate = self.sample_rate as f32;
        Ok((0..num_samples)
            .map(|i| TONE_AMPLITUDE * (2.0 * PI * TONE_HZ * i as f32 / rate).sin())
            .collect())
    }
}
