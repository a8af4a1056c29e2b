//! Streaming session metrics
//!
//! Backend latency is tracked in an HDR histogram (1μs to 60s, 3 significant
//! figures) so P50/P99 stay accurate across thousands of short units.

use crate::error::{Error, Result};
use hdrhistogram::Histogram;
use std::time::{Duration, Instant};

/// Largest trackable synthesis latency (microseconds)
const MAX_LATENCY_US: u64 = 60_000_000;

/// Counters and latency tracking for one synthesis session
#[derive(Debug, Clone)]
pub struct SynthesisMetrics {
    synthesis_latency: Histogram<u64>,
    pub units_synthesized: u64,
    pub synthesis_failures: u64,
    pub chunks_emitted: u64,
    pub rollback_count: u64,
    pub commit_count: u64,
    first_word_at: Option<Instant>,
    first_audio_at: Option<Instant>,
}

impl SynthesisMetrics {
    pub fn new() -> Result<Self> {
        let synthesis_latency = Histogram::<u64>::new_with_max(MAX_LATENCY_US, 3)
            .map_err(|e| Error::ConfigError(format!("Failed to create latency histogram: {}", e)))?;

        Ok(Self {
            synthesis_latency,
            units_synthesized: 0,
            synthesis_failures: 0,
            chunks_emitted: 0,
            rollback_count: 0,
            commit_count: 0,
            first_word_at: None,
            first_audio_at: None,
        })
    }

    /// Record one backend call
    pub fn record_synthesis(&mut self, elapsed: Duration) {
        let micros = (elapsed.as_micros() as u64).clamp(1, MAX_LATENCY_US);
        self.synthesis_latency.saturating_record(micros);
        self.units_synthesized += 1;
    }

    pub fn record_failure(&mut self) {
        self.synthesis_failures += 1;
    }

    /// Note a fed word; only the first one starts the latency clock
    pub fn mark_word(&mut self) {
        if self.first_word_at.is_none() {
            self.first_word_at = Some(Instant::now());
        }
    }

    /// Note chunks handed to the caller
    pub fn mark_emitted(&mut self, chunks: usize) {
        if chunks == 0 {
            return;
        }
        if self.first_audio_at.is_none() {
            self.first_audio_at = Some(Instant::now());
        }
        self.chunks_emitted += chunks as u64;
    }

    /// Time from first word to first emitted chunk
    pub fn first_audio_latency_ms(&self) -> Option<f64> {
        let word = self.first_word_at?;
        let audio = self.first_audio_at?;
        Some(audio.saturating_duration_since(word).as_secs_f64() * 1000.0)
    }

    /// Synthesis latency at a quantile (0.0-1.0), microseconds
    pub fn synthesis_percentile_us(&self, quantile: f64) -> Option<u64> {
        if self.synthesis_latency.is_empty() {
            return None;
        }
        Some(self.synthesis_latency.value_at_quantile(quantile))
    }

    pub fn synthesis_p50_us(&self) -> Option<u64> {
        self.synthesis_percentile_us(0.50)
    }

    pub fn synthesis_p99_us(&self) -> Option<u64> {
        self.synthesis_percentile_us(0.99)
    }

    pub fn reset(&mut self) {
        self.synthesis_latency.reset();
        self.units_synthesized = 0;
        self.synthesis_failures = 0;
        self.chunks_emitted = 0;
        self.rollback_count = 0;
        self.commit_count = 0;
        self.first_word_at = None;
        self.first_audio_at = None;
    }

    /// Export in Prometheus text format
    pub fn to_prometheus(&self, session: &str) -> String {
        let mut output = String::new();

        for (quantile, value) in [("0.5", self.synthesis_p50_us()), ("0.99", self.synthesis_p99_us())] {
            if let Some(value) = value {
                output.push_str(&format!(
                    "synthesis_latency_us{{session=\"{}\",quantile=\"{}\"}} {}\n",
                    session, quantile, value
                ));
            }
        }

        for (name, value) in [
            ("synthesis_units_total", self.units_synthesized),
            ("synthesis_failures_total", self.synthesis_failures),
            ("stream_chunks_emitted_total", self.chunks_emitted),
            ("stream_rollbacks_total", self.rollback_count),
            ("stream_commits_total", self.commit_count),
        ] {
            output.push_str(&format!("{}{{session=\"{}\"}} {}\n", name, session, value));
        }

        output
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_percentiles() {
        let mut metrics = SynthesisMetrics::new().unwrap();
        assert!(metrics.synthesis_p50_us().is_none());

        for ms in 1..=100u64 {
            metrics.record_synthesis(Duration::from_millis(ms));
        }

        let p50 = metrics.synthesis_p50_us().unwrap();
        let p99 = metrics.synthesis_p99_us().unwrap();
        assert!((49_000..=51_000).contains(&p50), "p50 = {}", p50);
        assert!((98_000..=100_100).contains(&p99), "p99 = {}", p99);
        assert_eq!(metrics.units_synthesized, 100);
    }

    #[test]
    fn test_latency_requires_word_and_audio() {
        let mut metrics = SynthesisMetrics::new().unwrap();
        metrics.mark_emitted(0);
        assert!(metrics.first_audio_latency_ms().is_none());

        metrics.mark_word();
        assert!(metrics.first_audio_latency_ms().is_none());

        metrics.mark_emitted(2);
        assert!(metrics.first_audio_latency_ms().unwrap() >= 0.0);
        assert_eq!(metrics.chunks_emitted, 2);
    }

    #[test]
    fn test_reset_and_export() {
        let mut metrics = SynthesisMetrics::new().unwrap();
        metrics.record_synthesis(Duration::from_micros(250));
        metrics.record_failure();
        metrics.rollback_count = 2;

        let text = metrics.to_prometheus("s1");
        assert!(text.contains("synthesis_failures_total{session=\"s1\"} 1"));
        assert!(text.contains("stream_rollbacks_total{session=\"s1\"} 2"));

        metrics.reset();
        assert_eq!(metrics.synthesis_failures, 0);
        assert!(metrics.synthesis_p99_us().is_none());
    }
}
