//! Ducking - gain envelopes for speech that follows an event
//!
//! Ducking gives the impression of an event mixing into speech without any
//! audio overlap: the event plays at full level, then the next speech segment
//! starts at a reduced gain and ramps back to 1.0. Only amplitude changes;
//! sample counts and timeline positions never do.
//!
//! ```
//! use soundboard_core::ducking::{DuckingEnvelope, DuckingProcessor};
//!
//! let mut processor = DuckingProcessor::new(24000);
//! processor.set_ducking(Some(DuckingEnvelope::new(0.5, 50.0, 0.0).unwrap()));
//!
//! let ducked = processor.process_speech(vec![1.0; 4]);
//! assert_eq!(ducked, vec![0.5; 4]);
//!
//! // Single-shot: the next call is untouched
//! assert_eq!(processor.process_speech(vec![1.0; 4]), vec![1.0; 4]);
//! ```

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};

/// Gain envelope applied to speech following an event
///
/// `fade_out_ms` is validated and carried but not applied to speech: the
/// event's own recorded tail provides the fade-out.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "EnvelopeFields", into = "EnvelopeFields")]
pub struct DuckingEnvelope {
    gain: f32,
    fade_out_ms: f64,
    fade_in_ms: f64,
}

/// Barely noticeable volume reduction
pub const SUBTLE: DuckingEnvelope = DuckingEnvelope {
    gain: 0.8,
    fade_out_ms: 30.0,
    fade_in_ms: 100.0,
};

/// Noticeable but not dramatic
pub const STANDARD: DuckingEnvelope = DuckingEnvelope {
    gain: 0.5,
    fade_out_ms: 50.0,
    fade_in_ms: 150.0,
};

/// Strong volume reduction
pub const DRAMATIC: DuckingEnvelope = DuckingEnvelope {
    gain: 0.3,
    fade_out_ms: 75.0,
    fade_in_ms: 250.0,
};

/// Smooth podcast-style ducking
pub const PODCAST: DuckingEnvelope = DuckingEnvelope {
    gain: 0.6,
    fade_out_ms: 40.0,
    fade_in_ms: 200.0,
};

impl DuckingEnvelope {
    /// Create an envelope, rejecting out-of-range values immediately
    pub fn new(gain: f32, fade_out_ms: f64, fade_in_ms: f64) -> Result<Self> {
        if !(0.0..=1.0).contains(&gain) {
            return Err(Error::ConfigError(format!(
                "gain must be 0.0-1.0, got {}",
                gain
            )));
        }
        if !(fade_out_ms >= 0.0 && fade_out_ms.is_finite()) {
            return Err(Error::ConfigError(format!(
                "fade_out_ms must be >= 0, got {}",
                fade_out_ms
            )));
        }
        if !(fade_in_ms >= 0.0 && fade_in_ms.is_finite()) {
            return Err(Error::ConfigError(format!(
                "fade_in_ms must be >= 0, got {}",
                fade_in_ms
            )));
        }

        Ok(Self {
            gain,
            fade_out_ms,
            fade_in_ms,
        })
    }

    /// Target gain level (0.0-1.0)
    pub fn gain(&self) -> f32 {
        self.gain
    }

    pub fn fade_out_ms(&self) -> f64 {
        self.fade_out_ms
    }

    /// Time to ramp from `gain` back to 1.0
    pub fn fade_in_ms(&self) -> f64 {
        self.fade_in_ms
    }

    /// Fade-in length in samples at the given rate
    pub fn fade_in_samples(&self, sample_rate: u32) -> usize {
        (self.fade_in_ms * sample_rate as f64 / 1000.0) as usize
    }
}

impl Default for DuckingEnvelope {
    fn default() -> Self {
        STANDARD
    }
}

#[derive(Serialize, Deserialize)]
struct EnvelopeFields {
    #[serde(default = "default_gain")]
    gain: f32,
    #[serde(default = "default_fade_out")]
    fade_out_ms: f64,
    #[serde(default = "default_fade_in")]
    fade_in_ms: f64,
}

fn default_gain() -> f32 {
    STANDARD.gain
}

fn default_fade_out() -> f64 {
    STANDARD.fade_out_ms
}

fn default_fade_in() -> f64 {
    STANDARD.fade_in_ms
}

impl TryFrom<EnvelopeFields> for DuckingEnvelope {
    type Error = Error;

    fn try_from(fields: EnvelopeFields) -> Result<Self> {
        DuckingEnvelope::new(fields.gain, fields.fade_out_ms, fields.fade_in_ms)
    }
}

impl From<DuckingEnvelope> for EnvelopeFields {
    fn from(envelope: DuckingEnvelope) -> Self {
        Self {
            gain: envelope.gain,
            fade_out_ms: envelope.fade_out_ms,
            fade_in_ms: envelope.fade_in_ms,
        }
    }
}

/// Apply a gain envelope to PCM audio
///
/// Starts at `gain` and ramps linearly (inclusive endpoints) to 1.0 over
/// `fade_in_samples`, clamped to the buffer length; later samples are left
/// alone. With no fade the whole buffer gets constant `gain`.
pub fn apply_gain_envelope(mut pcm: Vec<f32>, gain: f32, fade_in_samples: usize) -> Vec<f32> {
    if gain >= 1.0 || pcm.is_empty() {
        return pcm;
    }

    if fade_in_samples == 0 {
        return apply_constant_gain(pcm, gain);
    }

    let fade_len = fade_in_samples.min(pcm.len());
    if fade_len == 1 {
        pcm[0] *= gain;
        return pcm;
    }

    let step = (1.0 - gain) / (fade_len - 1) as f32;
    for (i, sample) in pcm.iter_mut().take(fade_len).enumerate() {
        *sample *= gain + step * i as f32;
    }

    pcm
}

/// Apply constant gain to PCM audio
pub fn apply_constant_gain(mut pcm: Vec<f32>, gain: f32) -> Vec<f32> {
    if gain >= 1.0 || pcm.is_empty() {
        return pcm;
    }

    for sample in pcm.iter_mut() {
        *sample *= gain;
    }

    pcm
}

/// Stateful single-shot ducking
///
/// `set_ducking` arms an envelope; the next `process_speech` consumes it.
#[derive(Debug, Clone)]
pub struct DuckingProcessor {
    sample_rate: u32,
    current: Option<DuckingEnvelope>,
}

impl DuckingProcessor {
    pub fn new(sample_rate: u32) -> Self {
        Self {
            sample_rate,
            current: None,
        }
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// True while an envelope is armed
    pub fn is_ducking(&self) -> bool {
        self.current.is_some()
    }

    /// Arm (or disarm, with `None`) the envelope for the next speech segment
    pub fn set_ducking(&mut self, envelope: Option<DuckingEnvelope>) {
        self.current = envelope;
    }

    pub fn clear_ducking(&mut self) {
        self.current = None;
    }

    /// Shape speech with the armed envelope, then disarm
    ///
    /// Returns the input unchanged when nothing is armed.
    pub fn process_speech(&mut self, pcm: Vec<f32>) -> Vec<f32> {
        let Some(envelope) = self.current.take() else {
            return pcm;
        };

        let fade_in_samples = envelope.fade_in_samples(self.sample_rate);
        tracing::trace!(
            gain = envelope.gain,
            fade_in_samples,
            samples = pcm.len(),
            "applying ducking envelope"
        );

        apply_gain_envelope(pcm, envelope.gain, fade_in_samples)
    }

    pub fn reset(&mut self) {
        self.current = None;
    }
}

/// One entry of an already-rendered timeline
#[derive(Debug, Clone, PartialEq)]
pub enum DuckedItem {
    /// Event audio, optionally arming ducking for the next speech
    Event {
        pcm: Vec<f32>,
        ducking: Option<DuckingEnvelope>,
    },
    /// Speech audio
    Speech { pcm: Vec<f32> },
}

/// Apply ducking across a rendered timeline
///
/// Events pass through unchanged and (re)arm the envelope; each speech item
/// is shaped by whatever is armed at that point.
pub fn process_timeline_with_ducking<I>(items: I, sample_rate: u32) -> impl Iterator<Item = Vec<f32>>
where
    I: IntoIterator<Item = DuckedItem>,
{
    let mut processor = DuckingProcessor::new(sample_rate);

    items.into_iter().map(move |item| match item {
        DuckedItem::Event { pcm, ducking } => {
            processor.set_ducking(ducking);
            pcm
        }
        DuckedItem::Speech { pcm } => processor.process_speech(pcm),
    })
}
