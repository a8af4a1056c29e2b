//! Configuration for synthesis sessions and the audio event layer
//!
//! Loadable from TOML or JSON:
//!
//! ```toml
//! [synthesizer]
//! voice = "af_bella"
//! buffer_ms = 100.0
//! correction_sensitivity = 0.5
//!
//! [audio_events]
//! manifest = "assets/audio_events/manifest.json"
//! required = false
//! ```

use crate::error::{Error, Result};
use crate::events::AudioEventAdapter;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Incremental synthesizer settings
///
/// # Example
///
/// ```
/// use soundboard_core::config::SynthesizerConfig;
///
/// let config = SynthesizerConfig::default()
///     .with_voice("am_michael")
///     .with_buffer_ms(80.0);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SynthesizerConfig {
    /// Voice ID passed to the compiler
    pub voice: String,

    /// Emotion name passed to the compiler
    #[serde(skip_serializing_if = "Option::is_none")]
    pub emotion: Option<String>,

    /// Global speed multiplier
    pub speed: f32,

    /// Playback buffer; the stream buffer holds up to twice this
    pub buffer_ms: f64,

    /// Fade-to-silence length on rollback
    pub crossfade_ms: f64,

    /// Size of emitted PCM chunks
    pub chunk_ms: f64,

    /// Run correction detection and rollback
    pub enable_rollback: bool,

    /// 0.0-1.0, higher = more corrections detected
    pub correction_sensitivity: f64,
}

impl Default for SynthesizerConfig {
    fn default() -> Self {
        Self {
            voice: "af_bella".to_string(),
            emotion: None,
            speed: 1.0,
            buffer_ms: 100.0,
            crossfade_ms: 10.0,
            chunk_ms: 50.0,
            enable_rollback: true,
            correction_sensitivity: 0.5,
        }
    }
}

impl SynthesizerConfig {
    pub fn with_voice(mut self, voice: impl Into<String>) -> Self {
        self.voice = voice.into();
        self
    }

    pub fn with_emotion(mut self, emotion: impl Into<String>) -> Self {
        self.emotion = Some(emotion.into());
        self
    }

    pub fn with_speed(mut self, speed: f32) -> Self {
        self.speed = speed;
        self
    }

    pub fn with_buffer_ms(mut self, buffer_ms: f64) -> Self {
        self.buffer_ms = buffer_ms;
        self
    }

    pub fn with_crossfade_ms(mut self, crossfade_ms: f64) -> Self {
        self.crossfade_ms = crossfade_ms;
        self
    }

    pub fn with_chunk_ms(mut self, chunk_ms: f64) -> Self {
        self.chunk_ms = chunk_ms;
        self
    }

    pub fn with_rollback(mut self, enabled: bool) -> Self {
        self.enable_rollback = enabled;
        self
    }

    pub fn with_correction_sensitivity(mut self, sensitivity: f64) -> Self {
        self.correction_sensitivity = sensitivity;
        self
    }

    /// Stream buffer budget
    pub fn max_buffer_ms(&self) -> f64 {
        self.buffer_ms * 2.0
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        if !(self.speed > 0.0 && self.speed.is_finite()) {
            return Err(Error::ConfigError(format!("speed must be > 0, got {}", self.speed)));
        }
        if !(self.buffer_ms > 0.0 && self.buffer_ms.is_finite()) {
            return Err(Error::ConfigError(format!(
                "buffer_ms must be > 0, got {}",
                self.buffer_ms
            )));
        }
        if !(self.chunk_ms > 0.0 && self.chunk_ms.is_finite()) {
            return Err(Error::ConfigError(format!(
                "chunk_ms must be > 0, got {}",
                self.chunk_ms
            )));
        }
        if !(self.crossfade_ms >= 0.0 && self.crossfade_ms.is_finite()) {
            return Err(Error::ConfigError(format!(
                "crossfade_ms must be >= 0, got {}",
                self.crossfade_ms
            )));
        }
        if !(0.0..=1.0).contains(&self.correction_sensitivity) {
            return Err(Error::ConfigError(format!(
                "correction_sensitivity must be 0.0-1.0, got {}",
                self.correction_sensitivity
            )));
        }
        Ok(())
    }
}

/// Where to find event audio
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AudioEventsConfig {
    /// Path to manifest.json
    pub manifest: PathBuf,

    /// Fail on a bad manifest instead of running without events
    #[serde(default)]
    pub required: bool,
}

/// Top-level engine configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub synthesizer: SynthesizerConfig,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio_events: Option<AudioEventsConfig>,
}

impl EngineConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s)?;
        config.synthesizer.validate()?;
        Ok(config)
    }

    pub fn from_json_str(s: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(s)?;
        config.synthesizer.validate()?;
        Ok(config)
    }

    /// Load from a `.toml` or `.json` file
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = std::fs::read_to_string(path)?;

        match path.extension().and_then(|e| e.to_str()) {
            Some("toml") => Self::from_toml_str(&contents),
            Some("json") => Self::from_json_str(&contents),
            other => Err(Error::ConfigError(format!(
                "unsupported config format: {}",
                other.unwrap_or("<none>")
            ))),
        }
    }

    /// Build the audio event adapter, if configured
    ///
    /// A required section propagates load failures; an optional one logs and
    /// continues without events.
    pub fn load_adapter(&self) -> Result<Option<AudioEventAdapter>> {
        let Some(events) = &self.audio_events else {
            return Ok(None);
        };

        if events.required {
            AudioEventAdapter::from_manifest(&events.manifest).map(Some)
        } else {
            Ok(AudioEventAdapter::try_load(&events.manifest))
        }
    }
}
