//! ControlGraph - the canonical IR between text compilation and synthesis
//!
//! The compiler produces a [`ControlGraph`]; everything in this crate reads it
//! without mutation. A graph carries two parallel tracks:
//!
//! 1. `tokens`: sequential speech content with prosody modifiers
//! 2. `events`: time-positioned non-speech sounds (laughs, sighs, ...)
//!
//! Events must not overlap each other; [`ControlGraph::validate`] reports
//! violations instead of rejecting the graph.

use crate::ducking::DuckingEnvelope;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Graph schema version. Bump on breaking changes to the graph types.
pub const GRAPH_VERSION: u32 = 1;

/// Non-speech vocalizations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Paralinguistic {
    Laugh,
    Sigh,
    Breath,
    Gasp,
    Cry,
    Cough,
    Yawn,
    Hum,
}

impl Paralinguistic {
    /// All known event kinds, in declaration order
    pub const ALL: [Paralinguistic; 8] = [
        Paralinguistic::Laugh,
        Paralinguistic::Sigh,
        Paralinguistic::Breath,
        Paralinguistic::Gasp,
        Paralinguistic::Cry,
        Paralinguistic::Cough,
        Paralinguistic::Yawn,
        Paralinguistic::Hum,
    ];

    /// Manifest key for this event kind
    pub fn as_str(&self) -> &'static str {
        match self {
            Paralinguistic::Laugh => "laugh",
            Paralinguistic::Sigh => "sigh",
            Paralinguistic::Breath => "breath",
            Paralinguistic::Gasp => "gasp",
            Paralinguistic::Cry => "cry",
            Paralinguistic::Cough => "cough",
            Paralinguistic::Yawn => "yawn",
            Paralinguistic::Hum => "hum",
        }
    }
}

impl fmt::Display for Paralinguistic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Paralinguistic {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_ascii_lowercase();
        Paralinguistic::ALL
            .into_iter()
            .find(|kind| kind.as_str() == lower)
            .ok_or_else(|| format!("unknown paralinguistic event: {}", s))
    }
}

fn default_event_duration() -> f64 {
    0.2
}

fn default_intensity() -> f64 {
    1.0
}

fn neutral() -> f32 {
    1.0
}

/// A time-bound non-speech event on the timeline
///
/// Events are not tokens: they occupy their own timeline positions and push
/// speech later rather than overlapping it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParalinguisticEvent {
    /// Event kind
    #[serde(rename = "type")]
    pub kind: Paralinguistic,

    /// Timeline position (seconds from graph start)
    pub start_time: f64,

    /// Nominal duration in seconds
    #[serde(default = "default_event_duration")]
    pub duration: f64,

    /// Expressiveness, 0.0-1.0
    #[serde(default = "default_intensity")]
    pub intensity: f64,

    /// Gain envelope applied to the speech directly after this event
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ducking: Option<DuckingEnvelope>,
}

impl ParalinguisticEvent {
    /// Create an event with default duration (200ms) and full intensity
    pub fn new(kind: Paralinguistic, start_time: f64) -> Self {
        Self {
            kind,
            start_time,
            duration: default_event_duration(),
            intensity: default_intensity(),
            ducking: None,
        }
    }

    /// Set intensity
    pub fn with_intensity(mut self, intensity: f64) -> Self {
        self.intensity = intensity;
        self
    }

    /// Set duration
    pub fn with_duration(mut self, duration: f64) -> Self {
        self.duration = duration;
        self
    }

    /// Attach a ducking envelope for the following speech
    pub fn with_ducking(mut self, envelope: DuckingEnvelope) -> Self {
        self.ducking = Some(envelope);
        self
    }

    pub fn end_time(&self) -> f64 {
        self.start_time + self.duration
    }
}

/// Single unit of speech intent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenEvent {
    pub text: String,

    /// Prosody modifiers (1.0 = neutral, applied multiplicatively)
    #[serde(default = "neutral")]
    pub pitch_scale: f32,
    #[serde(default = "neutral")]
    pub energy_scale: f32,
    #[serde(default = "neutral")]
    pub duration_scale: f32,

    /// Pre-phonemized form, when the compiler has one
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phonemes: Option<Vec<String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paralinguistic: Option<Paralinguistic>,

    #[serde(default = "neutral")]
    pub emphasis: f32,

    /// Pause after this token (seconds, 0 = no pause)
    #[serde(default)]
    pub pause_after: f64,
}

impl TokenEvent {
    /// Create a token with neutral prosody
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            pitch_scale: 1.0,
            energy_scale: 1.0,
            duration_scale: 1.0,
            phonemes: None,
            paralinguistic: None,
            emphasis: 1.0,
            pause_after: 0.0,
        }
    }

    /// Set the pause after this token
    pub fn with_pause_after(mut self, seconds: f64) -> Self {
        self.pause_after = seconds;
        self
    }
}

/// Speaker identity, resolved at compile time
///
/// Holds embeddings only, never raw reference audio.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SpeakerRef {
    /// A known voice identifier (e.g. "af_bella")
    VoiceId { value: String },
    /// A named preset that maps to voice + settings
    Preset { value: String },
    /// A speaker embedding vector
    Embedding { value: Vec<f32>, name: String },
}

impl SpeakerRef {
    pub fn from_voice(voice_id: impl Into<String>) -> Self {
        SpeakerRef::VoiceId {
            value: voice_id.into(),
        }
    }

    pub fn from_preset(preset: impl Into<String>) -> Self {
        SpeakerRef::Preset {
            value: preset.into(),
        }
    }

    pub fn from_embedding(embedding: Vec<f32>, name: impl Into<String>) -> Self {
        SpeakerRef::Embedding {
            value: embedding,
            name: name.into(),
        }
    }

    /// Human-readable name for logging
    pub fn name(&self) -> &str {
        match self {
            SpeakerRef::VoiceId { value } | SpeakerRef::Preset { value } => value,
            SpeakerRef::Embedding { name, .. } => name,
        }
    }
}

/// The canonical IR. Compilers emit this; backends consume it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ControlGraph {
    pub tokens: Vec<TokenEvent>,
    pub speaker: SpeakerRef,

    /// Timeline events (paralinguistics, non-speech sounds)
    #[serde(default)]
    pub events: Vec<ParalinguisticEvent>,

    /// Global prosody (applied on top of per-token modifiers)
    #[serde(default = "neutral")]
    pub global_speed: f32,
    #[serde(default = "neutral")]
    pub global_pitch: f32,

    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,

    /// Text the graph was compiled from (debugging only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_text: Option<String>,
}

fn default_sample_rate() -> u32 {
    24000
}

impl ControlGraph {
    /// Create a graph with neutral global prosody and no events
    pub fn new(tokens: Vec<TokenEvent>, speaker: SpeakerRef) -> Self {
        Self {
            tokens,
            speaker,
            events: Vec::new(),
            global_speed: 1.0,
            global_pitch: 1.0,
            sample_rate: default_sample_rate(),
            source_text: None,
        }
    }

    /// Attach timeline events
    pub fn with_events(mut self, events: Vec<ParalinguisticEvent>) -> Self {
        self.events = events;
        self
    }

    /// Reconstruct the spoken text from tokens
    pub fn text(&self) -> String {
        self.tokens
            .iter()
            .map(|t| t.text.as_str())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Total explicit pause time in seconds
    pub fn total_pause(&self) -> f64 {
        self.tokens.iter().map(|t| t.pause_after).sum()
    }

    /// Check graph integrity. Returns a list of issues (empty = valid).
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.tokens.is_empty() {
            issues.push("Graph has no tokens".to_string());
        }

        if self.global_speed <= 0.0 {
            issues.push(format!("Invalid global_speed: {}", self.global_speed));
        }

        for (i, event) in self.events.iter().enumerate() {
            if event.start_time < 0.0 {
                issues.push(format!(
                    "Event {} has negative start_time: {}",
                    i, event.start_time
                ));
            }
            if event.duration <= 0.0 {
                issues.push(format!("Event {} has invalid duration: {}", i, event.duration));
            }
            if !(0.0..=1.0).contains(&event.intensity) {
                issues.push(format!(
                    "Event {} has invalid intensity: {}",
                    i, event.intensity
                ));
            }

            for (j, other) in self.events.iter().enumerate().skip(i + 1) {
                if event.start_time < other.end_time() && other.start_time < event.end_time() {
                    issues.push(format!("Events {} and {} overlap", i, j));
                }
            }
        }

        if self.global_pitch <= 0.0 {
            issues.push(format!("Invalid global_pitch: {}", self.global_pitch));
        }

        for (i, token) in self.tokens.iter().enumerate() {
            if token.pitch_scale <= 0.0 {
                issues.push(format!("Token {}: invalid pitch_scale {}", i, token.pitch_scale));
            }
            if token.duration_scale <= 0.0 {
                issues.push(format!(
                    "Token {}: invalid duration_scale {}",
                    i, token.duration_scale
                ));
            }
        }

        issues
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn hello_graph() -> ControlGraph {
        ControlGraph::new(
            vec![TokenEvent::new("Hello"), TokenEvent::new("world!")],
            SpeakerRef::from_voice("af_bella"),
        )
    }

    #[test]
    fn test_text_joins_tokens() {
        assert_eq!(hello_graph().text(), "Hello world!");
    }

    #[test]
    fn test_total_pause() {
        let mut graph = hello_graph();
        graph.tokens[0].pause_after = 0.25;
        graph.tokens[1].pause_after = 0.5;
        assert!((graph.total_pause() - 0.75).abs() < 1e-9);
    }

    #[test]
    fn test_valid_graph_has_no_issues() {
        let graph = hello_graph().with_events(vec![
            ParalinguisticEvent::new(Paralinguistic::Laugh, 0.0),
            ParalinguisticEvent::new(Paralinguistic::Sigh, 1.0),
        ]);
        assert!(graph.validate().is_empty());
    }

    #[test]
    fn test_overlapping_events_reported() {
        let graph = hello_graph().with_events(vec![
            ParalinguisticEvent::new(Paralinguistic::Laugh, 0.0).with_duration(0.5),
            ParalinguisticEvent::new(Paralinguistic::Sigh, 0.3),
        ]);
        let issues = graph.validate();
        assert_eq!(issues, vec!["Events 0 and 1 overlap".to_string()]);
    }

    #[test]
    fn test_invalid_fields_reported() {
        let mut graph = ControlGraph::new(vec![], SpeakerRef::from_preset("narrator"));
        graph.global_speed = 0.0;
        graph.events = vec![ParalinguisticEvent::new(Paralinguistic::Cough, -1.0)
            .with_intensity(1.5)
            .with_duration(0.0)];

        let issues = graph.validate();
        assert!(issues.iter().any(|i| i == "Graph has no tokens"));
        assert!(issues.iter().any(|i| i.contains("global_speed")));
        assert!(issues.iter().any(|i| i.contains("negative start_time")));
        assert!(issues.iter().any(|i| i.contains("invalid duration")));
        assert!(issues.iter().any(|i| i.contains("invalid intensity")));
    }

    #[test]
    fn test_paralinguistic_round_trips_through_str() {
        for kind in Paralinguistic::ALL {
            assert_eq!(kind.as_str().parse::<Paralinguistic>(), Ok(kind));
        }
        assert_eq!("LAUGH".parse::<Paralinguistic>(), Ok(Paralinguistic::Laugh));
        assert!("giggle".parse::<Paralinguistic>().is_err());
    }

    #[test]
    fn test_event_deserializes_with_defaults() {
        let event: ParalinguisticEvent =
            serde_json::from_str(r#"{"type": "sigh", "start_time": 1.5}"#).unwrap();
        assert_eq!(event.kind, Paralinguistic::Sigh);
        assert_eq!(event.duration, 0.2);
        assert_eq!(event.intensity, 1.0);
        assert!(event.ducking.is_none());
        assert!((event.end_time() - 1.7).abs() < 1e-9);
    }

    #[test]
    fn test_speaker_ref_serde_tag() {
        let json = serde_json::to_value(SpeakerRef::from_voice("am_michael")).unwrap();
        assert_eq!(json["type"], "voice_id");
        assert_eq!(json["value"], "am_michael");
        assert_eq!(SpeakerRef::from_embedding(vec![0.1, 0.2], "cloned").name(), "cloned");
    }
}
