//! Reference text compiler
//!
//! Splits text into clause tokens on punctuation, adds pauses after clause
//! and sentence boundaries, and applies an emotion's prosody multipliers.
//! No normalization, no phonemization.

use super::{CompileRequest, Compiler};
use crate::graph::{ControlGraph, SpeakerRef, TokenEvent};

/// Pause after a sentence-ending token (seconds)
const SENTENCE_PAUSE: f64 = 0.3;
/// Pause after a clause-ending token (seconds)
const CLAUSE_PAUSE: f64 = 0.15;

/// How an emotion scales prosody (1.0 = neutral)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EmotionProfile {
    pub name: &'static str,
    pub speed: f32,
    pub pitch: f32,
    pub energy: f32,
    pub pause_multiplier: f64,
}

impl EmotionProfile {
    const fn new(name: &'static str, speed: f32, pitch: f32, energy: f32, pause_multiplier: f64) -> Self {
        Self {
            name,
            speed,
            pitch,
            energy,
            pause_multiplier,
        }
    }

    /// Known profiles
    pub const ALL: [EmotionProfile; 6] = [
        EmotionProfile::new("neutral", 1.0, 1.0, 1.0, 1.0),
        EmotionProfile::new("happy", 1.1, 1.05, 1.1, 1.0),
        EmotionProfile::new("excited", 1.2, 1.1, 1.2, 1.0),
        EmotionProfile::new("calm", 0.9, 0.98, 0.85, 1.2),
        EmotionProfile::new("sad", 0.85, 0.92, 0.75, 1.3),
        EmotionProfile::new("angry", 1.1, 1.05, 1.3, 0.8),
    ];

    /// Look up a profile by name, falling back to neutral
    pub fn lookup(name: &str) -> EmotionProfile {
        let lower = name.to_ascii_lowercase();
        Self::ALL
            .into_iter()
            .find(|profile| profile.name == lower)
            .unwrap_or(Self::ALL[0])
    }
}

/// Whitespace/punctuation compiler
#[derive(Debug, Clone)]
pub struct PlainTextCompiler {
    default_voice: String,
}

impl PlainTextCompiler {
    pub fn new(default_voice: impl Into<String>) -> Self {
        Self {
            default_voice: default_voice.into(),
        }
    }

    pub fn default_voice(&self) -> &str {
        &self.default_voice
    }

    fn tokenize(text: &str) -> Vec<TokenEvent> {
        let mut tokens = Vec::new();
        let mut clause: Vec<&str> = Vec::new();

        for word in text.split_whitespace() {
            clause.push(word);

            let pause = match word.chars().last() {
                Some('.' | '!' | '?') => Some(SENTENCE_PAUSE),
                Some(',' | ';' | ':') => Some(CLAUSE_PAUSE),
                _ => None,
            };

            if let Some(pause) = pause {
                tokens.push(TokenEvent::new(clause.join(" ")).with_pause_after(pause));
                clause.clear();
            }
        }

        if !clause.is_empty() {
            tokens.push(TokenEvent::new(clause.join(" ")));
        }

        tokens
    }
}

impl Default for PlainTextCompiler {
    fn default() -> Self {
        Self::new("af_bella")
    }
}

impl Compiler for PlainTextCompiler {
    fn compile(&self, request: &CompileRequest) -> ControlGraph {
        let mut tokens = Self::tokenize(&request.text);
        let mut global_speed = request.speed.unwrap_or(1.0);

        if let Some(emotion) = &request.emotion {
            let profile = EmotionProfile::lookup(emotion);
            for token in tokens.iter_mut() {
                token.pitch_scale *= profile.pitch;
                token.energy_scale *= profile.energy;
                token.duration_scale /= profile.speed;
                token.pause_after *= profile.pause_multiplier;
            }
            if request.speed.is_none() {
                global_speed = profile.speed;
            }
        }

        let voice = request.voice.as_deref().unwrap_or(&self.default_voice);
        let mut graph = ControlGraph::new(tokens, SpeakerRef::from_voice(voice));
        graph.global_speed = global_speed;
        graph.source_text = Some(request.text.clone());
        graph
    }
}
