//! Audio event manifest
//!
//! ```json
//! {
//!   "sample_rate": 24000,
//!   "events": {
//!     "laugh": {
//!       "variants": [
//!         {"id": "soft", "file": "laugh/soft.wav", "intensity_range": [0.0, 0.4], "duration": 0.3}
//!       ]
//!     }
//!   }
//! }
//! ```
//!
//! File paths are relative to the manifest's directory. Every file must be a
//! mono 16-bit PCM WAV at the manifest sample rate whose length is within
//! 50ms of the declared duration.

use crate::error::{Error, Result};
use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Allowed gap between declared and measured duration (seconds)
pub const DURATION_TOLERANCE_S: f64 = 0.05;

/// One recorded take of an event
#[derive(Debug, Clone, PartialEq)]
pub struct AudioVariant {
    pub id: String,
    /// Resolved against the manifest directory
    pub file: PathBuf,
    pub intensity_min: f64,
    pub intensity_max: f64,
    /// Declared duration in seconds
    pub duration: f64,
}

impl AudioVariant {
    /// Inclusive on both ends
    pub fn matches_intensity(&self, intensity: f64) -> bool {
        self.intensity_min <= intensity && intensity <= self.intensity_max
    }

    pub fn range_width(&self) -> f64 {
        self.intensity_max - self.intensity_min
    }

    /// Distance from `intensity` to the range (0 inside it)
    pub fn distance(&self, intensity: f64) -> f64 {
        if intensity < self.intensity_min {
            self.intensity_min - intensity
        } else if intensity > self.intensity_max {
            intensity - self.intensity_max
        } else {
            0.0
        }
    }
}

/// All variants of one event type, in catalog order
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEventSpec {
    pub event_type: String,
    pub variants: Vec<AudioVariant>,
}

impl AudioEventSpec {
    /// Pick the variant for an intensity
    ///
    /// Among variants whose range contains the intensity, the narrowest
    /// wins. With no containing range, the closest range wins. Ties go to
    /// the earlier variant in catalog order.
    pub fn select_variant(&self, intensity: f64) -> Option<&AudioVariant> {
        let mut best: Option<&AudioVariant> = None;
        for variant in self.variants.iter().filter(|v| v.matches_intensity(intensity)) {
            match best {
                Some(current) if variant.range_width() >= current.range_width() => {}
                _ => best = Some(variant),
            }
        }
        if best.is_some() {
            return best;
        }

        for variant in &self.variants {
            match best {
                Some(current) if variant.distance(intensity) >= current.distance(intensity) => {}
                _ => best = Some(variant),
            }
        }
        best
    }
}

#[derive(Deserialize)]
struct ManifestFile {
    sample_rate: u32,
    #[serde(default)]
    events: BTreeMap<String, EventEntry>,
}

#[derive(Deserialize)]
struct EventEntry {
    #[serde(default)]
    variants: Vec<VariantEntry>,
}

#[derive(Deserialize)]
struct VariantEntry {
    id: String,
    file: PathBuf,
    intensity_range: [f64; 2],
    duration: f64,
}

/// Catalog of pre-recorded event audio
#[derive(Debug, Clone, PartialEq)]
pub struct AudioEventManifest {
    base_dir: PathBuf,
    sample_rate: u32,
    events: BTreeMap<String, AudioEventSpec>,
}

impl AudioEventManifest {
    /// Read and parse a manifest file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| {
            Error::InvalidManifest(format!("cannot read {}: {}", path.display(), e))
        })?;
        let base_dir = path.parent().unwrap_or_else(|| Path::new("."));
        Self::from_json_str(&json, base_dir)
    }

    /// Parse manifest JSON, resolving files against `base_dir`
    pub fn from_json_str(json: &str, base_dir: impl AsRef<Path>) -> Result<Self> {
        let base_dir = base_dir.as_ref().to_path_buf();
        let raw: ManifestFile =
            serde_json::from_str(json).map_err(|e| Error::InvalidManifest(e.to_string()))?;

        if raw.sample_rate == 0 {
            return Err(Error::InvalidManifest("sample_rate must be positive".into()));
        }

        let events = raw
            .events
            .into_iter()
            .map(|(event_type, entry)| {
                let variants = entry
                    .variants
                    .into_iter()
                    .map(|v| AudioVariant {
                        id: v.id,
                        file: base_dir.join(v.file),
                        intensity_min: v.intensity_range[0],
                        intensity_max: v.intensity_range[1],
                        duration: v.duration,
                    })
                    .collect();
                let spec = AudioEventSpec {
                    event_type: event_type.clone(),
                    variants,
                };
                (event_type, spec)
            })
            .collect();

        Ok(Self {
            base_dir,
            sample_rate: raw.sample_rate,
            events,
        })
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn event_spec(&self, event_type: &str) -> Option<&AudioEventSpec> {
        self.events.get(event_type)
    }

    /// Event types in sorted order
    pub fn event_types(&self) -> impl Iterator<Item = &str> {
        self.events.keys().map(String::as_str)
    }

    /// Every variant with its event type
    pub fn variants(&self) -> impl Iterator<Item = (&str, &AudioVariant)> {
        self.events
            .iter()
            .flat_map(|(event_type, spec)| spec.variants.iter().map(move |v| (event_type.as_str(), v)))
    }

    /// Check every variant file against the manifest
    ///
    /// Returns one issue per problem, empty when everything matches.
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        for (event_type, variant) in self.variants() {
            let label = format!("{}/{}", event_type, variant.id);

            if !variant.file.exists() {
                issues.push(format!("{}: file not found: {}", label, variant.file.display()));
                continue;
            }

            let reader = match hound::WavReader::open(&variant.file) {
                Ok(reader) => reader,
                Err(e) => {
                    issues.push(format!("{}: invalid WAV: {}", label, e));
                    continue;
                }
            };

            let spec = reader.spec();
            if spec.channels != 1 {
                issues.push(format!("{}: must be mono, got {} channels", label, spec.channels));
            }
            if spec.sample_rate != self.sample_rate {
                issues.push(format!(
                    "{}: sample rate {} != manifest {}",
                    label, spec.sample_rate, self.sample_rate
                ));
            }
            if spec.bits_per_sample != 16 || spec.sample_format != hound::SampleFormat::Int {
                issues.push(format!(
                    "{}: must be 16-bit, got {}-bit",
                    label, spec.bits_per_sample
                ));
            }

            if spec.sample_rate > 0 {
                let actual = reader.duration() as f64 / spec.sample_rate as f64;
                if (actual - variant.duration).abs() > DURATION_TOLERANCE_S {
                    issues.push(format!(
                        "{}: duration {:.3}s != manifest {:.3}s",
                        label, actual, variant.duration
                    ));
                }
            }
        }

        issues
    }
}
