//! Audio event adapter
//!
//! Resolves a paralinguistic event to pre-recorded PCM. Construction is
//! all-or-nothing: every variant in the manifest must pass validation.
//! Decoded audio is memoized per file for the adapter's lifetime, so
//! repeated renders of the same variant hand out the same buffer.

use super::manifest::{AudioEventManifest, AudioVariant};
use crate::error::{Error, Result};
use crate::graph::ParalinguisticEvent;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Shared, immutable decoded PCM
pub type EventPcm = Arc<Vec<f32>>;

/// Renders events from a validated manifest
///
/// Safe to share across sessions: renders only take `&self`.
#[derive(Debug)]
pub struct AudioEventAdapter {
    manifest: AudioEventManifest,
    cache: RwLock<HashMap<PathBuf, EventPcm>>,
}

impl AudioEventAdapter {
    /// Wrap an already-loaded manifest, validating every variant
    pub fn new(manifest: AudioEventManifest) -> Result<Self> {
        let issues = manifest.validate();
        if !issues.is_empty() {
            return Err(Error::ManifestValidation { issues });
        }

        tracing::info!(
            sample_rate = manifest.sample_rate(),
            events = manifest.event_types().count(),
            "audio event adapter loaded"
        );

        Ok(Self {
            manifest,
            cache: RwLock::new(HashMap::new()),
        })
    }

    /// Load and validate a manifest file
    pub fn from_manifest(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(AudioEventManifest::load(path)?)
    }

    /// Like [`AudioEventAdapter::from_manifest`], but returns `None` instead
    /// of failing
    pub fn try_load(path: impl AsRef<Path>) -> Option<Self> {
        let path = path.as_ref();
        if !path.exists() {
            tracing::debug!(path = %path.display(), "no audio event manifest");
            return None;
        }

        match Self::from_manifest(path) {
            Ok(adapter) => Some(adapter),
            Err(e) => {
                tracing::warn!(path = %path.display(), "Failed to load audio events: {}", e);
                None
            }
        }
    }

    pub fn manifest(&self) -> &AudioEventManifest {
        &self.manifest
    }

    /// Output sample rate of every rendered buffer
    pub fn sample_rate(&self) -> u32 {
        self.manifest.sample_rate()
    }

    pub fn supported_events(&self) -> Vec<&str> {
        self.manifest.event_types().collect()
    }

    /// Number of decoded files held in the cache
    pub fn cached_files(&self) -> usize {
        self.cache.read().len()
    }

    /// Variant that would be used for an event type and intensity
    pub fn select(&self, event_type: &str, intensity: f64) -> Option<&AudioVariant> {
        self.manifest.event_spec(event_type)?.select_variant(intensity)
    }

    /// Render a graph event, or `None` if nothing matches
    pub fn render(&self, event: &ParalinguisticEvent) -> Option<EventPcm> {
        self.render_type(event.kind.as_str(), event.intensity)
    }

    /// Render by event type name and intensity
    pub fn render_type(&self, event_type: &str, intensity: f64) -> Option<EventPcm> {
        let Some(spec) = self.manifest.event_spec(event_type) else {
            tracing::debug!("No audio spec for event type: {}", event_type);
            return None;
        };

        let Some(variant) = spec.select_variant(intensity) else {
            tracing::debug!("No variant for {} at intensity {:.2}", event_type, intensity);
            return None;
        };

        match self.load_pcm(&variant.file) {
            Ok(pcm) => Some(pcm),
            Err(e) => {
                tracing::warn!(file = %variant.file.display(), "failed to decode event audio: {}", e);
                None
            }
        }
    }

    fn load_pcm(&self, path: &Path) -> Result<EventPcm> {
        if let Some(pcm) = self.cache.read().get(path) {
            return Ok(Arc::clone(pcm));
        }

        let decoded = Arc::new(decode_wav(path)?);

        // A concurrent render may have won the race; keep its buffer
        let mut cache = self.cache.write();
        let pcm = cache.entry(path.to_path_buf()).or_insert(decoded);
        Ok(Arc::clone(pcm))
    }
}

/// Decode a 16-bit WAV into f32 samples in [-1, 1)
fn decode_wav(path: &Path) -> Result<Vec<f32>> {
    let mut reader = hound::WavReader::open(path)?;
    let samples = reader
        .samples::<i16>()
        .map(|s| s.map(|v| v as f32 / 32768.0))
        .collect::<std::result::Result<Vec<f32>, hound::Error>>()?;

    tracing::debug!(path = %path.display(), samples = samples.len(), "decoded event audio");
    Ok(samples)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::Paralinguistic;
    use tempfile::TempDir;

    fn write_wav(path: &Path, sample_rate: u32, samples: &[i16]) {
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        let spec = hound::WavSpec {
            channels: 1,
            sample_rate,
            bits_per_sample: 16,
            sample_format: hound::SampleFormat::Int,
        };
        let mut writer = hound::WavWriter::create(path, spec).unwrap();
        for &s in samples {
            writer.write_sample(s).unwrap();
        }
        writer.finalize().unwrap();
    }

    fn fixture() -> (TempDir, PathBuf) {
        let dir = TempDir::new().unwrap();
        write_wav(&dir.path().join("laugh/soft.wav"), 1000, &[16384; 300]);
        write_wav(&dir.path().join("laugh/hard.wav"), 1000, &[-16384; 500]);

        let manifest = dir.path().join("manifest.json");
        std::fs::write(
            &manifest,
            r#"{
                "sample_rate": 1000,
                "events": {"laugh": {"variants": [
                    {"id": "soft", "file": "laugh/soft.wav", "intensity_range": [0.0, 0.5], "duration": 0.3},
                    {"id": "hard", "file": "laugh/hard.wav", "intensity_range": [0.5, 1.0], "duration": 0.5}
                ]}}
            }"#,
        )
        .unwrap();
        (dir, manifest)
    }

    #[test]
    fn test_render_decodes_and_scales() {
        let (_dir, manifest) = fixture();
        let adapter = AudioEventAdapter::from_manifest(&manifest).unwrap();

        let event = ParalinguisticEvent::new(Paralinguistic::Laugh, 0.0).with_intensity(0.2);
        let pcm = adapter.render(&event).unwrap();
        assert_eq!(pcm.len(), 300);
        assert_eq!(pcm[0], 0.5);

        let hard = adapter.render_type("laugh", 0.9).unwrap();
        assert_eq!(hard[0], -0.5);
        assert_eq!(adapter.cached_files(), 2);
    }

    #[test]
    fn test_render_is_memoized() {
        let (_dir, manifest) = fixture();
        let adapter = AudioEventAdapter::from_manifest(&manifest).unwrap();

        let a = adapter.render_type("laugh", 0.1).unwrap();
        let b = adapter.render_type("laugh", 0.1).unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(adapter.cached_files(), 1);
    }

    #[test]
    fn test_unknown_type_renders_none() {
        let (_dir, manifest) = fixture();
        let adapter = AudioEventAdapter::from_manifest(&manifest).unwrap();
        assert!(adapter.render(&ParalinguisticEvent::new(Paralinguistic::Sigh, 0.0)).is_none());
        assert_eq!(adapter.supported_events(), vec!["laugh"]);
        assert_eq!(adapter.sample_rate(), 1000);
    }

    #[test]
    fn test_strict_construction_fails_on_missing_file() {
        let (dir, manifest) = fixture();
        std::fs::remove_file(dir.path().join("laugh/hard.wav")).unwrap();

        let err = AudioEventAdapter::from_manifest(&manifest).unwrap_err();
        assert_eq!(err.issues().len(), 1);
        assert!(err.issues()[0].contains("not found"));
        assert!(AudioEventAdapter::try_load(&manifest).is_none());
    }

    #[test]
    fn test_try_load_missing_manifest() {
        assert!(AudioEventAdapter::try_load("/nope/manifest.json").is_none());
    }
}
